//! Worker-level observability: counters and gauges a scrape target would
//! consume, independent of whether anything in this workspace wires up
//! that scrape target.

use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, register_int_gauge_vec, IntCounterVec, IntGaugeVec};

pub static JOBS_SUBMITTED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("skylink_worker_jobs_submitted_total", "Jobs submitted per kind", &["kind"])
        .unwrap()
});

pub static JOBS_SUCCEEDED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("skylink_worker_jobs_succeeded_total", "Jobs that completed successfully per kind", &["kind"])
        .unwrap()
});

pub static JOBS_FAILED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("skylink_worker_jobs_failed_total", "Jobs that failed per kind", &["kind"]).unwrap()
});

pub static QUEUE_DEPTH: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!("skylink_worker_queue_depth", "Pending jobs per kind", &["kind"]).unwrap()
});

pub static ACCOUNT_BALANCE: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!("skylink_worker_account_balance", "Confirmed ephemeral account balance per host", &["host"])
        .unwrap()
});
