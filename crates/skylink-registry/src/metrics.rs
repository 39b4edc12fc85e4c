//! Registry-level observability: how often reads/updates are issued,
//! their outcomes, and how often reconciliation and cheating detection
//! fire.

use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

pub static READS_ISSUED: Lazy<IntCounter> =
    Lazy::new(|| register_int_counter!("skylink_registry_reads_issued_total", "Registry reads issued").unwrap());

pub static READ_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("skylink_registry_read_outcomes_total", "Registry read outcomes", &["outcome"]).unwrap()
});

pub static UPDATES_ISSUED: Lazy<IntCounter> =
    Lazy::new(|| register_int_counter!("skylink_registry_updates_issued_total", "Registry updates issued").unwrap());

pub static UPDATE_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("skylink_registry_update_outcomes_total", "Registry update outcomes", &["outcome"])
        .unwrap()
});

pub static RECONCILIATIONS_SPAWNED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("skylink_registry_reconciliations_spawned_total", "Background reconciliations spawned")
        .unwrap()
});

pub static HOST_CHEATING_DETECTED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("skylink_registry_host_cheating_detected_total", "Hosts caught contradicting an acknowledged revision")
        .unwrap()
});
