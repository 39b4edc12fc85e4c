//! Source-level observability: open and read outcomes.

use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

pub static OPENS_STARTED: Lazy<IntCounter> =
    Lazy::new(|| register_int_counter!("skylink_download_opens_started_total", "open() calls issued").unwrap());

pub static OPEN_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("skylink_download_open_outcomes_total", "Terminal outcome of open()", &["outcome"]).unwrap()
});

pub static READ_STREAM_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("skylink_download_read_stream_outcomes_total", "Terminal outcome of read_stream()", &["outcome"])
        .unwrap()
});
