//! Chunk-level observability: discovery outcomes and download results.

use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

pub static DOWNLOADS_STARTED: Lazy<IntCounter> =
    Lazy::new(|| register_int_counter!("skylink_chunks_downloads_started_total", "download() calls issued").unwrap());

pub static DOWNLOAD_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("skylink_chunks_download_outcomes_total", "Terminal outcome of a chunk download", &["outcome"])
        .unwrap()
});

pub static PIECES_DROPPED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("skylink_chunks_pieces_dropped_total", "Holders dropped after a read error or proof mismatch").unwrap()
});
