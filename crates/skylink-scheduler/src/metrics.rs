//! Scheduler observability: how often a plan is recomputed, and what it
//! chose.

use once_cell::sync::Lazy;
use prometheus::{register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter, IntCounterVec};

pub static PLANS_COMPUTED: Lazy<IntCounter> =
    Lazy::new(|| register_int_counter!("skylink_scheduler_plans_computed_total", "Candidate-set searches run").unwrap());

pub static PLANS_EMPTY: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("skylink_scheduler_plans_empty_total", "Searches that found no viable set").unwrap()
});

pub static OVERDRIVE_CHOSEN: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("skylink_scheduler_overdrive_chosen_total", "Overdrive level of the chosen plan", &["num_overdrive"])
        .unwrap()
});

pub static ADJUSTED_DURATION_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "skylink_scheduler_adjusted_duration_ms",
        "Adjusted duration (duration + cost/price) of the chosen plan"
    )
    .unwrap()
});
