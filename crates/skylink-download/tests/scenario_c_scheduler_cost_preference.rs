//! Scheduler cost preference: two workers hold identical pieces at
//! different latency/cost tradeoffs. The search picks whichever adjusted
//! duration (`bucket_duration + cost / price_per_ms`) is lower, and that
//! pick flips as `price_per_ms` changes.

use skylink_async::time::Duration;
use skylink_scheduler::{DownloadWorker, IndividualWorker, LatencyDistribution, WorkerId, search_best_set};

fn worker(id: u8, fast_ms: u64, cost: u64) -> DownloadWorker {
    let mut latency = LatencyDistribution::empty(Duration::from_millis(1), 512);
    latency.add_sample(Duration::from_millis(fast_ms));
    DownloadWorker::Individual(IndividualWorker { id: WorkerId([id; 32]), piece_index: 0, latency, cost_per_read: cost, launched: false })
}

fn buckets() -> Vec<Duration> {
    (0..=500u64).map(Duration::from_millis).collect()
}

#[test]
fn picks_the_faster_expensive_worker_when_price_per_ms_is_high() {
    // A: 50ms at 10c. B: 200ms at 1c. At 1c/ms, A's adjusted duration
    // (50 + 10/1 = 60) beats B's (200 + 1/1 = 201).
    let pool = vec![worker(1, 50, 10), worker(2, 200, 1)];
    let plan = search_best_set(&pool, 1, 0, &buckets(), 1.0).unwrap();
    assert_eq!(plan.workers.len(), 1);
    let DownloadWorker::Individual(picked) = &plan.workers[0] else { panic!("expected an individual worker") };
    assert_eq!(picked.id, WorkerId([1u8; 32]), "expected the faster worker A to win at a high price per ms");
    assert!((plan.adjusted_duration_ms - 60.0).abs() < 1e-6);
}

#[test]
fn picks_the_cheaper_slower_worker_when_price_per_ms_is_low() {
    // Same pool, price_per_ms = 0.01c/ms: A becomes 50 + 10/0.01 = 1050,
    // B becomes 200 + 1/0.01 = 300, so B wins instead.
    let pool = vec![worker(1, 50, 10), worker(2, 200, 1)];
    let plan = search_best_set(&pool, 1, 0, &buckets(), 0.01).unwrap();
    assert_eq!(plan.workers.len(), 1);
    let DownloadWorker::Individual(picked) = &plan.workers[0] else { panic!("expected an individual worker") };
    assert_eq!(picked.id, WorkerId([2u8; 32]), "expected the cheaper worker B to win at a low price per ms");
    assert!((plan.adjusted_duration_ms - 300.0).abs() < 1e-6);
}
