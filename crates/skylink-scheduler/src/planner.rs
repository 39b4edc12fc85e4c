//! Stateful wrapper around [`search_best_set`]: tracks which pieces are
//! resolved, which workers are still unresolved, and which workers have
//! already been launched, rebuilding the chimera pool at most once per
//! `max_wait_rebuild_download_workers`.

use std::collections::HashMap;

use skylink_async::time::{Clock, Duration, Instant};

use crate::config::SchedulerConfig;
use crate::metrics;
use crate::search::{search_best_set, PlannedSet};
use crate::worker::{pack_chimeras, ChimeraWorker, DownloadWorker, IndividualWorker, UnresolvedWorker, WorkerId};

pub struct Planner {
    config: SchedulerConfig,
    data_pieces: usize,
    resolved: HashMap<usize, IndividualWorker>,
    unresolved: Vec<UnresolvedWorker>,
    chimera_cache: Vec<ChimeraWorker>,
    last_rebuild: Option<Instant>,
}

impl Planner {
    pub fn new(config: SchedulerConfig, data_pieces: usize) -> Self {
        Self { config, data_pieces, resolved: HashMap::new(), unresolved: Vec::new(), chimera_cache: Vec::new(), last_rebuild: None }
    }

    /// Replaces the known holder of `piece_index`, e.g. once has-sector
    /// discovery finds a (better) host for it.
    pub fn set_resolved(&mut self, piece_index: usize, worker: IndividualWorker) {
        self.resolved.insert(piece_index, worker);
    }

    pub fn remove_resolved(&mut self, piece_index: usize) {
        self.resolved.remove(&piece_index);
    }

    pub fn set_unresolved(&mut self, unresolved: Vec<UnresolvedWorker>) {
        self.unresolved = unresolved;
    }

    pub fn mark_launched(&mut self, piece_index: usize) {
        if let Some(w) = self.resolved.get_mut(&piece_index) {
            w.launched = true;
        }
    }

    pub fn record_latency(&mut self, piece_index: usize, duration: Duration) {
        if let Some(w) = self.resolved.get_mut(&piece_index) {
            w.latency.add_sample(duration);
        }
    }

    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }

    fn rebuild_chimeras_if_due(&mut self, clock: &Clock) {
        let now = clock.now();
        let due = self.last_rebuild.map(|t| now.saturating_duration_since(t) >= self.config.max_wait_rebuild_download_workers).unwrap_or(true);
        if due {
            self.chimera_cache = pack_chimeras(self.unresolved.clone(), self.config.bucket_width, self.config.num_buckets);
            self.last_rebuild = Some(now);
        }
    }

    fn buckets(&self) -> Vec<Duration> {
        (0..self.config.num_buckets as u32).map(|i| self.config.bucket_width * i).collect()
    }

    fn pool(&self) -> Vec<DownloadWorker> {
        let mut pool: Vec<DownloadWorker> = self.resolved.values().cloned().map(DownloadWorker::Individual).collect();
        pool.extend(self.chimera_cache.iter().cloned().map(DownloadWorker::Chimera));
        pool
    }

    /// Recomputes the chimera pool if due, then searches for the best
    /// set given the current state.
    pub fn plan(&mut self, clock: &Clock, price_per_ms: f64) -> Option<PlannedSet> {
        self.rebuild_chimeras_if_due(clock);
        metrics::PLANS_COMPUTED.inc();
        let pool = self.pool();
        let buckets = self.buckets();
        let result = search_best_set(&pool, self.data_pieces, self.config.max_overdrive, &buckets, price_per_ms);
        match &result {
            Some(plan) => {
                metrics::OVERDRIVE_CHOSEN.with_label_values(&[&plan.num_overdrive.to_string()]).inc();
                metrics::ADJUSTED_DURATION_MS.observe(plan.adjusted_duration_ms);
            }
            None => metrics::PLANS_EMPTY.inc(),
        }
        result
    }
}
