//! The two kinds of candidate the search chooses between: a worker already
//! known to hold a specific piece, and a synthetic "chimera" standing in
//! for a pool of not-yet-resolved workers.

use crate::distribution::LatencyDistribution;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorkerId(pub [u8; 32]);

/// A worker already known (via `HasSector`) to hold a specific piece.
/// Launchable; once launched its cost is sunk and no longer counted in
/// the search objective.
#[derive(Clone, Debug)]
pub struct IndividualWorker {
    pub id: WorkerId,
    pub piece_index: usize,
    pub latency: LatencyDistribution,
    pub cost_per_read: u64,
    pub launched: bool,
}

/// A synthetic worker representing a whole unit of resolve-chance packed
/// from one or more not-yet-resolved workers. Never launched: it exists
/// only to weigh "wait for an unresolved worker" against "use a known,
/// possibly worse, resolved worker" in the search.
#[derive(Clone, Debug)]
pub struct ChimeraWorker {
    pub latency: LatencyDistribution,
    pub cost_per_read: u64,
    pub member_count: usize,
}

#[derive(Clone, Debug)]
pub enum DownloadWorker {
    Individual(IndividualWorker),
    Chimera(ChimeraWorker),
}

impl DownloadWorker {
    pub fn latency(&self) -> &LatencyDistribution {
        match self {
            DownloadWorker::Individual(w) => &w.latency,
            DownloadWorker::Chimera(w) => &w.latency,
        }
    }

    /// Cost counted in the search objective: zero for an already-launched
    /// worker (sunk), its per-read price otherwise. A chimera is never
    /// launched so always contributes its synthetic cost.
    pub fn objective_cost(&self) -> u64 {
        match self {
            DownloadWorker::Individual(w) if w.launched => 0,
            DownloadWorker::Individual(w) => w.cost_per_read,
            DownloadWorker::Chimera(w) => w.cost_per_read,
        }
    }

    pub fn piece_index(&self) -> Option<usize> {
        match self {
            DownloadWorker::Individual(w) => Some(w.piece_index),
            DownloadWorker::Chimera(_) => None,
        }
    }

    pub fn is_launchable(&self) -> bool {
        matches!(self, DownloadWorker::Individual(_))
    }

    pub fn is_launched(&self) -> bool {
        matches!(self, DownloadWorker::Individual(w) if w.launched)
    }
}

/// A not-yet-resolved worker, as input to chimera packing: its chance of
/// turning out to hold a needed piece, its estimated latency and cost
/// once it does, and an expected-resolve ordering key so the pack is
/// built earliest-resolving-first.
#[derive(Clone, Debug)]
pub struct UnresolvedWorker {
    pub id: WorkerId,
    pub resolve_chance: f64,
    pub latency: LatencyDistribution,
    pub cost_per_read: u64,
    pub expected_resolve: skylink_async::time::Duration,
}

/// Greedily packs unresolved workers, earliest-expected-resolve first,
/// into chimeras whose summed resolve-chance reaches exactly 1.0 each —
/// splitting a worker across the boundary between two chimeras when its
/// chance doesn't land exactly on it.
pub fn pack_chimeras(mut unresolved: Vec<UnresolvedWorker>, bucket_width: skylink_async::time::Duration, num_buckets: usize) -> Vec<ChimeraWorker> {
    unresolved.sort_by(|a, b| a.expected_resolve.cmp(&b.expected_resolve));

    let mut chimeras = Vec::new();
    let mut mass = 0.0;
    let mut latency = LatencyDistribution::empty(bucket_width, num_buckets);
    let mut cost_sum = 0.0;
    let mut count = 0usize;

    for worker in &unresolved {
        let mut remaining = worker.resolve_chance;
        while remaining > 1e-12 {
            let room = 1.0 - mass;
            let take = remaining.min(room);
            if take <= 1e-12 {
                break;
            }
            latency = latency.merge_with_weight(&worker.latency, mass, take);
            cost_sum += worker.cost_per_read as f64;
            count += 1;
            mass += take;
            remaining -= take;
            if mass >= 1.0 - 1e-9 {
                chimeras.push(ChimeraWorker { latency: latency.clone(), cost_per_read: (cost_sum / count as f64).round() as u64, member_count: count });
                mass = 0.0;
                latency = LatencyDistribution::empty(bucket_width, num_buckets);
                cost_sum = 0.0;
                count = 0;
            }
        }
    }
    if mass > 1e-9 {
        chimeras.push(ChimeraWorker { latency, cost_per_read: (cost_sum / count.max(1) as f64).round() as u64, member_count: count });
    }
    chimeras
}

#[cfg(test)]
mod tests {
    use super::*;
    use skylink_async::time::Duration;

    fn unresolved(chance: f64, cost: u64) -> UnresolvedWorker {
        UnresolvedWorker {
            id: WorkerId([0u8; 32]),
            resolve_chance: chance,
            latency: LatencyDistribution::empty(Duration::from_millis(10), 8),
            cost_per_read: cost,
            expected_resolve: Duration::from_millis(10),
        }
    }

    #[test]
    fn two_half_chance_workers_pack_into_one_chimera() {
        let chimeras = pack_chimeras(vec![unresolved(0.5, 10), unresolved(0.5, 20)], Duration::from_millis(10), 8);
        assert_eq!(chimeras.len(), 1);
        assert_eq!(chimeras[0].member_count, 2);
    }

    #[test]
    fn a_worker_straddling_the_boundary_splits_across_two_chimeras() {
        let chimeras = pack_chimeras(vec![unresolved(0.6, 10), unresolved(0.8, 20)], Duration::from_millis(10), 8);
        assert_eq!(chimeras.len(), 2);
        assert_eq!(chimeras[0].member_count, 2);
        assert_eq!(chimeras[1].member_count, 1);
    }

    #[test]
    fn leftover_mass_below_one_still_forms_a_final_chimera() {
        let chimeras = pack_chimeras(vec![unresolved(0.3, 10)], Duration::from_millis(10), 8);
        assert_eq!(chimeras.len(), 1);
    }
}
