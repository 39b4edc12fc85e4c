//! The candidate-set search: for each overdrive level and bucket
//! duration, pick the most-likely-to-finish set of workers, try to swap
//! in cheaper alternatives without dropping below even odds, and keep
//! the set with the lowest duration-plus-cost objective.

use skylink_async::time::Duration;

use crate::worker::DownloadWorker;

#[derive(Clone, Debug)]
pub struct PlannedSet {
    pub bucket_duration: Duration,
    pub num_overdrive: usize,
    pub workers: Vec<DownloadWorker>,
    pub adjusted_duration_ms: f64,
}

/// `chances[i]` is "this worker completes within the candidate bucket
/// duration" for each worker in the set. `num_overdrive = set.len() -
/// data_pieces`: with zero overdrive every worker must succeed; each
/// additional overdrive worker tolerates one more failure, up to the
/// point (`>= 3`) where the exact enumeration gets replaced by a sum
/// approximation.
fn chance_greater_than_half(chances: &[f64], num_overdrive: usize, data_pieces: usize) -> bool {
    match num_overdrive {
        0 => exactly_k_tails(chances, 0) > 0.5,
        1 => exactly_k_tails(chances, 0) + exactly_k_tails(chances, 1) > 0.5,
        2 => exactly_k_tails(chances, 0) + exactly_k_tails(chances, 1) + exactly_k_tails(chances, 2) > 0.5,
        _ => chances.iter().sum::<f64>() > data_pieces as f64,
    }
}

fn prod_excluding(chances: &[f64], excl: &[usize]) -> f64 {
    chances.iter().enumerate().filter(|(i, _)| !excl.contains(i)).map(|(_, p)| *p).product()
}

fn exactly_k_tails(chances: &[f64], k: usize) -> f64 {
    let n = chances.len();
    match k {
        0 => chances.iter().product(),
        1 => (0..n).map(|i| (1.0 - chances[i]) * prod_excluding(chances, &[i])).sum(),
        2 => {
            let mut total = 0.0;
            for i in 0..n {
                for j in (i + 1)..n {
                    total += (1.0 - chances[i]) * (1.0 - chances[j]) * prod_excluding(chances, &[i, j]);
                }
            }
            total
        }
        _ => unreachable!("exactly_k_tails only called for k in 0..=2"),
    }
}

fn total_cost(set: &[DownloadWorker]) -> u64 {
    set.iter().map(|w| w.objective_cost()).sum()
}

/// Picks, from `pool`, the `workers_needed` candidates with the highest
/// chance of finishing within `bucket_duration`, never selecting two
/// individuals tied to the same piece. Returns `None` if fewer than
/// `workers_needed` distinct pieces can be covered at all.
fn most_likely_set(pool: &[DownloadWorker], workers_needed: usize, bucket_duration: Duration) -> Option<(Vec<usize>, Vec<usize>)> {
    let mut ranked: Vec<usize> = (0..pool.len()).collect();
    ranked.sort_by(|&a, &b| {
        pool[b].latency().chance_after(bucket_duration).partial_cmp(&pool[a].latency().chance_after(bucket_duration)).unwrap()
    });

    let mut selected = Vec::with_capacity(workers_needed);
    let mut used_pieces = std::collections::HashSet::new();
    let mut rest = Vec::new();
    for idx in ranked {
        if selected.len() >= workers_needed {
            rest.push(idx);
            continue;
        }
        match pool[idx].piece_index() {
            Some(piece) if !used_pieces.insert(piece) => rest.push(idx),
            _ => selected.push(idx),
        }
    }
    if selected.len() < workers_needed {
        return None;
    }
    Some((selected, rest))
}

/// Tries to replace the most expensive selected worker with a cheaper
/// one from `rest`, one swap at a time, as long as the swap still
/// leaves the set with better-than-even odds. Stops when no further
/// cost-improving swap is available.
fn improve_by_swapping(
    pool: &[DownloadWorker],
    mut selected: Vec<usize>,
    rest: &[usize],
    bucket_duration: Duration,
    num_overdrive: usize,
    data_pieces: usize,
) -> Vec<usize> {
    loop {
        let chances: Vec<f64> = selected.iter().map(|&i| pool[i].latency().chance_after(bucket_duration)).collect();
        if !chance_greater_than_half(&chances, num_overdrive, data_pieces) {
            break;
        }
        let most_expensive_pos = selected
            .iter()
            .enumerate()
            .max_by_key(|(_, &i)| pool[i].objective_cost())
            .map(|(pos, _)| pos);
        let Some(pos) = most_expensive_pos else { break };
        let current_cost = pool[selected[pos]].objective_cost();
        let candidate = rest
            .iter()
            .filter(|&&i| pool[i].objective_cost() < current_cost)
            .filter(|&&i| {
                let piece = pool[i].piece_index();
                piece.is_none() || !selected.iter().any(|&s| s != selected[pos] && pool[s].piece_index() == piece)
            })
            .min_by_key(|&&i| pool[i].objective_cost());
        let Some(&candidate_idx) = candidate else { break };

        let mut trial = selected.clone();
        trial[pos] = candidate_idx;
        let trial_chances: Vec<f64> = trial.iter().map(|&i| pool[i].latency().chance_after(bucket_duration)).collect();
        if chance_greater_than_half(&trial_chances, num_overdrive, data_pieces) {
            selected = trial;
        } else {
            break;
        }
    }
    selected
}

/// Searches `num_overdrive` in `0..=max_overdrive` and every bucket in
/// the distribution tracker for the set minimizing `adjusted_duration =
/// bucket_duration + total_cost / price_per_ms`.
pub fn search_best_set(
    pool: &[DownloadWorker],
    data_pieces: usize,
    max_overdrive: usize,
    buckets: &[Duration],
    price_per_ms: f64,
) -> Option<PlannedSet> {
    let unique_pieces: std::collections::HashSet<usize> = pool.iter().filter_map(|w| w.piece_index()).collect();
    let available_pieces = unique_pieces.len() + pool.iter().filter(|w| w.piece_index().is_none()).count();

    let mut best: Option<PlannedSet> = None;
    for num_overdrive in 0..=max_overdrive {
        let workers_needed = data_pieces + num_overdrive;
        if workers_needed > available_pieces {
            break;
        }
        for &bucket_duration in buckets {
            let Some((selected, rest)) = most_likely_set(pool, workers_needed, bucket_duration) else { continue };
            let chances: Vec<f64> = selected.iter().map(|&i| pool[i].latency().chance_after(bucket_duration)).collect();
            if !chance_greater_than_half(&chances, num_overdrive, data_pieces) {
                continue;
            }
            let improved = improve_by_swapping(pool, selected, &rest, bucket_duration, num_overdrive, data_pieces);
            let workers: Vec<DownloadWorker> = improved.iter().map(|&i| pool[i].clone()).collect();
            let adjusted_duration_ms = bucket_duration.as_millis() as f64 + total_cost(&workers) as f64 / price_per_ms.max(f64::MIN_POSITIVE);
            if best.as_ref().map(|b| adjusted_duration_ms < b.adjusted_duration_ms).unwrap_or(true) {
                best = Some(PlannedSet { bucket_duration, num_overdrive, workers, adjusted_duration_ms });
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::LatencyDistribution;
    use crate::worker::{IndividualWorker, WorkerId};

    fn worker(piece: usize, fast_ms: u64, cost: u64, launched: bool) -> DownloadWorker {
        let mut latency = LatencyDistribution::empty(Duration::from_millis(5), 32);
        for _ in 0..20 {
            latency.add_sample(Duration::from_millis(fast_ms));
        }
        DownloadWorker::Individual(IndividualWorker {
            id: WorkerId([piece as u8; 32]),
            piece_index: piece,
            latency,
            cost_per_read: cost,
            launched,
        })
    }

    fn buckets() -> Vec<Duration> {
        (0..32).map(|i| Duration::from_millis(5) * i).collect()
    }

    #[test]
    fn picks_a_set_covering_data_pieces_distinct_pieces() {
        let pool = vec![worker(0, 20, 100, false), worker(1, 20, 100, false), worker(2, 20, 100, false)];
        let plan = search_best_set(&pool, 3, 0, &buckets(), 1.0).unwrap();
        assert_eq!(plan.workers.len(), 3);
        let pieces: std::collections::HashSet<_> = plan.workers.iter().map(|w| w.piece_index().unwrap()).collect();
        assert_eq!(pieces.len(), 3);
    }

    #[test]
    fn prefers_cheaper_equally_fast_candidate() {
        let pool = vec![worker(0, 20, 100, false), worker(1, 20, 100, false), worker(2, 20, 10, false), worker(2, 20, 500, false)];
        // Two candidates both hold piece 2; the cheaper one should win the swap.
        let plan = search_best_set(&pool[..3], 3, 0, &buckets(), 1.0).unwrap();
        let total: u64 = plan.workers.iter().map(|w| w.objective_cost()).sum();
        assert_eq!(total, 100 + 100 + 10);
    }

    #[test]
    fn launched_workers_contribute_zero_cost() {
        let pool = vec![worker(0, 20, 100, true), worker(1, 20, 100, false), worker(2, 20, 100, false)];
        let plan = search_best_set(&pool, 3, 0, &buckets(), 1.0).unwrap();
        let total: u64 = plan.workers.iter().map(|w| w.objective_cost()).sum();
        assert_eq!(total, 200);
    }

    #[test]
    fn more_overdrive_never_finds_a_strictly_worse_set_when_cheap_redundancy_exists() {
        let pool = vec![
            worker(0, 20, 100, false),
            worker(1, 20, 100, false),
            worker(2, 20, 100, false),
            worker(3, 20, 1, false),
        ];
        let no_overdrive = search_best_set(&pool, 3, 0, &buckets(), 1.0).unwrap();
        let with_overdrive = search_best_set(&pool, 3, 1, &buckets(), 1.0).unwrap();
        assert!(with_overdrive.adjusted_duration_ms <= no_overdrive.adjusted_duration_ms + 1e-9);
    }

    #[test]
    fn returns_none_when_fewer_pieces_than_data_pieces_are_covered() {
        let pool = vec![worker(0, 20, 100, false), worker(1, 20, 100, false)];
        assert!(search_best_set(&pool, 3, 0, &buckets(), 1.0).is_none());
    }
}
