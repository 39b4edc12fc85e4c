//! Per-chunk has-sector bookkeeping: which workers have replied, and which
//! of them hold which piece. Shared behind a single mutex per chunk, as
//! the readers (the scheduler's planning loop) only ever take a snapshot
//! and never hold the lock across I/O.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use skylink_worker::Worker;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkState {
    Resolving,
    PartiallyResolved,
    FullyResolved,
    Failed,
}

struct Inner {
    holders: Vec<VecDeque<Arc<Worker>>>,
    pending: Vec<Arc<Worker>>,
    responded: usize,
    eligible_total: usize,
}

pub struct HolderTable {
    inner: Mutex<Inner>,
    data_pieces: usize,
}

impl HolderTable {
    pub fn new(num_pieces: usize, data_pieces: usize, eligible: Vec<Arc<Worker>>) -> Self {
        let eligible_total = eligible.len();
        Self {
            inner: Mutex::new(Inner {
                holders: (0..num_pieces).map(|_| VecDeque::new()).collect(),
                pending: eligible,
                responded: 0,
                eligible_total,
            }),
            data_pieces,
        }
    }

    /// Records a `HasSector` reply: `bitmap[i]` true means `worker` holds
    /// piece `i`. No-op if `worker` already replied or timed out.
    pub fn record_reply(&self, worker: &Arc<Worker>, bitmap: &[bool]) {
        let mut inner = self.inner.lock();
        if !remove_pending(&mut inner.pending, worker) {
            return;
        }
        inner.responded += 1;
        for (piece_index, &has_it) in bitmap.iter().enumerate() {
            if has_it {
                if let Some(queue) = inner.holders.get_mut(piece_index) {
                    queue.push_back(Arc::clone(worker));
                }
            }
        }
    }

    /// Records that `worker` timed out or errored during discovery:
    /// counts toward "every worker has replied or timed out" without
    /// adding any holder entries.
    pub fn record_timeout(&self, worker: &Arc<Worker>) {
        let mut inner = self.inner.lock();
        if remove_pending(&mut inner.pending, worker) {
            inner.responded += 1;
        }
    }

    /// Drops `worker` from `piece_index`'s holder list, e.g. after a read
    /// error or proof mismatch.
    pub fn remove_holder(&self, piece_index: usize, host_key: [u8; 32]) {
        let mut inner = self.inner.lock();
        if let Some(queue) = inner.holders.get_mut(piece_index) {
            queue.retain(|w| w.host_key() != host_key);
        }
    }

    /// One known holder per resolved piece index (the longest-known
    /// holder, i.e. the front of that piece's FIFO).
    pub fn resolved_map(&self) -> HashMap<usize, Arc<Worker>> {
        let inner = self.inner.lock();
        inner
            .holders
            .iter()
            .enumerate()
            .filter_map(|(idx, q)| q.front().cloned().map(|w| (idx, w)))
            .collect()
    }

    pub fn pending_workers(&self) -> Vec<Arc<Worker>> {
        self.inner.lock().pending.clone()
    }

    pub fn state(&self) -> ChunkState {
        let inner = self.inner.lock();
        let resolved_pieces = inner.holders.iter().filter(|q| !q.is_empty()).count();
        let discovery_complete = inner.responded >= inner.eligible_total;
        if discovery_complete && resolved_pieces < self.data_pieces {
            ChunkState::Failed
        } else if discovery_complete {
            ChunkState::FullyResolved
        } else if resolved_pieces > 0 {
            ChunkState::PartiallyResolved
        } else {
            ChunkState::Resolving
        }
    }
}

fn remove_pending(pending: &mut Vec<Arc<Worker>>, worker: &Arc<Worker>) -> bool {
    let before = pending.len();
    pending.retain(|w| w.host_key() != worker.host_key());
    pending.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use skylink_async::{CancelContext, Clock};
    use skylink_worker::{GougingAllowance, HostConnection, HostDb, HostDbEntry, WorkerConfig, WorkerError};
    use async_trait::async_trait;

    struct NoopHost;
    #[async_trait]
    impl HostConnection for NoopHost {
        async fn execute_program(
            &self,
            _req: skylink_worker::ProgramRequest,
        ) -> Result<Vec<skylink_worker::ProgramResponse>, WorkerError> {
            Err(WorkerError::Unreachable)
        }
        async fn fund_account(&self, _account_id: [u8; 32], _amount: u64) -> Result<skylink_worker::FundAccountResponse, WorkerError> {
            Err(WorkerError::Unreachable)
        }
        async fn fetch_price_table(&self) -> Result<skylink_worker::PriceTable, WorkerError> {
            Err(WorkerError::Unreachable)
        }
    }

    struct StaticHostDb;
    impl HostDb for StaticHostDb {
        fn lookup(&self, _host_key: &[u8; 32]) -> Option<HostDbEntry> {
            Some(HostDbEntry { block_height: 1, host_version: 1, contract_utility: true })
        }
    }

    fn worker(id: u8) -> Arc<Worker> {
        Arc::new(Worker::new(
            [id; 32],
            [9u8; 32],
            Arc::new(NoopHost),
            Arc::new(StaticHostDb),
            Clock::fake(),
            WorkerConfig::test(),
            GougingAllowance::default(),
            CancelContext::root(),
        ))
    }

    #[test]
    fn resolving_until_any_reply_then_partially_resolved() {
        let a = worker(1);
        let b = worker(2);
        let table = HolderTable::new(3, 2, vec![a.clone(), b.clone()]);
        assert_eq!(table.state(), ChunkState::Resolving);
        table.record_reply(&a, &[true, false, false]);
        assert_eq!(table.state(), ChunkState::PartiallyResolved);
    }

    #[test]
    fn fully_resolved_once_every_worker_has_answered() {
        let a = worker(1);
        let b = worker(2);
        let table = HolderTable::new(2, 2, vec![a.clone(), b.clone()]);
        table.record_reply(&a, &[true, true]);
        table.record_reply(&b, &[true, false]);
        assert_eq!(table.state(), ChunkState::FullyResolved);
    }

    #[test]
    fn failed_when_fewer_than_data_pieces_resolve() {
        let a = worker(1);
        let table = HolderTable::new(2, 2, vec![a.clone()]);
        table.record_reply(&a, &[true, false]);
        assert_eq!(table.state(), ChunkState::Failed);
    }

    #[test]
    fn timeout_counts_toward_completion_without_adding_a_holder() {
        let a = worker(1);
        let table = HolderTable::new(1, 1, vec![a.clone()]);
        table.record_timeout(&a);
        assert_eq!(table.state(), ChunkState::Failed);
    }

    #[test]
    fn removing_a_holder_after_discovery_can_flip_to_failed() {
        let a = worker(1);
        let b = worker(2);
        let table = HolderTable::new(1, 1, vec![a.clone(), b.clone()]);
        table.record_reply(&a, &[true]);
        table.record_reply(&b, &[true]);
        assert_eq!(table.state(), ChunkState::FullyResolved);
        table.remove_holder(0, a.host_key());
        table.remove_holder(0, b.host_key());
        assert_eq!(table.state(), ChunkState::Failed);
    }
}
