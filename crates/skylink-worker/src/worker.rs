//! One worker per host: a long-lived task that owns a `HostConnection`,
//! drains priority-ordered job queues, and keeps its price table, gouging
//! verdict, and ephemeral account balance current.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use skylink_async::{CancelContext, Clock};
use skylink_primitives::{Hash, RegistryEntry};
use tokio::sync::{oneshot, Notify};

use crate::account::EphemeralAccount;
use crate::config::WorkerConfig;
use crate::connection::{HostConnection, Instruction, PaymentFrame, ProgramRequest, ProgramResponse};
use crate::cooldown::Cooldown;
use crate::error::WorkerError;
use crate::gouging::{self, GougingAllowance};
use crate::host_db::HostDb;
use crate::job::{JobKind, JobRequest, JobResponse, PriorityClass, UpdateRegistryOutcome, PRIORITY_ORDER};
use crate::metrics;
use crate::price_table::PriceTable;
use crate::queue::{JobQueue, QueuedJob};
use crate::registry_wire;

/// Bootstrap cost charged for the very first `UpdatePriceTable` RPC, before
/// any table has been fetched to price it against.
const BOOTSTRAP_PRICE_TABLE_COST: u64 = 0;

struct HostCache {
    block_height: u64,
    host_version: u32,
    contract_utility: bool,
}

struct Queues {
    has_sector: JobQueue,
    read_sector: JobQueue,
    read_registry: JobQueue,
    update_registry: JobQueue,
    fund_account: JobQueue,
    update_price_table: JobQueue,
}

impl Queues {
    fn new() -> Self {
        Self {
            has_sector: JobQueue::new(),
            read_sector: JobQueue::new(),
            read_registry: JobQueue::new(),
            update_registry: JobQueue::new(),
            fund_account: JobQueue::new(),
            update_price_table: JobQueue::new(),
        }
    }
}

/// A worker's view of one host: everything needed to price, authorize, and
/// pay for RPCs against that host's contract, plus the queues that order
/// work against it.
pub struct Worker {
    host_key: [u8; 32],
    contract_id: [u8; 32],
    account_id: [u8; 32],
    connection: Arc<dyn HostConnection>,
    host_db: Arc<dyn HostDb>,
    clock: Clock,
    config: WorkerConfig,
    allowance: GougingAllowance,
    account: EphemeralAccount,
    price_table: RwLock<Option<PriceTable>>,
    gouging_ok: AtomicBool,
    cache: Mutex<HostCache>,
    queues: Queues,
    wake: Notify,
    cancel: CancelContext,
}

impl Worker {
    pub fn new(
        host_key: [u8; 32],
        contract_id: [u8; 32],
        connection: Arc<dyn HostConnection>,
        host_db: Arc<dyn HostDb>,
        clock: Clock,
        config: WorkerConfig,
        allowance: GougingAllowance,
        cancel: CancelContext,
    ) -> Self {
        Self {
            host_key,
            contract_id,
            account_id: host_key,
            connection,
            host_db,
            clock,
            account: EphemeralAccount::new(0, config.account_refill_threshold, config.account_refill_amount),
            config,
            allowance,
            price_table: RwLock::new(None),
            gouging_ok: AtomicBool::new(false),
            cache: Mutex::new(HostCache { block_height: 0, host_version: 0, contract_utility: true }),
            queues: Queues::new(),
            wake: Notify::new(),
            cancel,
        }
    }

    pub fn host_key(&self) -> [u8; 32] {
        self.host_key
    }

    /// True if this worker's host has a fresh, non-gouging price table and
    /// enough confirmed balance to pay for the next RPC. Shared by every
    /// caller that needs to filter a worker pool down to eligible hosts,
    /// independent of which job kinds that caller is about to issue.
    pub fn is_priced_and_funded(&self) -> bool {
        let now = self.clock.now();
        self.price_table.read().as_ref().is_some_and(|t| !t.is_expired(now))
            && self.gouging_ok.load(Ordering::Acquire)
            && self.account.is_funded_above(self.config.account_funded_threshold)
    }

    /// True if this worker's host is currently a reasonable pick to include
    /// in a download: priced and funded, and not backing off on the two
    /// job kinds a download actually issues.
    pub fn good_for_download(&self) -> bool {
        let now = self.clock.now();
        self.is_priced_and_funded()
            && !self.queues.has_sector.is_on_cooldown(now)
            && !self.queues.read_sector.is_on_cooldown(now)
            && !self.queues.has_sector.is_killed()
    }

    /// Penalizes this worker's registry-update queue outside the normal
    /// job-completion path, used when a caller above this crate detects a
    /// host contradicting a revision it previously acknowledged.
    pub fn record_registry_cheating(&self) {
        self.queues.update_registry.record_outcome(self.clock.now(), skylink_async::time::Duration::ZERO, false);
    }

    /// Current price estimate for a `read_sector` of `length` bytes, or
    /// `None` before the first price table has been fetched.
    pub fn read_sector_cost_estimate(&self, length: u64) -> Option<u64> {
        self.price_table.read().as_ref().map(|t| t.read_sector_cost(length))
    }

    /// Decayed average latency of this worker's `read_sector` queue, used
    /// to seed a download's expected latency for an already-resolved
    /// holder.
    pub fn read_sector_average_latency(&self) -> skylink_async::time::Duration {
        self.queues.read_sector.average_job_time()
    }

    /// Host-db-reported probability this host still holds a given piece of
    /// a `num_pieces`-piece erasure code.
    pub fn availability_rate(&self, num_pieces: usize) -> f64 {
        self.host_db.lookup(&self.host_key).map(|e| e.availability_rate(num_pieces)).unwrap_or(0.0)
    }

    pub async fn has_sector(&self, roots: Vec<Hash>) -> Result<Vec<bool>, WorkerError> {
        match self.submit(JobRequest::HasSector { roots }).await? {
            JobResponse::HasSector(bitmap) => Ok(bitmap),
            _ => unreachable!("has_sector job always returns JobResponse::HasSector"),
        }
    }

    pub async fn read_sector(&self, root: Hash, offset: u64, length: u64) -> Result<(Vec<u8>, Vec<u8>), WorkerError> {
        match self.submit(JobRequest::ReadSector { root, offset, length, merkle_proof: true }).await? {
            JobResponse::ReadSector { data, proof } => Ok((data, proof)),
            _ => unreachable!("read_sector job always returns JobResponse::ReadSector"),
        }
    }

    pub async fn read_registry(
        &self,
        public_key: [u8; 32],
        tweak: [u8; 32],
    ) -> Result<Option<RegistryEntry>, WorkerError> {
        match self.submit(JobRequest::ReadRegistry { public_key, tweak }).await? {
            JobResponse::ReadRegistry(entry) => Ok(entry),
            _ => unreachable!("read_registry job always returns JobResponse::ReadRegistry"),
        }
    }

    pub async fn update_registry(&self, entry: RegistryEntry) -> Result<UpdateRegistryOutcome, WorkerError> {
        match self.submit(JobRequest::UpdateRegistry { entry }).await? {
            JobResponse::UpdateRegistry(outcome) => Ok(outcome),
            _ => unreachable!("update_registry job always returns JobResponse::UpdateRegistry"),
        }
    }

    pub async fn update_price_table(&self) -> Result<(), WorkerError> {
        match self.submit(JobRequest::UpdatePriceTable).await? {
            JobResponse::UpdatePriceTable => Ok(()),
            _ => unreachable!("update_price_table job always returns JobResponse::UpdatePriceTable"),
        }
    }

    /// Requests `amount` more be deposited into the ephemeral account, paid
    /// from the underlying contract. Tracked here so a rejected submission
    /// (queue killed or on cooldown) doesn't leave a phantom deposit
    /// outstanding.
    pub async fn fund_account(&self, amount: u64) -> Result<u64, WorkerError> {
        self.account.track_deposit(amount);
        match self.submit(JobRequest::FundAccount { amount }).await {
            Ok(JobResponse::FundAccount(balance)) => Ok(balance),
            Ok(_) => unreachable!("fund_account job always returns JobResponse::FundAccount"),
            Err(err) => {
                self.account.commit_deposit(amount, false);
                Err(err)
            }
        }
    }

    async fn submit(&self, request: JobRequest) -> Result<JobResponse, WorkerError> {
        let kind = request.kind();
        metrics::JOBS_SUBMITTED.with_label_values(&[kind_label(kind)]).inc();
        let (responder, rx) = oneshot::channel();
        let accepted = self.queue_for(kind).add(QueuedJob { request, responder }, self.clock.now());
        if !accepted {
            return Err(if self.queue_for(kind).is_killed() { WorkerError::Killed } else { WorkerError::QueueOnCooldown });
        }
        self.wake.notify_one();
        rx.await.unwrap_or(Err(WorkerError::Killed))
    }

    fn queue_for(&self, kind: JobKind) -> &JobQueue {
        match kind {
            JobKind::HasSector => &self.queues.has_sector,
            JobKind::ReadSector => &self.queues.read_sector,
            JobKind::ReadRegistry => &self.queues.read_registry,
            JobKind::UpdateRegistry => &self.queues.update_registry,
            JobKind::FundAccount => &self.queues.fund_account,
            JobKind::UpdatePriceTable => &self.queues.update_price_table,
        }
    }

    /// The dedicated long-lived task body. Exits when cancelled or when the
    /// host drops out of the host database; on exit, every queued job is
    /// failed with [`WorkerError::Killed`] rather than left to time out.
    pub async fn run(self: Arc<Self>) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = self.clock.sleep(self.config.cache_refresh_interval) => {
                    if !self.refresh_cache().await {
                        break;
                    }
                }
                _ = self.wake.notified() => {}
            }
            self.ensure_price_table_fresh();
            self.trigger_auto_refill();
            if let Some((kind, job)) = self.pop_next_job() {
                self.run_one(kind, job).await;
                self.wake.notify_one();
            }
        }
        self.teardown();
    }

    fn pop_next_job(&self) -> Option<(JobKind, QueuedJob)> {
        for class in PRIORITY_ORDER {
            for kind in JobKind::all_in_class(class) {
                if let Some(job) = self.queue_for(*kind).pop_front() {
                    return Some((*kind, job));
                }
            }
        }
        None
    }

    async fn run_one(&self, kind: JobKind, job: QueuedJob) {
        let start = self.clock.now();
        let result = self.execute(job.request).await;
        let elapsed = self.clock.now().saturating_duration_since(start);
        let success = result.is_ok();
        self.queue_for(kind).record_outcome(self.clock.now(), elapsed, success);
        metrics::QUEUE_DEPTH
            .with_label_values(&[kind_label(kind)])
            .set(if self.queue_for(kind).is_empty() { 0 } else { 1 });
        if success {
            metrics::JOBS_SUCCEEDED.with_label_values(&[kind_label(kind)]).inc();
        } else {
            metrics::JOBS_FAILED.with_label_values(&[kind_label(kind)]).inc();
        }
        metrics::ACCOUNT_BALANCE
            .with_label_values(&[&hex::encode(self.host_key)])
            .set(self.account.confirmed_balance() as i64);
        let _ = job.responder.send(result);
    }

    async fn execute(&self, request: JobRequest) -> Result<JobResponse, WorkerError> {
        match request {
            JobRequest::HasSector { roots } => self.exec_has_sector(roots).await,
            JobRequest::ReadSector { root, offset, length, .. } => self.exec_read_sector(root, offset, length).await,
            JobRequest::ReadRegistry { public_key, tweak } => self.exec_read_registry(public_key, tweak).await,
            JobRequest::UpdateRegistry { entry } => self.exec_update_registry(entry).await,
            JobRequest::FundAccount { amount } => self.exec_fund_account(amount).await,
            JobRequest::UpdatePriceTable => self.exec_update_price_table().await,
        }
    }

    fn current_price_table(&self) -> Result<PriceTable, WorkerError> {
        let now = self.clock.now();
        self.price_table
            .read()
            .as_ref()
            .filter(|t| !t.is_expired(now))
            .cloned()
            .ok_or(WorkerError::PriceTableExpired)
    }

    async fn run_program(
        &self,
        table: &PriceTable,
        instructions: Vec<Instruction>,
        cost: u64,
    ) -> Result<Vec<ProgramResponse>, WorkerError> {
        self.account.track_withdrawal(cost);
        let req = ProgramRequest {
            contract_id: self.contract_id,
            price_table_uid: table.uid,
            payment: PaymentFrame {
                account_id: self.account_id,
                amount: cost,
                blockheight: self.cache.lock().block_height,
            },
            instructions,
            program_data: Vec::new(),
        };
        let result = self.connection.execute_program(req).await;
        self.account.commit_withdrawal(cost, result.is_ok());
        let responses = result?;
        if responses.iter().any(|r| r.error.as_deref() == Some("price-table-invalid")) {
            *self.price_table.write() = None;
            return Err(WorkerError::PriceTableInvalid);
        }
        Ok(responses)
    }

    async fn exec_has_sector(&self, roots: Vec<Hash>) -> Result<JobResponse, WorkerError> {
        let table = self.current_price_table()?;
        let cost = table.has_sector_base_cost.saturating_mul(roots.len() as u64);
        let instructions = roots.iter().map(|root| Instruction::HasSector { root: *root }).collect();
        let responses = self.run_program(&table, instructions, cost).await?;
        let bitmap = responses.iter().map(|r| r.error.is_none() && r.output.first() == Some(&1)).collect();
        Ok(JobResponse::HasSector(bitmap))
    }

    async fn exec_read_sector(&self, root: Hash, offset: u64, length: u64) -> Result<JobResponse, WorkerError> {
        let table = self.current_price_table()?;
        let cost = table.read_sector_cost(length);
        let instructions = vec![Instruction::ReadSector { root, offset, length, merkle_proof: true }];
        let responses = self.run_program(&table, instructions, cost).await?;
        let resp = responses.into_iter().next().ok_or_else(|| WorkerError::HostFault("empty program response".into()))?;
        if let Some(err) = resp.error {
            return Err(WorkerError::HostFault(err));
        }
        Ok(JobResponse::ReadSector { data: resp.output, proof: resp.proof })
    }

    async fn exec_read_registry(&self, public_key: [u8; 32], tweak: [u8; 32]) -> Result<JobResponse, WorkerError> {
        let table = self.current_price_table()?;
        let cost = table.read_registry_cost;
        let instructions = vec![Instruction::ReadRegistry { public_key, tweak }];
        let responses = self.run_program(&table, instructions, cost).await?;
        let resp = responses.into_iter().next().ok_or_else(|| WorkerError::HostFault("empty program response".into()))?;
        match resp.error.as_deref() {
            Some(registry_wire::ERR_ENTRY_NOT_FOUND) => Ok(JobResponse::ReadRegistry(None)),
            Some(other) => Err(WorkerError::HostFault(other.to_string())),
            None => {
                let entry = registry_wire::decode_entry(&resp.output)
                    .ok_or_else(|| WorkerError::HostFault("malformed registry entry".into()))?;
                Ok(JobResponse::ReadRegistry(Some(entry)))
            }
        }
    }

    async fn exec_update_registry(&self, entry: RegistryEntry) -> Result<JobResponse, WorkerError> {
        let table = self.current_price_table()?;
        let cost = table.update_registry_cost;
        let instructions = vec![Instruction::UpdateRegistry { entry }];
        let responses = self.run_program(&table, instructions, cost).await?;
        let resp = responses.into_iter().next().ok_or_else(|| WorkerError::HostFault("empty program response".into()))?;
        match resp.error.as_deref() {
            None => Ok(JobResponse::UpdateRegistry(UpdateRegistryOutcome::Accepted)),
            Some(registry_wire::ERR_LOWER_REV_NUM) => {
                let proof = registry_wire::decode_entry(&resp.output)
                    .ok_or_else(|| WorkerError::HostFault("host omitted proof entry".into()))?;
                Ok(JobResponse::UpdateRegistry(UpdateRegistryOutcome::LowerRevNum(proof)))
            }
            Some(registry_wire::ERR_SAME_REV_NUM) => {
                let proof = registry_wire::decode_entry(&resp.output)
                    .ok_or_else(|| WorkerError::HostFault("host omitted proof entry".into()))?;
                Ok(JobResponse::UpdateRegistry(UpdateRegistryOutcome::SameRevNum(proof)))
            }
            Some(other) => Err(WorkerError::HostFault(other.to_string())),
        }
    }

    /// Funds-on-contract RPC. Assumes the deposit has already been tracked
    /// by the caller (either [`Worker::fund_account`] or the auto-refill
    /// trigger); this only drives the RPC and commits.
    async fn exec_fund_account(&self, amount: u64) -> Result<JobResponse, WorkerError> {
        let result = self.connection.fund_account(self.account_id, amount).await;
        self.account.commit_deposit(amount, result.is_ok());
        let resp = result?;
        Ok(JobResponse::FundAccount(resp.balance))
    }

    async fn exec_update_price_table(&self) -> Result<JobResponse, WorkerError> {
        let cost = self.price_table.read().as_ref().map(|t| t.update_price_table_cost).unwrap_or(BOOTSTRAP_PRICE_TABLE_COST);
        self.account.track_withdrawal(cost);
        let result = self.connection.fetch_price_table().await;
        self.account.commit_withdrawal(cost, result.is_ok());
        let table = result?;
        if let Err(err) = gouging::check(&table, &self.allowance) {
            *self.price_table.write() = None;
            self.gouging_ok.store(false, Ordering::Release);
            return Err(err);
        }
        self.gouging_ok.store(true, Ordering::Release);
        *self.price_table.write() = Some(table);
        Ok(JobResponse::UpdatePriceTable)
    }

    fn ensure_price_table_fresh(&self) {
        let now = self.clock.now();
        let stale = self.price_table.read().as_ref().map(|t| t.is_expired(now)).unwrap_or(true);
        if stale && self.queues.update_price_table.is_empty() && !self.queues.update_price_table.is_killed() {
            let (responder, _rx) = oneshot::channel();
            self.queues.update_price_table.add(
                QueuedJob { request: JobRequest::UpdatePriceTable, responder },
                now,
            );
        }
    }

    fn trigger_auto_refill(&self) {
        if let Some(amount) = self.account.maybe_start_refill() {
            let (responder, _rx) = oneshot::channel();
            self.queues.fund_account.add(QueuedJob { request: JobRequest::FundAccount { amount }, responder }, self.clock.now());
        }
    }

    async fn refresh_cache(&self) -> bool {
        match self.host_db.lookup(&self.host_key) {
            Some(entry) => {
                *self.cache.lock() = HostCache {
                    block_height: entry.block_height,
                    host_version: entry.host_version,
                    contract_utility: entry.contract_utility,
                };
                if !entry.contract_utility {
                    tracing::info!(host = %hex::encode(self.host_key), "contract no longer useful, tearing down worker");
                    return false;
                }
                true
            }
            None => {
                tracing::warn!(host = %hex::encode(self.host_key), "host dropped from host database, tearing down worker");
                false
            }
        }
    }

    fn teardown(&self) {
        self.cancel.cancel();
        self.queues.has_sector.kill();
        self.queues.read_sector.kill();
        self.queues.read_registry.kill();
        self.queues.update_registry.kill();
        self.queues.fund_account.kill();
        self.queues.update_price_table.kill();
    }
}

fn kind_label(kind: JobKind) -> &'static str {
    match kind {
        JobKind::HasSector => "has_sector",
        JobKind::ReadSector => "read_sector",
        JobKind::ReadRegistry => "read_registry",
        JobKind::UpdateRegistry => "update_registry",
        JobKind::FundAccount => "fund_account",
        JobKind::UpdatePriceTable => "update_price_table",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::FundAccountResponse;
    use async_trait::async_trait;

    struct FakeHost {
        has_sector_replies: Vec<bool>,
        price_table_cost: u64,
        fail_program: AtomicBool,
    }

    #[async_trait]
    impl HostConnection for FakeHost {
        async fn execute_program(&self, req: ProgramRequest) -> Result<Vec<ProgramResponse>, WorkerError> {
            if self.fail_program.load(Ordering::Relaxed) {
                return Err(WorkerError::Unreachable);
            }
            Ok(req
                .instructions
                .iter()
                .enumerate()
                .map(|(i, _)| ProgramResponse {
                    new_size: 0,
                    new_merkle_root: skylink_primitives::Hash::zero(),
                    output: vec![self.has_sector_replies.get(i).copied().unwrap_or(false) as u8],
                    proof: Vec::new(),
                    error: None,
                    total_cost: 0,
                    failure_refund: 0,
                })
                .collect())
        }

        async fn fund_account(&self, _account_id: [u8; 32], amount: u64) -> Result<FundAccountResponse, WorkerError> {
            Ok(FundAccountResponse { balance: amount })
        }

        async fn fetch_price_table(&self) -> Result<PriceTable, WorkerError> {
            Ok(PriceTable {
                uid: [0; 16],
                host_blockheight: 0,
                has_sector_base_cost: 1,
                read_sector_base_cost: 1,
                read_sector_cost_per_byte: 1,
                read_registry_cost: 1,
                update_registry_cost: 1,
                fund_account_cost: 1,
                update_price_table_cost: self.price_table_cost,
                renew_contract_cost: 1,
                txn_fee_min: 1,
                expires_at: Clock::real().now() + skylink_async::time::Duration::from_secs(3600),
            })
        }
    }

    struct AlwaysPresentHostDb;
    impl HostDb for AlwaysPresentHostDb {
        fn lookup(&self, _host_key: &[u8; 32]) -> Option<crate::host_db::HostDbEntry> {
            Some(crate::host_db::HostDbEntry { block_height: 10, host_version: 1, contract_utility: true })
        }
    }

    fn worker(host: FakeHost) -> Arc<Worker> {
        Arc::new(Worker::new(
            [1u8; 32],
            [2u8; 32],
            Arc::new(host),
            Arc::new(AlwaysPresentHostDb),
            Clock::fake(),
            WorkerConfig::test(),
            GougingAllowance::default(),
            CancelContext::root(),
        ))
    }

    #[tokio::test]
    async fn has_sector_requires_price_table_first() {
        let w = worker(FakeHost { has_sector_replies: vec![true], price_table_cost: 0, fail_program: AtomicBool::new(false) });
        tokio::spawn(Arc::clone(&w).run());
        let err = w.has_sector(vec![skylink_primitives::Hash::zero()]).await.unwrap_err();
        assert_eq!(err, WorkerError::PriceTableExpired);
    }

    #[tokio::test]
    async fn update_price_table_then_has_sector_succeeds() {
        let w = worker(FakeHost { has_sector_replies: vec![true, false], price_table_cost: 0, fail_program: AtomicBool::new(false) });
        tokio::spawn(Arc::clone(&w).run());
        w.update_price_table().await.unwrap();
        let bitmap = w.has_sector(vec![skylink_primitives::Hash::zero(), skylink_primitives::Hash::zero()]).await.unwrap();
        assert_eq!(bitmap, vec![true, false]);
    }

    #[tokio::test]
    async fn gouging_price_table_is_rejected_and_not_cached() {
        let w = worker(FakeHost { has_sector_replies: vec![], price_table_cost: u64::MAX, fail_program: AtomicBool::new(false) });
        tokio::spawn(Arc::clone(&w).run());
        let err = w.update_price_table().await.unwrap_err();
        assert!(matches!(err, WorkerError::Gouging(_)));
        assert!(!w.good_for_download());
    }

    #[tokio::test]
    async fn fund_account_rolls_back_tracking_when_queue_killed() {
        let w = worker(FakeHost { has_sector_replies: vec![], price_table_cost: 0, fail_program: AtomicBool::new(false) });
        w.queues.fund_account.kill();
        let err = w.fund_account(500).await.unwrap_err();
        assert_eq!(err, WorkerError::Killed);
        assert_eq!(w.account.available(), 0);
    }

    #[tokio::test]
    async fn run_drains_submitted_job_and_exits_on_cancel() {
        let w = worker(FakeHost { has_sector_replies: vec![true], price_table_cost: 0, fail_program: AtomicBool::new(false) });
        let cancel = w.cancel.clone();
        let handle = tokio::spawn(Arc::clone(&w).run());
        w.update_price_table().await.unwrap();
        let bitmap = w.has_sector(vec![skylink_primitives::Hash::zero()]).await.unwrap();
        assert_eq!(bitmap, vec![true]);
        cancel.cancel();
        handle.await.unwrap();
        assert!(w.queues.has_sector.is_killed());
    }
}
