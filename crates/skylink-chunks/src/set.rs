//! One chunk worker set: owns has-sector discovery state for a single
//! logical chunk and serves arbitrary sub-range downloads from it by
//! driving an instance of the download scheduler per call.

use std::collections::HashMap;
use std::sync::Arc;

use skylink_async::{CancelContext, Clock};
use skylink_primitives::erasure::ErasureCode;
use skylink_primitives::{ChunkRootSet, SkylinkError, SECTOR_SIZE};
use skylink_scheduler::{DownloadWorker, IndividualWorker, LatencyDistribution, Planner, RePlanTrigger, UnresolvedWorker, WorkerId};
use skylink_worker::Worker;
use tokio::sync::mpsc;

use crate::cipher;
use crate::config::ChunkConfig;
use crate::discovery;
use crate::error::ChunkError;
use crate::holders::{ChunkState, HolderTable};
use crate::metrics;
use crate::proof::SectorProofVerifier;

type ReadOutcome = (usize, Result<(Vec<u8>, Vec<u8>), skylink_worker::WorkerError>);

pub struct ChunkWorkerSet {
    root_set: ChunkRootSet,
    erasure_code: Arc<dyn ErasureCode>,
    decryption_key: Option<[u8; 64]>,
    chunk_index: u64,
    holders: Arc<HolderTable>,
    trigger: Arc<RePlanTrigger>,
    proof_verifier: Arc<dyn SectorProofVerifier>,
    config: ChunkConfig,
    clock: Clock,
}

impl ChunkWorkerSet {
    /// Seeds the has-sector discovery jobs against `workers` (filtered to
    /// those currently `good_for_download`) and returns immediately;
    /// discovery proceeds in the background.
    pub fn new(
        root_set: ChunkRootSet,
        erasure_code: Arc<dyn ErasureCode>,
        decryption_key: Option<[u8; 64]>,
        chunk_index: u64,
        workers: Vec<Arc<Worker>>,
        proof_verifier: Arc<dyn SectorProofVerifier>,
        clock: Clock,
        config: ChunkConfig,
    ) -> Arc<Self> {
        let eligible: Vec<Arc<Worker>> = workers.into_iter().filter(|w| w.good_for_download()).collect();
        let holders = Arc::new(HolderTable::new(root_set.num_pieces(), erasure_code.data_pieces(), eligible.clone()));
        let trigger = Arc::new(RePlanTrigger::new());
        let this = Arc::new(Self {
            root_set: root_set.clone(),
            erasure_code,
            decryption_key,
            chunk_index,
            holders: Arc::clone(&holders),
            trigger: Arc::clone(&trigger),
            proof_verifier,
            config,
            clock,
        });
        discovery::spawn_discovery(eligible, Arc::new(root_set.roots), holders, trigger);
        this
    }

    pub fn state(&self) -> ChunkState {
        self.holders.state()
    }

    /// Serves one sub-range of this chunk. May be called repeatedly and
    /// concurrently; each call drives its own scheduler instance.
    pub async fn download(
        self: &Arc<Self>,
        offset_in_chunk: u64,
        length: u64,
        price_per_ms: f64,
        cancel: &CancelContext,
    ) -> Result<Vec<u8>, ChunkError> {
        metrics::DOWNLOADS_STARTED.inc();
        let result = self.download_inner(offset_in_chunk, length, price_per_ms, cancel).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(ChunkError::DownloadTimedOut) => "timed_out",
            Err(ChunkError::Cancelled) => "cancelled",
            Err(ChunkError::Skylink(SkylinkError::RootNotFound)) => "root_not_found",
            Err(_) => "error",
        };
        metrics::DOWNLOAD_OUTCOMES.with_label_values(&[outcome]).inc();
        result
    }

    async fn download_inner(
        self: &Arc<Self>,
        offset_in_chunk: u64,
        length: u64,
        price_per_ms: f64,
        cancel: &CancelContext,
    ) -> Result<Vec<u8>, ChunkError> {
        let data_pieces = self.erasure_code.data_pieces();
        let num_pieces = self.erasure_code.num_pieces();
        let deadline = self.clock.now() + self.config.download_deadline;

        let mut planner = Planner::new(self.config.scheduler.clone(), data_pieces);
        let mut pieces: Vec<Option<Vec<u8>>> = vec![None; num_pieces];
        let mut launched: HashMap<usize, Arc<Worker>> = HashMap::new();
        let (result_tx, mut result_rx) = mpsc::channel::<ReadOutcome>(num_pieces.max(1));

        loop {
            if self.holders.state() == ChunkState::Failed {
                return Err(ChunkError::Skylink(SkylinkError::RootNotFound));
            }
            if pieces.iter().filter(|p| p.is_some()).count() >= data_pieces {
                break;
            }

            self.sync_planner(&mut planner, &launched);
            if let Some(plan) = planner.plan(&self.clock, price_per_ms) {
                self.launch_new_workers(&plan.workers, &mut launched, &mut planner, &result_tx);
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(ChunkError::Cancelled),
                _ = self.clock.sleep(deadline.saturating_duration_since(self.clock.now())) => {
                    return Err(ChunkError::DownloadTimedOut);
                }
                _ = self.trigger.wait(&self.clock, self.config.scheduler.max_wait_unresolved_worker_update) => {}
                received = result_rx.recv() => {
                    if let Some((piece_index, outcome)) = received {
                        self.handle_read_outcome(piece_index, outcome, &mut pieces, &mut launched, &mut planner);
                        self.trigger.notify();
                    }
                }
            }
        }

        let decoded = self.erasure_code.decode(pieces)?;
        let start = offset_in_chunk as usize;
        let end = start.saturating_add(length as usize);
        let mut out = decoded.get(start..end).ok_or(SkylinkError::RangeOutOfFile)?.to_vec();
        if let Some(key) = &self.decryption_key {
            cipher::apply_keystream(key, self.chunk_index, offset_in_chunk, &mut out);
        }
        Ok(out)
    }

    fn sync_planner(&self, planner: &mut Planner, launched: &HashMap<usize, Arc<Worker>>) {
        let resolved = self.holders.resolved_map();
        for idx in 0..self.root_set.num_pieces() {
            match resolved.get(&idx) {
                Some(host) => {
                    let mut latency =
                        LatencyDistribution::empty(self.config.scheduler.bucket_width, self.config.scheduler.num_buckets);
                    latency.add_sample(host.read_sector_average_latency());
                    planner.set_resolved(
                        idx,
                        IndividualWorker {
                            id: WorkerId(host.host_key()),
                            piece_index: idx,
                            latency,
                            cost_per_read: host.read_sector_cost_estimate(SECTOR_SIZE).unwrap_or(0),
                            launched: launched.contains_key(&idx),
                        },
                    );
                }
                None => planner.remove_resolved(idx),
            }
        }

        let num_pieces = self.erasure_code.num_pieces();
        let unresolved: Vec<UnresolvedWorker> = self
            .holders
            .pending_workers()
            .into_iter()
            .map(|host| {
                let avg_latency = host.read_sector_average_latency();
                let mut latency =
                    LatencyDistribution::empty(self.config.scheduler.bucket_width, self.config.scheduler.num_buckets);
                latency.add_sample(avg_latency);
                UnresolvedWorker {
                    id: WorkerId(host.host_key()),
                    resolve_chance: host.availability_rate(num_pieces).clamp(1e-6, 1.0),
                    latency,
                    cost_per_read: host.read_sector_cost_estimate(SECTOR_SIZE).unwrap_or(0),
                    expected_resolve: avg_latency,
                }
            })
            .collect();
        planner.set_unresolved(unresolved);
    }

    fn launch_new_workers(
        &self,
        chosen: &[DownloadWorker],
        launched: &mut HashMap<usize, Arc<Worker>>,
        planner: &mut Planner,
        result_tx: &mpsc::Sender<ReadOutcome>,
    ) {
        for worker in chosen {
            if !worker.is_launchable() {
                continue;
            }
            let Some(piece_index) = worker.piece_index() else { continue };
            if launched.contains_key(&piece_index) {
                continue;
            }
            let Some(host) = self.holders.resolved_map().remove(&piece_index) else { continue };
            let Some(root) = self.root_set.root_for_piece(piece_index) else { continue };
            planner.mark_launched(piece_index);
            launched.insert(piece_index, Arc::clone(&host));
            let tx = result_tx.clone();
            tokio::spawn(async move {
                let result = host.read_sector(root, 0, SECTOR_SIZE).await;
                let _ = tx.send((piece_index, result)).await;
            });
        }
    }

    fn handle_read_outcome(
        &self,
        piece_index: usize,
        outcome: Result<(Vec<u8>, Vec<u8>), skylink_worker::WorkerError>,
        pieces: &mut [Option<Vec<u8>>],
        launched: &mut HashMap<usize, Arc<Worker>>,
        planner: &mut Planner,
    ) {
        let Some(host) = launched.get(&piece_index).cloned() else { return };
        let root = self.root_set.root_for_piece(piece_index);
        match outcome {
            Ok((data, proof)) => {
                let verified = root.is_some_and(|r| self.proof_verifier.verify(&r, 0, SECTOR_SIZE, &data, &proof));
                if verified {
                    let elapsed = host.read_sector_average_latency();
                    planner.record_latency(piece_index, elapsed);
                    pieces[piece_index] = Some(data);
                } else {
                    self.drop_holder(piece_index, &host, launched, planner);
                }
            }
            Err(_) => self.drop_holder(piece_index, &host, launched, planner),
        }
    }

    fn drop_holder(&self, piece_index: usize, host: &Arc<Worker>, launched: &mut HashMap<usize, Arc<Worker>>, planner: &mut Planner) {
        metrics::PIECES_DROPPED.inc();
        self.holders.remove_holder(piece_index, host.host_key());
        launched.remove(&piece_index);
        planner.remove_resolved(piece_index);
    }
}
