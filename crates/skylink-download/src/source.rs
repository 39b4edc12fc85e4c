//! The Skylink entry point: fetches and decrypts a base sector, parses its
//! layout/fanout/metadata, and serves positional byte-range reads by
//! fanning a request out across per-chunk worker sets.

use std::sync::Arc;

use anyhow::Context as _;
use skylink_async::{CancelContext, Clock};
use skylink_chunks::{cipher, ChunkConfig, ChunkWorkerSet, SectorProofVerifier};
use skylink_primitives::erasure::{ErasureCode, PassthroughCode, ReedSolomonCode};
use skylink_primitives::layout::LAYOUT_SIZE;
use skylink_primitives::{fanout, ChunkRootSet, Layout, Skylink, SkylinkError, SECTOR_SIZE};
use skylink_worker::Worker;
use tokio::sync::mpsc;

use crate::config::DownloadConfig;
use crate::error::DownloadError;
use crate::keyring::KeyRing;
use crate::metrics;

/// Reserved chunk index for decrypting the base sector's own tail (the
/// bytes following the fixed layout header). Never collides with a real
/// fanout chunk index, which starts at 0.
const BASE_SECTOR_CHUNK_INDEX: u64 = u64::MAX;

pub enum RangeResponse {
    Success(Vec<u8>),
    /// Carries both the classified error (via `downcast_ref::<DownloadError>`)
    /// and the human-readable chain of context accumulated while serving the
    /// request, so a caller can match on the former and log the latter.
    Error(anyhow::Error),
}

pub struct SkylinkSource {
    skylink: Skylink,
    layout: Layout,
    metadata: serde_json::Value,
    inline_payload: Option<Vec<u8>>,
    chunks: Vec<Arc<ChunkWorkerSet>>,
    config: DownloadConfig,
    cancel: CancelContext,
}

impl SkylinkSource {
    /// Fetches and decrypts the base sector, parses layout/fanout/metadata,
    /// and eagerly constructs one chunk worker set per fanout chunk so
    /// has-sector discovery overlaps with the caller's first read.
    pub async fn open(
        skylink: Skylink,
        price_per_ms: f64,
        workers: Vec<Arc<Worker>>,
        key_ring: Arc<dyn KeyRing>,
        proof_verifier: Arc<dyn SectorProofVerifier>,
        clock: Clock,
        config: DownloadConfig,
        cancel: CancelContext,
    ) -> Result<Arc<Self>, DownloadError> {
        metrics::OPENS_STARTED.inc();
        let result =
            Self::open_inner(skylink, price_per_ms, workers, key_ring, proof_verifier, clock, config, cancel).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(DownloadError::Skylink(SkylinkError::DecryptUnavailable)) => "decrypt_unavailable",
            Err(DownloadError::Skylink(SkylinkError::RootNotFound)) => "root_not_found",
            Err(_) => "error",
        };
        metrics::OPEN_OUTCOMES.with_label_values(&[outcome]).inc();
        result
    }

    async fn open_inner(
        skylink: Skylink,
        price_per_ms: f64,
        workers: Vec<Arc<Worker>>,
        key_ring: Arc<dyn KeyRing>,
        proof_verifier: Arc<dyn SectorProofVerifier>,
        clock: Clock,
        config: DownloadConfig,
        cancel: CancelContext,
    ) -> Result<Arc<Self>, DownloadError> {
        let discovery_root_set = ChunkRootSet::new(vec![skylink.root()]);
        let base_set = ChunkWorkerSet::new(
            discovery_root_set,
            Arc::new(PassthroughCode),
            None,
            0,
            workers.clone(),
            Arc::clone(&proof_verifier),
            clock.clone(),
            config.chunk.clone(),
        );
        let base_bytes = base_set.download(skylink.offset(), skylink.fetch_size(), price_per_ms, &cancel).await?;

        let layout = Layout::decode(&base_bytes)?;
        let mut rest = base_bytes[LAYOUT_SIZE..].to_vec();

        let decryption_key = if layout.is_plaintext() {
            None
        } else {
            let key = key_ring.derive_file_key(skylink.root(), &layout.key_data).ok_or(SkylinkError::DecryptUnavailable)?;
            cipher::apply_keystream(&key, BASE_SECTOR_CHUNK_INDEX, 0, &mut rest);
            Some(key)
        };

        let fanout_start = 0usize;
        let fanout_end = fanout_start + layout.fanout_size as usize;
        let metadata_start = fanout_end;
        let metadata_end = metadata_start + layout.metadata_size as usize;
        let fanout_bytes = rest
            .get(fanout_start..fanout_end)
            .ok_or(SkylinkError::BaseSectorTooShort { need: fanout_end, got: rest.len() })?;
        let metadata_bytes = rest
            .get(metadata_start..metadata_end)
            .ok_or(SkylinkError::BaseSectorTooShort { need: metadata_end, got: rest.len() })?;

        let fanout_chunks = fanout::decode_fanout(fanout_bytes, layout.data_pieces, layout.parity_pieces, layout.is_plaintext())?;
        let metadata: serde_json::Value = serde_json::from_slice(metadata_bytes)?;

        let inline_payload = if fanout_chunks.is_empty() {
            let start = metadata_end;
            let end = start + layout.filesize as usize;
            let payload = rest
                .get(start..end)
                .ok_or(SkylinkError::BaseSectorTooShort { need: end, got: rest.len() })?
                .to_vec();
            Some(payload)
        } else {
            None
        };

        let erasure_code: Arc<dyn ErasureCode> = if layout.data_pieces == 1 {
            Arc::new(PassthroughCode)
        } else {
            Arc::new(ReedSolomonCode::new(layout.data_pieces as usize, layout.parity_pieces as usize)?)
        };

        let chunks: Vec<Arc<ChunkWorkerSet>> = fanout_chunks
            .into_iter()
            .enumerate()
            .map(|(i, root_set)| {
                ChunkWorkerSet::new(
                    root_set,
                    Arc::clone(&erasure_code),
                    decryption_key,
                    i as u64,
                    workers.clone(),
                    Arc::clone(&proof_verifier),
                    clock.clone(),
                    config.chunk.clone(),
                )
            })
            .collect();

        Ok(Arc::new(Self { skylink, layout, metadata, inline_payload, chunks, config, cancel }))
    }

    pub fn metadata(&self) -> &serde_json::Value {
        &self.metadata
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn skylink(&self) -> Skylink {
        self.skylink
    }

    pub fn size(&self) -> u64 {
        self.layout.filesize
    }

    pub fn request_size(&self) -> u64 {
        self.config.request_size
    }

    /// Cancels this source's internal context. In-flight chunk downloads
    /// stop issuing new jobs within one scheduler tick; already-launched
    /// jobs may still complete and their payments still commit.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Reads `[offset, offset + length)` of the logical file. Splits the
    /// request into per-chunk sub-downloads launched in parallel, without
    /// waiting for earlier chunks before scheduling later ones; results are
    /// stitched into ascending offset order before the single terminal
    /// response is sent. Fails fast on the first per-chunk error.
    pub fn read_stream(self: &Arc<Self>, offset: u64, length: u64, price_per_ms: f64) -> mpsc::Receiver<RangeResponse> {
        let (tx, rx) = mpsc::channel(1);
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let result = this.read_stream_inner(offset, length, price_per_ms).await;
            let outcome = match &result {
                Ok(_) => "success",
                Err(err) => match err.downcast_ref::<DownloadError>() {
                    Some(DownloadError::Skylink(SkylinkError::RangeOutOfFile)) => "range_out_of_file",
                    Some(DownloadError::Cancelled) => "cancelled",
                    _ => "error",
                },
            };
            metrics::READ_STREAM_OUTCOMES.with_label_values(&[outcome]).inc();
            let response = match result {
                Ok(data) => RangeResponse::Success(data),
                Err(err) => RangeResponse::Error(err),
            };
            let _ = tx.send(response).await;
        });
        rx
    }

    async fn read_stream_inner(&self, offset: u64, length: u64, price_per_ms: f64) -> anyhow::Result<Vec<u8>> {
        if offset.checked_add(length).map(|end| end > self.layout.filesize).unwrap_or(true) {
            return Err(DownloadError::from(SkylinkError::RangeOutOfFile))
                .with_context(|| format!("range [{offset}, {offset}+{length}) against file size {}", self.layout.filesize));
        }

        if let Some(inline) = &self.inline_payload {
            let start = offset as usize;
            let end = start + length as usize;
            let bytes = inline
                .get(start..end)
                .ok_or(DownloadError::from(SkylinkError::RangeOutOfFile))
                .context("serving inline payload")?;
            return Ok(bytes.to_vec());
        }

        let chunk_size = self.layout.data_pieces as u64 * SECTOR_SIZE;
        let end = offset + length;
        let mut tasks = Vec::new();
        let mut pos = offset;
        while pos < end {
            let chunk_index = (pos / chunk_size) as usize;
            let chunk_start = chunk_index as u64 * chunk_size;
            let offset_in_chunk = pos - chunk_start;
            let remaining_in_chunk = chunk_size - offset_in_chunk;
            let take = remaining_in_chunk.min(end - pos);
            let chunk = self
                .chunks
                .get(chunk_index)
                .cloned()
                .ok_or(DownloadError::from(SkylinkError::RangeOutOfFile))
                .with_context(|| format!("resolving chunk {chunk_index} for offset {pos}"))?;
            let cancel = self.cancel.child();
            let rel_offset = pos - offset;
            tasks.push((
                chunk_index,
                rel_offset,
                tokio::spawn(async move { chunk.download(offset_in_chunk, take, price_per_ms, &cancel).await }),
            ));
            pos += take;
        }

        let mut out = vec![0u8; length as usize];
        for (chunk_index, rel_offset, task) in tasks {
            let bytes = task
                .await
                .map_err(|_| DownloadError::Cancelled)
                .and_then(|result| result.map_err(DownloadError::from))
                .with_context(|| format!("downloading chunk {chunk_index} at relative offset {rel_offset}"))?;
            let start = rel_offset as usize;
            out[start..start + bytes.len()].copy_from_slice(&bytes);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyring::NullKeyRing;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use skylink_chunks::AlwaysValid;
    use skylink_primitives::layout::CIPHER_TYPE_PLAINTEXT;
    use skylink_primitives::Hash;
    use skylink_worker::{
        FundAccountResponse, GougingAllowance, HostConnection, HostDb, HostDbEntry, Instruction, PriceTable, ProgramRequest,
        ProgramResponse, WorkerConfig, WorkerError,
    };
    use std::time::Duration as StdDuration;

    struct StaticHostDb;
    impl HostDb for StaticHostDb {
        fn lookup(&self, _host_key: &[u8; 32]) -> Option<HostDbEntry> {
            Some(HostDbEntry { block_height: 1, host_version: 1, contract_utility: true })
        }
    }

    struct FakeHost {
        root: Hash,
        payload: Vec<u8>,
    }

    #[async_trait]
    impl HostConnection for FakeHost {
        async fn execute_program(&self, req: ProgramRequest) -> Result<Vec<ProgramResponse>, WorkerError> {
            let instr = &req.instructions[0];
            let output = match instr {
                Instruction::HasSector { root } => vec![(*root == self.root) as u8],
                Instruction::ReadSector { .. } => self.payload.clone(),
                _ => Vec::new(),
            };
            Ok(vec![ProgramResponse {
                new_size: 0,
                new_merkle_root: Hash::zero(),
                output,
                proof: Vec::new(),
                error: None,
                total_cost: 0,
                failure_refund: 0,
            }])
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
                update_price_table_cost: 0,
                renew_contract_cost: 1,
                txn_fee_min: 1,
                expires_at: Clock::real().now() + StdDuration::from_secs(3600).into(),
            })
        }
    }

    async fn ready_worker(id: u8, root: Hash, payload: Vec<u8>) -> Arc<Worker> {
        let w = Arc::new(Worker::new(
            [id; 32],
            [9u8; 32],
            Arc::new(FakeHost { root, payload }),
            Arc::new(StaticHostDb),
            Clock::real(),
            WorkerConfig::test(),
            GougingAllowance::default(),
            CancelContext::root(),
        ));
        tokio::spawn(Arc::clone(&w).run());
        w.update_price_table().await.unwrap();
        w
    }

    fn base_sector_bytes(fanout_bytes: &[u8], metadata_bytes: &[u8], inline_payload: &[u8], data_pieces: u8) -> Vec<u8> {
        let layout = Layout {
            version: Layout::SUPPORTED_VERSION,
            filesize: inline_payload.len() as u64,
            metadata_size: metadata_bytes.len() as u64,
            fanout_size: fanout_bytes.len() as u64,
            data_pieces,
            parity_pieces: 10,
            cipher_type: CIPHER_TYPE_PLAINTEXT,
            key_data: [0u8; 64],
        };
        let mut out = layout.encode().to_vec();
        out.extend_from_slice(fanout_bytes);
        out.extend_from_slice(metadata_bytes);
        out.extend_from_slice(inline_payload);
        out.resize(4096, 0);
        out
    }

    #[tokio::test]
    async fn small_inline_file_reads_back_exactly() {
        let metadata = br#"{"filename":"hello.txt"}"#;
        let payload = b"hello, this is a small inline skyfile payload!";
        let base_bytes = base_sector_bytes(&[], metadata, payload, 1);
        let root = Hash::of(&base_bytes);
        let skylink = Skylink::new(root, 0, 4096).unwrap();
        let worker = ready_worker(1, root, base_bytes).await;

        let source = SkylinkSource::open(
            skylink,
            1.0,
            vec![worker],
            Arc::new(NullKeyRing),
            Arc::new(AlwaysValid),
            Clock::real(),
            DownloadConfig::test(),
            CancelContext::root(),
        )
        .await
        .unwrap();

        assert_eq!(source.size(), payload.len() as u64);
        assert_eq!(source.metadata()["filename"], "hello.txt");

        let mut rx = source.read_stream(0, payload.len() as u64, 1.0);
        match rx.recv().await.unwrap() {
            RangeResponse::Success(data) => assert_eq!(data, payload),
            RangeResponse::Error(err) => panic!("unexpected error: {err}"),
        }
    }

    #[tokio::test]
    async fn rejects_a_range_past_the_end_of_the_file() {
        let metadata = b"{}";
        let payload = b"short";
        let base_bytes = base_sector_bytes(&[], metadata, payload, 1);
        let root = Hash::of(&base_bytes);
        let skylink = Skylink::new(root, 0, 4096).unwrap();
        let worker = ready_worker(1, root, base_bytes).await;

        let source = SkylinkSource::open(
            skylink,
            1.0,
            vec![worker],
            Arc::new(NullKeyRing),
            Arc::new(AlwaysValid),
            Clock::real(),
            DownloadConfig::test(),
            CancelContext::root(),
        )
        .await
        .unwrap();

        let mut rx = source.read_stream(0, 1000, 1.0);
        match rx.recv().await.unwrap() {
            RangeResponse::Error(err) => {
                assert_matches!(err.downcast_ref::<DownloadError>(), Some(DownloadError::Skylink(SkylinkError::RangeOutOfFile)));
                assert!(err.chain().count() > 1, "expected a human-readable context chain, got: {err:?}");
            }
            RangeResponse::Success(_) => panic!("expected RangeOutOfFile"),
        }
    }

    #[tokio::test]
    async fn reads_spanning_a_chunk_boundary_stitch_in_order() {
        let chunk_a = vec![0xAAu8; SECTOR_SIZE as usize];
        let chunk_b = vec![0xBBu8; SECTOR_SIZE as usize];
        let root_a = Hash::of(b"chunk-a");
        let root_b = Hash::of(b"chunk-b");
        let mut fanout_bytes = Vec::new();
        fanout_bytes.extend_from_slice(root_a.as_bytes());
        fanout_bytes.extend_from_slice(root_b.as_bytes());

        let metadata = b"{}";
        let filesize = 2 * SECTOR_SIZE;
        let layout = Layout {
            version: Layout::SUPPORTED_VERSION,
            filesize,
            metadata_size: metadata.len() as u64,
            fanout_size: fanout_bytes.len() as u64,
            data_pieces: 1,
            parity_pieces: 10,
            cipher_type: CIPHER_TYPE_PLAINTEXT,
            key_data: [0u8; 64],
        };
        let mut base_bytes = layout.encode().to_vec();
        base_bytes.extend_from_slice(&fanout_bytes);
        base_bytes.extend_from_slice(metadata);
        base_bytes.resize(4096, 0);

        let base_root = Hash::of(&base_bytes);
        let skylink = Skylink::new(base_root, 0, 4096).unwrap();
        let base_worker = ready_worker(1, base_root, base_bytes).await;
        let worker_a = ready_worker(2, root_a, chunk_a.clone()).await;
        let worker_b = ready_worker(3, root_b, chunk_b.clone()).await;

        let source = SkylinkSource::open(
            skylink,
            1.0,
            vec![base_worker, worker_a, worker_b],
            Arc::new(NullKeyRing),
            Arc::new(AlwaysValid),
            Clock::real(),
            DownloadConfig::test(),
            CancelContext::root(),
        )
        .await
        .unwrap();

        let offset = SECTOR_SIZE - 50;
        let mut rx = source.read_stream(offset, 100, 1.0);
        match rx.recv().await.unwrap() {
            RangeResponse::Success(data) => {
                assert_eq!(&data[..50], &chunk_a[(SECTOR_SIZE as usize - 50)..]);
                assert_eq!(&data[50..], &chunk_b[..50]);
            }
            RangeResponse::Error(err) => panic!("unexpected error: {err}"),
        }
    }
}
