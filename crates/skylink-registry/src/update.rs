//! Registry update: verify locally, fan out `UpdateRegistry` across
//! eligible workers, and classify the responses that come back.

use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use skylink_primitives::registry::Verifier;
use skylink_primitives::RegistryEntry;
use skylink_worker::{UpdateRegistryOutcome, Worker, WorkerError};

use crate::cache::WorkerRevisionCache;
use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::memory::MemoryManager;
use crate::metrics;

/// Writes `entry` to every eligible worker in `workers`, requiring at
/// least `RegistryConfig::min_update_registry_successes` acceptances.
/// A worker that reports a revision lower than one it previously
/// acknowledged is flagged as cheating and penalized immediately.
pub async fn update_registry(
    workers: &[Arc<Worker>],
    entry: RegistryEntry,
    verifier: &dyn Verifier,
    config: &RegistryConfig,
    memory: &MemoryManager,
    revision_cache: &WorkerRevisionCache,
) -> Result<(), RegistryError> {
    metrics::UPDATES_ISSUED.inc();
    let _admission = memory.admit()?;

    if !entry.verify(verifier) {
        metrics::UPDATE_OUTCOMES.with_label_values(&["invalid_signature"]).inc();
        return Err(RegistryError::InvalidSignature);
    }

    let eligible: Vec<Arc<Worker>> = workers.iter().filter(|w| w.is_priced_and_funded()).cloned().collect();
    if eligible.is_empty() {
        metrics::UPDATE_OUTCOMES.with_label_values(&["insufficient_redundancy"]).inc();
        return Err(RegistryError::InsufficientRedundancy);
    }

    let identity = entry.identity();
    let mut tasks: FuturesUnordered<_> = eligible
        .iter()
        .map(|worker| {
            let worker = Arc::clone(worker);
            let entry = entry.clone();
            tokio::spawn(async move {
                let result = worker.update_registry(entry).await;
                (worker, result)
            })
        })
        .collect();

    let mut successes = 0usize;
    let mut last_invalid: Option<RegistryError> = None;
    while let Some(task) = tasks.next().await {
        let (worker, result): (Arc<Worker>, Result<UpdateRegistryOutcome, WorkerError>) = match task {
            Ok(pair) => pair,
            Err(_) => continue,
        };
        match result {
            Ok(UpdateRegistryOutcome::Accepted) => {
                successes += 1;
                revision_cache.remember(worker.host_key(), identity, entry.revision);
                if successes >= config.min_update_registry_successes {
                    break;
                }
            }
            Ok(UpdateRegistryOutcome::LowerRevNum(proof)) => {
                if let Some(err) = check_proof(&worker, &proof, identity, verifier, revision_cache) {
                    return Err(err);
                }
                last_invalid = Some(RegistryError::LowerRevNum(proof));
            }
            Ok(UpdateRegistryOutcome::SameRevNum(proof)) => {
                if let Some(err) = check_proof(&worker, &proof, identity, verifier, revision_cache) {
                    return Err(err);
                }
                last_invalid = Some(RegistryError::SameRevNum(proof));
            }
            Err(_) => {}
        }
    }
    // Remaining tasks, if any, keep running to completion in the background;
    // dropping `tasks` here only detaches our handles to them.

    if successes >= config.min_update_registry_successes {
        metrics::UPDATE_OUTCOMES.with_label_values(&["accepted"]).inc();
        Ok(())
    } else if successes > 0 {
        metrics::UPDATE_OUTCOMES.with_label_values(&["insufficient_redundancy"]).inc();
        Err(RegistryError::InsufficientRedundancy)
    } else {
        metrics::UPDATE_OUTCOMES.with_label_values(&["no_successful_updates"]).inc();
        Err(last_invalid.unwrap_or(RegistryError::NoSuccessfulUpdates))
    }
}

/// Validates a rejection proof and checks it against this host's last
/// acknowledged revision. Returns `Some(err)` when the update must abort
/// immediately: either the proof itself doesn't check out, or the host
/// is caught contradicting a revision it previously accepted.
fn check_proof(
    worker: &Arc<Worker>,
    proof: &RegistryEntry,
    identity: skylink_primitives::Hash,
    verifier: &dyn Verifier,
    revision_cache: &WorkerRevisionCache,
) -> Option<RegistryError> {
    if proof.identity() != identity || !proof.verify(verifier) {
        return Some(RegistryError::HostOutdatedProof);
    }
    if let Some(known) = revision_cache.get(worker.host_key(), identity) {
        if known > proof.revision {
            metrics::HOST_CHEATING_DETECTED.inc();
            worker.record_registry_cheating();
            return Some(RegistryError::HostCheating);
        }
    }
    revision_cache.remember(worker.host_key(), identity, proof.revision);
    None
}
