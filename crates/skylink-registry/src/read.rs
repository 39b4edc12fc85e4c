//! Registry read: fan out `ReadRegistry` across eligible workers, track
//! the best-revision response, and schedule lagging hosts for
//! reconciliation once the winner is known.

use std::sync::Arc;

use skylink_async::{CancelContext, Clock};
use skylink_primitives::registry::is_better;
use skylink_primitives::RegistryEntry;
use skylink_worker::Worker;
use tokio::sync::mpsc;

use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::memory::MemoryManager;
use crate::metrics;
use crate::ongoing::OngoingUpdates;

type Response = (Arc<Worker>, Option<RegistryEntry>);

/// Reads a registry entry across `workers`, returning the best answer any
/// of them produced. Spawns a detached reconciliation task against any
/// host that reported a lower revision or no entry at all.
pub async fn read_registry(
    workers: &[Arc<Worker>],
    public_key: [u8; 32],
    tweak: [u8; 32],
    config: &RegistryConfig,
    memory: &MemoryManager,
    ongoing: Arc<OngoingUpdates>,
    clock: &Clock,
    cancel: &CancelContext,
) -> Result<RegistryEntry, RegistryError> {
    metrics::READS_ISSUED.inc();
    let _admission = memory.admit()?;

    let eligible: Vec<Arc<Worker>> = workers.iter().filter(|w| w.is_priced_and_funded()).cloned().collect();
    if eligible.is_empty() {
        metrics::READ_OUTCOMES.with_label_values(&["entry_not_found"]).inc();
        return Err(RegistryError::EntryNotFound);
    }

    let (tx, mut rx) = mpsc::channel::<Response>(eligible.len());
    for worker in &eligible {
        let worker = Arc::clone(worker);
        let tx = tx.clone();
        tokio::spawn(async move {
            let entry = worker.read_registry(public_key, tweak).await.unwrap_or(None);
            let _ = tx.send((worker, entry)).await;
        });
    }
    drop(tx);

    let mut best: Option<RegistryEntry> = None;
    let mut seen: Vec<Response> = Vec::with_capacity(eligible.len());
    let mut deadline = None;

    loop {
        let timer = async {
            match deadline {
                Some(d) => clock.sleep(d - clock.now()).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            _ = cancel.cancelled() => {
                metrics::READ_OUTCOMES.with_label_values(&["lookup_timeout"]).inc();
                return Err(RegistryError::LookupTimeout);
            }
            _ = timer, if deadline.is_some() && best.is_some() => break,
            received = rx.recv() => {
                match received {
                    Some((worker, entry)) => {
                        if deadline.is_none() {
                            deadline = Some(clock.now() + config.use_highest_rev_default_timeout);
                        }
                        if is_better(entry.as_ref(), best.as_ref()) {
                            best = entry.clone();
                        }
                        seen.push((worker, entry));
                        if seen.len() == eligible.len() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    match best.clone() {
        Some(entry) => {
            schedule_reconciliation(seen, entry.clone(), ongoing);
            metrics::READ_OUTCOMES.with_label_values(&["found"]).inc();
            Ok(entry)
        }
        None => {
            metrics::READ_OUTCOMES.with_label_values(&["entry_not_found"]).inc();
            Err(RegistryError::EntryNotFound)
        }
    }
}

fn schedule_reconciliation(seen: Vec<Response>, best: RegistryEntry, ongoing: Arc<OngoingUpdates>) {
    let identity = best.identity();
    let lagging: Vec<Arc<Worker>> = seen
        .into_iter()
        .filter(|(_, entry)| match entry {
            None => true,
            Some(e) => e.revision < best.revision,
        })
        .map(|(worker, _)| worker)
        .collect();
    if lagging.is_empty() {
        return;
    }
    if !ongoing.try_begin(identity) {
        return;
    }
    metrics::RECONCILIATIONS_SPAWNED.inc();
    tokio::spawn(async move {
        for worker in &lagging {
            let _ = worker.update_registry(best.clone()).await;
        }
        ongoing.finish(identity);
    });
}
