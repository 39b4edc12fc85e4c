//! The has-sector discovery fan-out a chunk worker set runs once at
//! construction: one `HasSector` job per eligible worker, recorded into
//! the shared [`HolderTable`] as replies arrive.

use std::sync::Arc;

use skylink_primitives::Hash;
use skylink_scheduler::RePlanTrigger;
use skylink_worker::Worker;

use crate::holders::HolderTable;

pub fn spawn_discovery(
    workers: Vec<Arc<Worker>>,
    roots: Arc<Vec<Hash>>,
    holders: Arc<HolderTable>,
    trigger: Arc<RePlanTrigger>,
) {
    for worker in workers {
        let roots = Arc::clone(&roots);
        let holders = Arc::clone(&holders);
        let trigger = Arc::clone(&trigger);
        tokio::spawn(async move {
            match worker.has_sector((*roots).clone()).await {
                Ok(bitmap) => holders.record_reply(&worker, &bitmap),
                Err(_) => holders.record_timeout(&worker),
            }
            trigger.notify();
        });
    }
}
