//! Per-worker cache of the most recently written revision for each entry
//! identity, used to catch a host that reports a stale revision after
//! having already acknowledged a higher one.

use std::collections::HashMap;

use parking_lot::Mutex;
use skylink_primitives::Hash;

#[derive(Default)]
pub struct WorkerRevisionCache(Mutex<HashMap<[u8; 32], HashMap<Hash, u64>>>);

impl WorkerRevisionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&self, host_key: [u8; 32], identity: Hash, revision: u64) {
        let mut table = self.0.lock();
        let entries = table.entry(host_key).or_default();
        entries
            .entry(identity)
            .and_modify(|existing| *existing = (*existing).max(revision))
            .or_insert(revision);
    }

    pub fn get(&self, host_key: [u8; 32], identity: Hash) -> Option<u64> {
        self.0.lock().get(&host_key).and_then(|entries| entries.get(&identity)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remembers_and_only_moves_forward() {
        let cache = WorkerRevisionCache::new();
        let identity = Hash::of(b"entry");
        cache.remember([1u8; 32], identity, 5);
        assert_eq!(cache.get([1u8; 32], identity), Some(5));
        cache.remember([1u8; 32], identity, 3);
        assert_eq!(cache.get([1u8; 32], identity), Some(5));
        cache.remember([1u8; 32], identity, 7);
        assert_eq!(cache.get([1u8; 32], identity), Some(7));
    }

    #[test]
    fn unknown_host_or_identity_is_none() {
        let cache = WorkerRevisionCache::new();
        assert_eq!(cache.get([9u8; 32], Hash::of(b"x")), None);
    }
}
