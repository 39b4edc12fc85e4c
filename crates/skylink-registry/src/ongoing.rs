//! Process-wide set of entry identities with a reconciliation currently in
//! flight, so two reads that both discover the same lagging host don't
//! both spawn an `UpdateRegistry` against it.

use std::collections::HashSet;

use parking_lot::Mutex;
use skylink_primitives::Hash;

#[derive(Default)]
pub struct OngoingUpdates(Mutex<HashSet<Hash>>);

impl OngoingUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if this identity was not already being reconciled,
    /// and marks it as in flight.
    pub fn try_begin(&self, identity: Hash) -> bool {
        self.0.lock().insert(identity)
    }

    pub fn finish(&self, identity: Hash) {
        self.0.lock().remove(&identity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_begin_is_suppressed_until_finish() {
        let ongoing = OngoingUpdates::new();
        let identity = Hash::of(b"entry");
        assert!(ongoing.try_begin(identity));
        assert!(!ongoing.try_begin(identity));
        ongoing.finish(identity);
        assert!(ongoing.try_begin(identity));
    }
}
