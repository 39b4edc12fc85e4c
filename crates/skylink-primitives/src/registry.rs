//! Registry entries: signed, revisioned key/value tuples.
//!
//! Signature verification is a black box behind the [`Verifier`] trait;
//! everything about revision ordering and the proof-of-work tiebreak is
//! implemented concretely since that is part of the scheduling/consistency
//! logic this crate owns.

use crate::hash::Hash;
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryType {
    /// No proof-of-work component; the tiebreak always yields zero work.
    Standard,
    /// The entry's hash carries a proof-of-work component: a monotone
    /// function over the entry's hash is used as a tiebreak.
    WithPow,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryEntry {
    pub public_key: [u8; 32],
    pub tweak: [u8; 32],
    pub revision: u64,
    pub data: Vec<u8>,
    pub signature: [u8; 64],
    pub entry_type: EntryType,
}

pub trait Verifier: Send + Sync {
    fn verify(&self, public_key: &[u8; 32], message: &[u8], signature: &[u8; 64]) -> bool;
}

impl RegistryEntry {
    /// `hash(public_key ‖ tweak)` — the key this entry is stored under.
    pub fn identity(&self) -> Hash {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&self.public_key);
        buf.extend_from_slice(&self.tweak);
        Hash::of(&buf)
    }

    fn signed_message(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32 + 8 + self.data.len());
        buf.extend_from_slice(&self.tweak);
        buf.extend_from_slice(&self.revision.to_le_bytes());
        buf.extend_from_slice(&self.data);
        buf
    }

    pub fn verify(&self, verifier: &dyn Verifier) -> bool {
        verifier.verify(&self.public_key, &self.signed_message(), &self.signature)
    }

    /// "Has more proof-of-work": a monotone function of the entry's hash,
    /// read in little-endian byte order (the choice of byte order is an
    /// explicit decision; see DESIGN.md). `Standard` entries carry no
    /// proof-of-work component and always compare as zero work.
    pub fn work(&self) -> u128 {
        match self.entry_type {
            EntryType::Standard => 0,
            EntryType::WithPow => {
                let h = Hash::of(&self.signed_message());
                let bytes = h.as_bytes();
                let mut value: u128 = 0;
                for (i, byte) in bytes.iter().take(16).enumerate() {
                    value |= (*byte as u128) << (8 * i);
                }
                // Smaller hash value means more leading-zero work in the
                // canonical PoW sense; invert so "more work" sorts higher.
                u128::MAX - value
            }
        }
    }

    /// Ordering between two entries at the same identity: `(revision,
    /// tiebreak)`.
    pub fn cmp_same_identity(&self, other: &Self) -> Ordering {
        self.revision.cmp(&other.revision).then_with(|| self.work().cmp(&other.work()))
    }
}

/// "Best" comparison across two possibly-absent responses from different
/// hosts: present beats absent, then higher revision, then more work,
/// otherwise equal.
pub fn is_better(candidate: Option<&RegistryEntry>, incumbent: Option<&RegistryEntry>) -> bool {
    match (candidate, incumbent) {
        (Some(_), None) => true,
        (None, _) => false,
        (Some(c), Some(i)) => c.cmp_same_identity(i) == Ordering::Greater,
    }
}
