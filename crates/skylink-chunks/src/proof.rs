//! The Merkle range-proof seam: a `read_sector` response is only trusted
//! once its proof verifies against the piece's known root. Treated as a
//! black box behind a trait, the same way registry signatures are in
//! `skylink-registry`.

use skylink_primitives::Hash;

pub trait SectorProofVerifier: Send + Sync {
    fn verify(&self, root: &Hash, offset: u64, length: u64, data: &[u8], proof: &[u8]) -> bool;
}

/// Accepts anything; useful for tests and for erasure codes that were
/// fetched without `merkle_proof` (the passthrough single-root discovery
/// fetch has no separate proof to check beyond the root match itself).
pub struct AlwaysValid;

impl SectorProofVerifier for AlwaysValid {
    fn verify(&self, _root: &Hash, _offset: u64, _length: u64, _data: &[u8], _proof: &[u8]) -> bool {
        true
    }
}
