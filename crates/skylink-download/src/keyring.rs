//! The file-key derivation seam a caller plugs into: turning the base
//! sector's 64-byte `key_data` into the symmetric key actually used to
//! decrypt the rest of the sector and every fanout chunk. Like the hash and
//! cipher primitives elsewhere in this workspace, derivation itself is a
//! black box here.

use skylink_primitives::Hash;

pub trait KeyRing: Send + Sync {
    /// Derives the file-specific decryption key for the base sector rooted
    /// at `root` whose layout header carries `key_data`, or `None` if this
    /// caller holds no key matching it.
    fn derive_file_key(&self, root: Hash, key_data: &[u8; 64]) -> Option<[u8; 64]>;
}

/// A key ring that recognizes nothing: every encrypted skylink opened
/// against it fails with `DecryptUnavailable`.
pub struct NullKeyRing;

impl KeyRing for NullKeyRing {
    fn derive_file_key(&self, _root: Hash, _key_data: &[u8; 64]) -> Option<[u8; 64]> {
        None
    }
}
