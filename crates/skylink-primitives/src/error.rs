//! The crate-wide error taxonomy. Downstream crates wrap these with
//! `#[error(transparent)]`/`#[from]` rather than re-stringifying them, so a
//! caller at the `skylink-download` facade can still match on the
//! originating variant.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SkylinkError {
    #[error("invalid skylink: {0}")]
    InvalidSkylink(String),

    #[error("requested range is outside the file")]
    RangeOutOfFile,

    #[error("base sector too short: need at least {need} bytes, got {got}")]
    BaseSectorTooShort { need: usize, got: usize },

    #[error("unsupported layout version {0}")]
    UnsupportedVersion(u8),

    #[error("base sector is encrypted and no matching key is in the key ring")]
    DecryptUnavailable,

    #[error("fanout byte length {fanout_len} does not divide evenly by the per-chunk root-set size {root_set_len}")]
    ErasureMismatch { fanout_len: usize, root_set_len: usize },

    #[error("fewer than data_pieces hosts hold the required pieces for this chunk")]
    RootNotFound,
}
