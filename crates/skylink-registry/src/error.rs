//! Registry-level error taxonomy. Invalid-revision variants carry the
//! host's proof so a caller one layer up can use its revision to choose
//! the next write, instead of seeing a stringly-typed failure.

use skylink_primitives::RegistryEntry;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry entry signature does not verify")]
    InvalidSignature,

    #[error("no worker reported this entry")]
    EntryNotFound,

    #[error("registry lookup timed out")]
    LookupTimeout,

    #[error("no worker accepted the update")]
    NoSuccessfulUpdates,

    #[error("fewer than the required number of workers accepted the update")]
    InsufficientRedundancy,

    #[error("host reported a lower revision than the one being written")]
    LowerRevNum(RegistryEntry),

    #[error("host reported the same revision as the one being written")]
    SameRevNum(RegistryEntry),

    #[error("host's revision proof did not match the entry being updated or failed to verify")]
    HostOutdatedProof,

    #[error("host contradicted a revision it previously acknowledged")]
    HostCheating,

    #[error("memory admission quota exhausted")]
    ShuttingDown,

    #[error("operation was cancelled")]
    Cancelled,
}
