//! Chunk-level errors. Decode/layout failures pass through the shared
//! taxonomy unchanged; everything added here is specific to driving a
//! download against a live worker pool.

use skylink_primitives::erasure::ErasureError;
use skylink_primitives::SkylinkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error(transparent)]
    Skylink(#[from] SkylinkError),

    #[error(transparent)]
    Erasure(#[from] ErasureError),

    #[error("download deadline elapsed before data_pieces reads completed")]
    DownloadTimedOut,

    #[error("download context was cancelled")]
    Cancelled,
}
