//! Errors surfaced at the Skylink entry point. Per-chunk and shared-taxonomy
//! errors pass through unchanged; everything added here is specific to
//! assembling a source from a base sector.

use skylink_chunks::ChunkError;
use skylink_primitives::erasure::ErasureError;
use skylink_primitives::SkylinkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Skylink(#[from] SkylinkError),

    #[error(transparent)]
    Chunk(#[from] ChunkError),

    #[error(transparent)]
    Erasure(#[from] ErasureError),

    #[error("metadata is not valid JSON: {0}")]
    InvalidMetadata(String),

    #[error("download context was cancelled")]
    Cancelled,
}

impl From<serde_json::Error> for DownloadError {
    fn from(err: serde_json::Error) -> Self {
        DownloadError::InvalidMetadata(err.to_string())
    }
}
