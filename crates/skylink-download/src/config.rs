//! Tunables for the Skylink entry point: the natural read quantum advised
//! to callers, plus the chunk-level configuration every chunk worker set
//! this source constructs shares.

use serde::{Deserialize, Serialize};
use skylink_chunks::ChunkConfig;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Advisory read quantum returned by `request_size()`. Does not bound
    /// what `read_stream` will actually serve; a caller may ask for more or
    /// less in one call.
    pub request_size: u64,
    pub chunk: ChunkConfig,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self { request_size: 1 << 20, chunk: ChunkConfig::default() }
    }
}

impl DownloadConfig {
    pub fn test() -> Self {
        Self { request_size: 512, chunk: ChunkConfig::test() }
    }
}
