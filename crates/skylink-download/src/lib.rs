//! The Skylink entry point: opening a skylink into a positional byte-range
//! source, built on top of per-chunk worker sets and the worker pool below
//! them.

pub mod config;
pub mod error;
pub mod keyring;
pub mod metrics;
pub mod source;

pub use config::DownloadConfig;
pub use error::DownloadError;
pub use keyring::{KeyRing, NullKeyRing};
pub use source::{RangeResponse, SkylinkSource};
