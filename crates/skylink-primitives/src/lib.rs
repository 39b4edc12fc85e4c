//! Data model for the download engine: skylinks, the base-sector layout
//! header, the fanout table, chunk root sets, the erasure-code seam, and
//! the registry entry type. Everything here is pure and synchronous; the
//! worker, chunk, scheduler, and registry crates build the async machinery
//! on top of these types.

pub mod chunk;
pub mod erasure;
pub mod error;
pub mod fanout;
pub mod hash;
pub mod layout;
pub mod registry;
pub mod skylink;

pub use chunk::ChunkRootSet;
pub use error::SkylinkError;
pub use hash::Hash;
pub use layout::Layout;
pub use registry::RegistryEntry;
pub use skylink::Skylink;

/// Size in bytes of the sector every skylink's root addresses.
pub const SECTOR_SIZE: u64 = 1 << 22;

/// Smallest fetch-size granularity a skylink's offset/length window may
/// express: a positive power-of-two multiple of 4 KiB.
pub const FETCH_SIZE_GRANULARITY: u64 = 4096;
