//! Registry read/update workflows layered on top of per-host workers:
//! fan-out across eligible hosts, best-entry selection, background
//! reconciliation of lagging hosts, and detection of hosts that
//! contradict a revision they previously acknowledged.

pub mod cache;
pub mod config;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod ongoing;
pub mod read;
pub mod update;

pub use cache::WorkerRevisionCache;
pub use config::RegistryConfig;
pub use error::RegistryError;
pub use memory::{MemoryAdmission, MemoryManager};
pub use ongoing::OngoingUpdates;
pub use read::read_registry;
pub use update::update_registry;
