//! Per-host worker: owns one connection, one ephemeral account, and a set
//! of priority-ordered job queues, and exposes typed RPCs the layers above
//! build downloads and registry operations out of.

pub mod account;
pub mod config;
pub mod connection;
pub mod cooldown;
pub mod error;
pub mod gouging;
pub mod host_db;
pub mod job;
pub mod metrics;
pub mod price_table;
pub mod queue;
pub mod registry_wire;
pub mod worker;

pub use account::EphemeralAccount;
pub use config::WorkerConfig;
pub use connection::{FundAccountResponse, HostConnection, Instruction, PaymentFrame, ProgramRequest, ProgramResponse};
pub use error::{GougingCategory, WorkerError};
pub use gouging::GougingAllowance;
pub use host_db::{HostDb, HostDbEntry};
pub use job::{JobKind, JobRequest, JobResponse, PriorityClass, UpdateRegistryOutcome};
pub use price_table::PriceTable;
pub use worker::Worker;
