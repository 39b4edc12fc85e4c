//! Scheduler-level error taxonomy.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("download was cancelled before enough pieces arrived")]
    DownloadTimedOut,

    #[error("fewer than data_pieces workers are available to cover this chunk")]
    RootNotFound,
}
