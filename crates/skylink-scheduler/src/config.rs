//! Tunable constants for the candidate-set search and its re-planning
//! cadence.

use serde::{Deserialize, Serialize};
use skylink_async::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Largest number of extra (beyond `data_pieces`) workers the search
    /// will consider launching at once.
    pub max_overdrive: usize,
    /// Width of one latency-distribution bucket.
    #[serde(with = "duration_millis")]
    pub bucket_width: Duration,
    /// Number of buckets a distribution tracks before falling off the end.
    pub num_buckets: usize,
    /// Re-enters the search on this tick even with no other trigger.
    #[serde(with = "duration_millis")]
    pub max_wait_unresolved_worker_update: Duration,
    /// Minimum spacing between full rebuilds of the chimera/individual
    /// pool, since a rebuild recomputes every cached chance-after curve.
    #[serde(with = "duration_millis")]
    pub max_wait_rebuild_download_workers: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_overdrive: 4,
            bucket_width: Duration::from_millis(20),
            num_buckets: 64,
            max_wait_unresolved_worker_update: Duration::from_millis(25),
            max_wait_rebuild_download_workers: Duration::from_millis(25),
        }
    }
}

impl SchedulerConfig {
    pub fn test() -> Self {
        Self {
            max_overdrive: 2,
            bucket_width: Duration::from_millis(5),
            num_buckets: 32,
            max_wait_unresolved_worker_update: Duration::from_millis(5),
            max_wait_rebuild_download_workers: Duration::from_millis(5),
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use skylink_async::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}
