//! Tunable constants for one chunk worker set: the candidate-set search
//! cadence it delegates to, plus how long a single `download` call waits
//! before giving up.

use serde::{Deserialize, Serialize};
use skylink_async::time::Duration;
use skylink_scheduler::SchedulerConfig;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkConfig {
    pub scheduler: SchedulerConfig,
    /// Deadline for a single `download` call, independent of the caller's
    /// own cancellation context.
    #[serde(with = "duration_millis")]
    pub download_deadline: Duration,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self { scheduler: SchedulerConfig::default(), download_deadline: Duration::from_secs(300) }
    }
}

impl ChunkConfig {
    pub fn test() -> Self {
        Self { scheduler: SchedulerConfig::test(), download_deadline: Duration::from_secs(10) }
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
