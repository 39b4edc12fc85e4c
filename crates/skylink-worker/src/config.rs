//! Worker-tunable constants. `test()` gives the shorter intervals used by
//! this workspace's test profile.

use serde::{Deserialize, Serialize};
use skylink_async::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(with = "duration_millis")]
    pub cache_refresh_interval: Duration,
    pub account_funded_threshold: u64,
    pub account_refill_threshold: u64,
    pub account_refill_amount: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            cache_refresh_interval: Duration::from_secs(60),
            account_funded_threshold: 1_000,
            account_refill_threshold: 5_000,
            account_refill_amount: 50_000,
        }
    }
}

impl WorkerConfig {
    pub fn test() -> Self {
        Self { cache_refresh_interval: Duration::from_secs(1), ..Self::default() }
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
