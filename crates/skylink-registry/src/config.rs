//! Tunable constants for registry reads and updates.

use serde::{Deserialize, Serialize};
use skylink_async::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(with = "duration_millis")]
    pub use_highest_rev_default_timeout: Duration,
    pub min_update_registry_successes: usize,
    pub memory_quota_bytes: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            use_highest_rev_default_timeout: Duration::from_millis(100),
            min_update_registry_successes: 3,
            memory_quota_bytes: 20 * 1024,
        }
    }
}

impl RegistryConfig {
    pub fn test() -> Self {
        Self {
            use_highest_rev_default_timeout: Duration::from_millis(20),
            min_update_registry_successes: 1,
            memory_quota_bytes: 20 * 1024,
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
