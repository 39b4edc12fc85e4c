//! Per-queue cooldown policy: consecutive failures back off exponentially;
//! the queue refuses new adds while on cooldown.

use skylink_async::time::{Duration, Instant};

const BASE_COOLDOWN: Duration = Duration::from_millis(500);
const MAX_COOLDOWN: Duration = Duration::from_secs(60);
const BACKOFF_RATIO: u32 = 2;

#[derive(Debug, Clone, Copy)]
pub struct Cooldown {
    consecutive_failures: u32,
    until: Option<Instant>,
}

impl Default for Cooldown {
    fn default() -> Self {
        Self { consecutive_failures: 0, until: None }
    }
}

impl Cooldown {
    pub fn is_on_cooldown(&self, now: Instant) -> bool {
        self.until.map(|until| now < until).unwrap_or(false)
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.until = None;
    }

    pub fn record_failure(&mut self, now: Instant) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let backoff = BASE_COOLDOWN
            .checked_mul(BACKOFF_RATIO.saturating_pow(self.consecutive_failures.saturating_sub(1)))
            .unwrap_or(MAX_COOLDOWN)
            .min(MAX_COOLDOWN);
        self.until = Some(now + backoff);
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}
