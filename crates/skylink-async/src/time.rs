//! A `Clock` that the rest of the engine reads time through instead of
//! calling `Instant::now()`/`tokio::time::sleep` directly.
//!
//! Every retry, cooldown, and scheduler-tick constant in this workspace is
//! expressed as a `Duration` measured against a `Clock`, not against wall
//! time, so tests can drive the worker cooldown policy and the scheduler's
//! rebuild cadence deterministically with `Clock::fake` instead of sleeping
//! in real time.

use parking_lot::Mutex;
use std::sync::Arc;
pub use tokio::time::{Duration, Instant};

#[derive(Clone)]
pub struct Clock(Inner);

#[derive(Clone)]
enum Inner {
    Real,
    Fake(Arc<Mutex<Instant>>),
}

impl Clock {
    pub fn real() -> Self {
        Self(Inner::Real)
    }

    /// A clock that only advances when `advance` is called. Useful for
    /// exercising cooldown backoff and scheduler rebuild timers without
    /// actually waiting.
    pub fn fake() -> Self {
        Self(Inner::Fake(Arc::new(Mutex::new(Instant::now()))))
    }

    pub fn now(&self) -> Instant {
        match &self.0 {
            Inner::Real => Instant::now(),
            Inner::Fake(cell) => *cell.lock(),
        }
    }

    /// Advances a fake clock. Panics on a real clock: real time cannot be
    /// pushed forward on demand, and a caller reaching for this on a real
    /// clock almost certainly meant to build a test with `Clock::fake`.
    pub fn advance(&self, by: Duration) {
        match &self.0 {
            Inner::Real => panic!("Clock::advance called on a real clock"),
            Inner::Fake(cell) => {
                let mut guard = cell.lock();
                *guard += by;
            }
        }
    }

    /// Sleeps for `dur` on a real clock. On a fake clock this resolves
    /// immediately: tests that need to observe sleep-gated behavior drive
    /// time forward explicitly with `advance` and re-poll rather than
    /// blocking the test thread.
    pub async fn sleep(&self, dur: Duration) {
        match &self.0 {
            Inner::Real => tokio::time::sleep(dur).await,
            Inner::Fake(_) => tokio::task::yield_now().await,
        }
    }

    pub fn is_fake(&self) -> bool {
        matches!(self.0, Inner::Fake(_))
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::real()
    }
}
