//! The three events that should cause a download to re-enter the
//! candidate search: a periodic tick, a worker-state change, or a
//! read-job result arriving. Bundled as one `Notify` plus a fixed tick
//! so a chunk worker set's download loop can `select!` on a single
//! future instead of juggling three.

use skylink_async::time::{Clock, Duration};
use tokio::sync::Notify;

#[derive(Default)]
pub struct RePlanTrigger(Notify);

impl RePlanTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wakes any waiter immediately; called on worker-state changes and
    /// read-job results.
    pub fn notify(&self) {
        self.0.notify_one();
    }

    /// Resolves on the next explicit `notify()` or after `tick` elapses,
    /// whichever comes first.
    pub async fn wait(&self, clock: &Clock, tick: Duration) {
        tokio::select! {
            _ = self.0.notified() => {}
            _ = clock.sleep(tick) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notify_wakes_before_the_tick_fires() {
        let trigger = RePlanTrigger::new();
        let clock = Clock::real();
        tokio::join!(
            async {
                trigger.notify();
            },
            trigger.wait(&clock, Duration::from_secs(30)),
        );
    }

    #[tokio::test]
    async fn falls_back_to_the_tick_when_never_notified() {
        let trigger = RePlanTrigger::new();
        let clock = Clock::real();
        trigger.wait(&clock, Duration::from_millis(1)).await;
    }
}
