//! One FIFO per job kind, gated by cooldown, tracking an exponentially
//! weighted average job duration.

use std::collections::VecDeque;

use parking_lot::Mutex;
use skylink_async::time::{Duration, Instant};
use tokio::sync::oneshot;

use crate::cooldown::Cooldown;
use crate::error::WorkerError;
use crate::job::{JobRequest, JobResponse};

/// EWMA decay factor for job duration: 90% weight on history.
const JOB_TIME_DECAY: f64 = 0.9;

pub struct QueuedJob {
    pub request: JobRequest,
    pub responder: oneshot::Sender<Result<JobResponse, WorkerError>>,
}

struct State {
    jobs: VecDeque<QueuedJob>,
    cooldown: Cooldown,
    killed: bool,
    avg_job_time: Duration,
}

pub struct JobQueue(Mutex<State>);

impl JobQueue {
    pub fn new() -> Self {
        Self(Mutex::new(State {
            jobs: VecDeque::new(),
            cooldown: Cooldown::default(),
            killed: false,
            avg_job_time: Duration::ZERO,
        }))
    }

    /// Rejects the add (returns `false`) if the queue is killed or on
    /// cooldown; never silently drops an accepted job.
    pub fn add(&self, job: QueuedJob, now: Instant) -> bool {
        let mut s = self.0.lock();
        if s.killed || s.cooldown.is_on_cooldown(now) {
            return false;
        }
        s.jobs.push_back(job);
        true
    }

    pub fn pop_front(&self) -> Option<QueuedJob> {
        self.0.lock().jobs.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().jobs.is_empty()
    }

    pub fn record_outcome(&self, now: Instant, duration: Duration, success: bool) {
        let mut s = self.0.lock();
        if success {
            s.cooldown.record_success();
        } else {
            s.cooldown.record_failure(now);
        }
        let prev = s.avg_job_time.as_secs_f64();
        let sample = duration.as_secs_f64();
        let next = prev * JOB_TIME_DECAY + sample * (1.0 - JOB_TIME_DECAY);
        s.avg_job_time = Duration::from_secs_f64(next.max(0.0));
    }

    pub fn average_job_time(&self) -> Duration {
        self.0.lock().avg_job_time
    }

    pub fn is_on_cooldown(&self, now: Instant) -> bool {
        self.0.lock().cooldown.is_on_cooldown(now)
    }

    pub fn kill(&self) {
        self.0.lock().killed = true;
    }

    pub fn is_killed(&self) -> bool {
        self.0.lock().killed
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skylink_async::time::Clock;

    fn job() -> (QueuedJob, oneshot::Receiver<Result<JobResponse, WorkerError>>) {
        let (tx, rx) = oneshot::channel();
        (QueuedJob { request: JobRequest::UpdatePriceTable, responder: tx }, rx)
    }

    #[test]
    fn add_rejected_once_killed() {
        let clock = Clock::fake();
        let q = JobQueue::new();
        q.kill();
        let (j, _rx) = job();
        assert!(!q.add(j, clock.now()));
    }

    #[test]
    fn add_rejected_during_cooldown() {
        let clock = Clock::fake();
        let q = JobQueue::new();
        q.record_outcome(clock.now(), Duration::from_millis(1), false);
        let (j, _rx) = job();
        assert!(!q.add(j, clock.now()));
    }

    #[test]
    fn add_accepted_once_cooldown_clears() {
        let clock = Clock::fake();
        let q = JobQueue::new();
        q.record_outcome(clock.now(), Duration::from_millis(1), false);
        clock.advance(Duration::from_secs(120));
        let (j, _rx) = job();
        assert!(q.add(j, clock.now()));
    }

    #[test]
    fn average_job_time_decays_toward_samples() {
        let clock = Clock::fake();
        let q = JobQueue::new();
        for _ in 0..50 {
            q.record_outcome(clock.now(), Duration::from_millis(100), true);
        }
        let avg = q.average_job_time();
        assert!((avg.as_millis() as i64 - 100).abs() < 5);
    }
}
