//! A "track a mutation before attempting it, commit it once the outcome of
//! the attempt is known" counter, shared by the ephemeral account's
//! withdrawals/deposits and by memory-admission quotas.
//!
//! A withdrawal (or a quota acquisition) is tracked first so concurrent
//! callers see its effect on the available balance immediately, then
//! committed with a success flag once the RPC (or allocation) either lands
//! or fails. A failed commit undoes the tracked amount without ever having
//! touched the confirmed balance.

use parking_lot::Mutex;

#[derive(Debug, Default, Clone, Copy)]
struct State {
    confirmed: i64,
    pending_in: i64,
    pending_out: i64,
}

#[derive(Debug)]
pub struct TrackedBalance(Mutex<State>);

impl TrackedBalance {
    pub fn new(initial: u64) -> Self {
        Self(Mutex::new(State { confirmed: initial as i64, pending_in: 0, pending_out: 0 }))
    }

    /// Lower-bound balance available right now: confirmed plus whatever is
    /// in flight as a deposit, minus whatever is in flight as a withdrawal.
    pub fn available(&self) -> i64 {
        let s = self.0.lock();
        s.confirmed + s.pending_in - s.pending_out
    }

    pub fn confirmed(&self) -> u64 {
        self.0.lock().confirmed.max(0) as u64
    }

    pub fn track_withdrawal(&self, amount: u64) {
        self.0.lock().pending_out += amount as i64;
    }

    pub fn commit_withdrawal(&self, amount: u64, success: bool) {
        let mut s = self.0.lock();
        s.pending_out -= amount as i64;
        if success {
            s.confirmed -= amount as i64;
        }
    }

    pub fn track_deposit(&self, amount: u64) {
        self.0.lock().pending_in += amount as i64;
    }

    pub fn commit_deposit(&self, amount: u64, success: bool) {
        let mut s = self.0.lock();
        s.pending_in -= amount as i64;
        if success {
            s.confirmed += amount as i64;
        }
    }

    /// Atomically checks whether the available balance has dropped below
    /// `threshold` and, if so, tracks a deposit of `refill_amount` and
    /// returns `true`. Two concurrent callers racing on the same threshold
    /// can only ever have one of them win, which is what makes refills
    /// idempotent under concurrency.
    pub fn try_track_refill(&self, threshold: u64, refill_amount: u64) -> bool {
        let mut s = self.0.lock();
        if s.confirmed + s.pending_in - s.pending_out < threshold as i64 {
            s.pending_in += refill_amount as i64;
            true
        } else {
            false
        }
    }

    /// Atomically checks whether the available balance covers `amount`
    /// and, if so, tracks the withdrawal and returns `true`. Lets an
    /// admission-style caller (a byte quota, not a money balance) reject
    /// an over-capacity request without the balance ever going negative.
    pub fn try_track_withdrawal(&self, amount: u64) -> bool {
        let mut s = self.0.lock();
        if s.confirmed + s.pending_in - s.pending_out >= amount as i64 {
            s.pending_out += amount as i64;
            true
        } else {
            false
        }
    }
}
