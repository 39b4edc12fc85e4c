//! Process-wide memory admission for registry operations: a fixed byte
//! quota per read or update, drawn from a shared capacity and released
//! when the operation completes.

use skylink_async::TrackedBalance;

use crate::error::RegistryError;

#[derive(Debug)]
pub struct MemoryManager {
    balance: TrackedBalance,
    quota_per_request: u64,
}

impl MemoryManager {
    pub fn new(capacity_bytes: u64, quota_per_request: u64) -> Self {
        Self { balance: TrackedBalance::new(capacity_bytes), quota_per_request }
    }

    /// Admits one operation's worth of quota. The returned guard releases
    /// the quota back to the pool when dropped.
    pub fn admit(&self) -> Result<MemoryAdmission<'_>, RegistryError> {
        if !self.balance.try_track_withdrawal(self.quota_per_request) {
            return Err(RegistryError::ShuttingDown);
        }
        self.balance.commit_withdrawal(self.quota_per_request, true);
        Ok(MemoryAdmission { manager: self, amount: self.quota_per_request })
    }

    pub fn available(&self) -> i64 {
        self.balance.available()
    }
}

#[derive(Debug)]
pub struct MemoryAdmission<'a> {
    manager: &'a MemoryManager,
    amount: u64,
}

impl Drop for MemoryAdmission<'_> {
    fn drop(&mut self) {
        self.manager.balance.track_deposit(self.amount);
        self.manager.balance.commit_deposit(self.amount, true);
    }
}
