//! Seam onto the renter's host database, the collaborator the worker
//! polls to refresh its cached block height, host version, and contract
//! utility. Contract formation and renewal live outside this crate;
//! `HostDb` only exposes the read side the worker needs.

pub struct HostDbEntry {
    pub block_height: u64,
    pub host_version: u32,
    pub contract_utility: bool,
}

impl HostDbEntry {
    /// Host-reported probability this host still holds a given piece,
    /// for an erasure code with `num_pieces` total pieces.
    pub fn availability_rate(&self, _num_pieces: usize) -> f64 {
        if self.contract_utility {
            0.98
        } else {
            0.0
        }
    }
}

pub trait HostDb: Send + Sync {
    /// `None` means the host has dropped out of the host database
    /// entirely (e.g. its contract disappeared); the worker exits
    /// cooperatively when it observes this.
    fn lookup(&self, host_key: &[u8; 32]) -> Option<HostDbEntry>;
}
