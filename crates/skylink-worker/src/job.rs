//! Job primitives a `Worker` executes: one kind per public RPC method,
//! each with its own FIFO queue and priority class.

use skylink_primitives::{Hash, RegistryEntry};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobKind {
    HasSector,
    ReadSector,
    ReadRegistry,
    UpdateRegistry,
    FundAccount,
    UpdatePriceTable,
}

/// Maintenance jobs (price-table refresh, account refill) run first, read
/// jobs next. Background-priority work (repair, bubble health) is not
/// modeled by this worker, so only two classes are populated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PriorityClass {
    Maintenance,
    Read,
}

impl JobKind {
    pub fn priority_class(self) -> PriorityClass {
        match self {
            JobKind::UpdatePriceTable | JobKind::FundAccount => PriorityClass::Maintenance,
            JobKind::HasSector | JobKind::ReadSector | JobKind::ReadRegistry | JobKind::UpdateRegistry => {
                PriorityClass::Read
            }
        }
    }

    /// Fixed dispatch order within a priority class, used to pick which
    /// non-empty queue the worker loop services next when several are
    /// ready in the same class.
    pub fn all_in_class(class: PriorityClass) -> &'static [JobKind] {
        match class {
            PriorityClass::Maintenance => &[JobKind::UpdatePriceTable, JobKind::FundAccount],
            PriorityClass::Read => {
                &[JobKind::HasSector, JobKind::ReadSector, JobKind::ReadRegistry, JobKind::UpdateRegistry]
            }
        }
    }
}

pub const PRIORITY_ORDER: [PriorityClass; 2] = [PriorityClass::Maintenance, PriorityClass::Read];

#[derive(Clone, Debug)]
pub enum JobRequest {
    HasSector { roots: Vec<Hash> },
    ReadSector { root: Hash, offset: u64, length: u64, merkle_proof: bool },
    ReadRegistry { public_key: [u8; 32], tweak: [u8; 32] },
    UpdateRegistry { entry: RegistryEntry },
    FundAccount { amount: u64 },
    UpdatePriceTable,
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::HasSector { .. } => JobKind::HasSector,
            JobRequest::ReadSector { .. } => JobKind::ReadSector,
            JobRequest::ReadRegistry { .. } => JobKind::ReadRegistry,
            JobRequest::UpdateRegistry { .. } => JobKind::UpdateRegistry,
            JobRequest::FundAccount { .. } => JobKind::FundAccount,
            JobRequest::UpdatePriceTable => JobKind::UpdatePriceTable,
        }
    }
}

#[derive(Clone, Debug)]
pub enum UpdateRegistryOutcome {
    Accepted,
    LowerRevNum(RegistryEntry),
    SameRevNum(RegistryEntry),
}

#[derive(Clone, Debug)]
pub enum JobResponse {
    HasSector(Vec<bool>),
    ReadSector { data: Vec<u8>, proof: Vec<u8> },
    ReadRegistry(Option<RegistryEntry>),
    UpdateRegistry(UpdateRegistryOutcome),
    FundAccount(u64),
    UpdatePriceTable,
}
