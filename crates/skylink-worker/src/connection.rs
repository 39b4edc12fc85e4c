//! The wire-level seam to a single host. The actual duplexed connection,
//! its authenticated cipher, and the byte-level framing are treated as
//! black boxes; `HostConnection` is the interface the worker drives, named
//! after the RPCs it exposes: `ExecuteProgram`/`FundAccount`/
//! `UpdatePriceTable`.

use async_trait::async_trait;
use skylink_primitives::{Hash, RegistryEntry};

use crate::error::WorkerError;
use crate::price_table::PriceTable;

#[derive(Clone, Debug)]
pub enum Instruction {
    HasSector { root: Hash },
    ReadSector { root: Hash, offset: u64, length: u64, merkle_proof: bool },
    ReadRegistry { public_key: [u8; 32], tweak: [u8; 32] },
    UpdateRegistry { entry: RegistryEntry },
}

#[derive(Clone, Debug)]
pub struct PaymentFrame {
    pub account_id: [u8; 32],
    pub amount: u64,
    pub blockheight: u64,
}

#[derive(Clone, Debug)]
pub struct ProgramRequest {
    pub contract_id: [u8; 32],
    pub price_table_uid: [u8; 16],
    pub payment: PaymentFrame,
    pub instructions: Vec<Instruction>,
    pub program_data: Vec<u8>,
}

/// One header per instruction, each followed by `output` raw bytes, per
/// the `ExecuteProgram` response shape.
#[derive(Clone, Debug)]
pub struct ProgramResponse {
    pub new_size: u64,
    pub new_merkle_root: Hash,
    pub output: Vec<u8>,
    pub proof: Vec<u8>,
    pub error: Option<String>,
    pub total_cost: u64,
    pub failure_refund: u64,
}

#[derive(Clone, Debug)]
pub struct FundAccountResponse {
    pub balance: u64,
}

/// Everything a `Worker` needs from the connection to one host. A real
/// implementation opens one stream, writes the RPC specifier, price-table
/// uid, and payment frame, then reads back responses; test doubles
/// implement this trait directly against in-memory state.
#[async_trait]
pub trait HostConnection: Send + Sync {
    async fn execute_program(&self, req: ProgramRequest) -> Result<Vec<ProgramResponse>, WorkerError>;
    async fn fund_account(&self, account_id: [u8; 32], amount: u64) -> Result<FundAccountResponse, WorkerError>;
    async fn fetch_price_table(&self) -> Result<PriceTable, WorkerError>;
}
