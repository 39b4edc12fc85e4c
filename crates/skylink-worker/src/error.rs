//! Worker-level error taxonomy.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkerError {
    #[error("queue is on cooldown")]
    QueueOnCooldown,

    #[error("worker has been torn down")]
    Killed,

    #[error("instruction cost exceeds remaining program budget")]
    InsufficientBudget,

    #[error("price table is no longer valid")]
    PriceTableInvalid,

    #[error("price table has expired")]
    PriceTableExpired,

    #[error("gouging: {0}")]
    Gouging(GougingCategory),

    #[error("host returned a malformed or signature-invalid message: {0}")]
    HostFault(String),

    #[error("host unreachable")]
    Unreachable,

    #[error("{0}")]
    Cancelled(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GougingCategory {
    RenewContractCost,
    TxnFeeMin,
    HostBlockheight,
    UpdatePriceTableCost,
}

impl std::fmt::Display for GougingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GougingCategory::RenewContractCost => "renew_contract_cost",
            GougingCategory::TxnFeeMin => "txn_fee_min",
            GougingCategory::HostBlockheight => "host_blockheight",
            GougingCategory::UpdatePriceTableCost => "update_price_table_cost",
        };
        write!(f, "{s}")
    }
}
