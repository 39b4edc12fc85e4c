//! Gouging checks: before trusting a freshly fetched price table, verify
//! each price against a ceiling computed from the renter's allowance.

use crate::error::{GougingCategory, WorkerError};
use crate::price_table::PriceTable;

#[derive(Clone, Debug)]
pub struct GougingAllowance {
    pub default_base_rpc_price: u64,
    pub local_estimated_txn_fee: u64,
    pub txn_fee_multiple_ceiling: u64,
    pub local_blockheight: u64,
    pub blockheight_tolerance: u64,
}

impl Default for GougingAllowance {
    fn default() -> Self {
        Self {
            default_base_rpc_price: 1_000,
            local_estimated_txn_fee: 100,
            txn_fee_multiple_ceiling: 5,
            local_blockheight: 0,
            blockheight_tolerance: 10,
        }
    }
}

/// Checks a price table against the allowance, returning the first
/// violated category. A host that fails this check is not good for
/// download until its next price-table refresh.
pub fn check(table: &PriceTable, allowance: &GougingAllowance) -> Result<(), WorkerError> {
    if table.renew_contract_cost > allowance.default_base_rpc_price {
        return Err(WorkerError::Gouging(GougingCategory::RenewContractCost));
    }
    if table.txn_fee_min
        > allowance.local_estimated_txn_fee.saturating_mul(allowance.txn_fee_multiple_ceiling)
    {
        return Err(WorkerError::Gouging(GougingCategory::TxnFeeMin));
    }
    let delta = table.host_blockheight.abs_diff(allowance.local_blockheight);
    if delta > allowance.blockheight_tolerance {
        return Err(WorkerError::Gouging(GougingCategory::HostBlockheight));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use skylink_async::time::Clock;

    fn table(renew: u64, txn_fee_min: u64, blockheight: u64) -> PriceTable {
        PriceTable {
            uid: [0; 16],
            host_blockheight: blockheight,
            has_sector_base_cost: 1,
            read_sector_base_cost: 1,
            read_sector_cost_per_byte: 1,
            read_registry_cost: 1,
            update_registry_cost: 1,
            fund_account_cost: 1,
            update_price_table_cost: 1,
            renew_contract_cost: renew,
            txn_fee_min,
            expires_at: Clock::real().now(),
        }
    }

    #[test]
    fn passes_within_allowance() {
        let allowance = GougingAllowance { local_blockheight: 100, ..Default::default() };
        assert!(check(&table(500, 400, 105), &allowance).is_ok());
    }

    #[test]
    fn flags_excessive_renew_contract_cost() {
        let allowance = GougingAllowance::default();
        let err = check(&table(999_999, 1, 0), &allowance).unwrap_err();
        assert_eq!(err, WorkerError::Gouging(GougingCategory::RenewContractCost));
    }

    #[test]
    fn flags_excessive_txn_fee_min() {
        let allowance = GougingAllowance::default();
        let err = check(&table(1, 999_999, 0), &allowance).unwrap_err();
        assert_eq!(err, WorkerError::Gouging(GougingCategory::TxnFeeMin));
    }

    #[test]
    fn flags_blockheight_out_of_tolerance() {
        let allowance = GougingAllowance { local_blockheight: 1000, ..Default::default() };
        let err = check(&table(1, 1, 0), &allowance).unwrap_err();
        assert_eq!(err, WorkerError::Gouging(GougingCategory::HostBlockheight));
    }
}
