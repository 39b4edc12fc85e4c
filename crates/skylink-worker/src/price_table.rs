//! A host's per-RPC price schedule.

use skylink_async::time::Instant;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceTable {
    pub uid: [u8; 16],
    pub host_blockheight: u64,
    pub has_sector_base_cost: u64,
    pub read_sector_base_cost: u64,
    pub read_sector_cost_per_byte: u64,
    pub read_registry_cost: u64,
    pub update_registry_cost: u64,
    pub fund_account_cost: u64,
    pub update_price_table_cost: u64,
    pub renew_contract_cost: u64,
    pub txn_fee_min: u64,
    pub expires_at: Instant,
}

impl PriceTable {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    pub fn read_sector_cost(&self, length: u64) -> u64 {
        self.read_sector_base_cost + self.read_sector_cost_per_byte * length
    }
}
