//! The skylink itself: a 32-byte sector Merkle root plus an offset/length
//! window into that sector.

use crate::error::SkylinkError;
use crate::hash::Hash;
use crate::{FETCH_SIZE_GRANULARITY, SECTOR_SIZE};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

const RAW_LEN: usize = 32 + 8 + 8;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Skylink {
    root: Hash,
    offset: u64,
    fetch_size: u64,
}

impl Skylink {
    /// Builds a skylink, enforcing the fetch-size alignment invariant: a
    /// positive power-of-two multiple of 4 KiB, no larger than one sector,
    /// fitting inside the sector alongside `offset`.
    pub fn new(root: Hash, offset: u64, fetch_size: u64) -> Result<Self, SkylinkError> {
        if fetch_size == 0
            || !fetch_size.is_power_of_two()
            || fetch_size < FETCH_SIZE_GRANULARITY
            || fetch_size > SECTOR_SIZE
        {
            return Err(SkylinkError::InvalidSkylink(format!(
                "fetch_size {fetch_size} must be a power-of-two multiple of {FETCH_SIZE_GRANULARITY} up to {SECTOR_SIZE}"
            )));
        }
        if offset.checked_add(fetch_size).map(|end| end > SECTOR_SIZE).unwrap_or(true) {
            return Err(SkylinkError::InvalidSkylink(format!(
                "offset {offset} + fetch_size {fetch_size} exceeds sector size {SECTOR_SIZE}"
            )));
        }
        Ok(Self { root, offset, fetch_size })
    }

    pub fn root(&self) -> Hash {
        self.root
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn fetch_size(&self) -> u64 {
        self.fetch_size
    }

    pub fn encode(&self) -> String {
        let mut raw = [0u8; RAW_LEN];
        raw[0..32].copy_from_slice(self.root.as_bytes());
        raw[32..40].copy_from_slice(&self.offset.to_le_bytes());
        raw[40..48].copy_from_slice(&self.fetch_size.to_le_bytes());
        URL_SAFE_NO_PAD.encode(raw)
    }

    pub fn parse(s: &str) -> Result<Self, SkylinkError> {
        let raw = URL_SAFE_NO_PAD
            .decode(s.trim())
            .map_err(|e| SkylinkError::InvalidSkylink(format!("bad base64: {e}")))?;
        if raw.len() != RAW_LEN {
            return Err(SkylinkError::InvalidSkylink(format!(
                "expected {RAW_LEN} decoded bytes, got {}",
                raw.len()
            )));
        }
        let mut root_bytes = [0u8; 32];
        root_bytes.copy_from_slice(&raw[0..32]);
        let offset = u64::from_le_bytes(raw[32..40].try_into().unwrap());
        let fetch_size = u64::from_le_bytes(raw[40..48].try_into().unwrap());
        Self::new(Hash::from_bytes(root_bytes), offset, fetch_size)
    }
}

impl std::str::FromStr for Skylink {
    type Err = SkylinkError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Skylink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_string_form() {
        let sl = Skylink::new(Hash::of(b"root"), 0, 4096).unwrap();
        let s = sl.encode();
        let back = Skylink::parse(&s).unwrap();
        assert_eq!(sl, back);
    }

    #[test]
    fn rejects_non_power_of_two_fetch_size() {
        assert!(Skylink::new(Hash::zero(), 0, 5000).is_err());
    }

    #[test]
    fn rejects_fetch_size_below_granularity() {
        assert!(Skylink::new(Hash::zero(), 0, 2048).is_err());
    }

    #[test]
    fn rejects_window_past_sector_end() {
        assert!(Skylink::new(Hash::zero(), SECTOR_SIZE - 4096, 8192).is_err());
    }

    #[test]
    fn rejects_malformed_string() {
        assert!(Skylink::parse("not valid base64!!").is_err());
    }
}
