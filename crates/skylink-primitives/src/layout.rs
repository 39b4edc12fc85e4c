//! The base sector's fixed-width layout header.
//!
//! The header is exactly [`LAYOUT_SIZE`] bytes with no padding between
//! fields. `cipher_type` is 8 bytes — a specifier, matching the width every
//! other fixed-size identifier field in this header uses — which is what
//! makes the 99-byte total and its round-trip invariant hold; see
//! DESIGN.md for the reasoning.

use crate::error::SkylinkError;

pub const LAYOUT_SIZE: usize = 99;
const CIPHER_TYPE_LEN: usize = 8;
const KEY_DATA_LEN: usize = 64;

pub const CIPHER_TYPE_PLAINTEXT: [u8; CIPHER_TYPE_LEN] = [0u8; CIPHER_TYPE_LEN];

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Layout {
    pub version: u8,
    pub filesize: u64,
    pub metadata_size: u64,
    pub fanout_size: u64,
    pub data_pieces: u8,
    pub parity_pieces: u8,
    pub cipher_type: [u8; CIPHER_TYPE_LEN],
    pub key_data: [u8; KEY_DATA_LEN],
}

impl Layout {
    pub const SUPPORTED_VERSION: u8 = 1;

    pub fn is_plaintext(&self) -> bool {
        self.cipher_type == CIPHER_TYPE_PLAINTEXT
    }

    /// Header + fanout + metadata must fit in one sector, and both the
    /// fanout and metadata sections individually must fit too.
    pub fn fits_in_sector(&self, sector_size: u64) -> bool {
        self.metadata_size <= sector_size
            && self.fanout_size <= sector_size
            && (LAYOUT_SIZE as u64)
                .saturating_add(self.fanout_size)
                .saturating_add(self.metadata_size)
                <= sector_size
    }

    pub fn encode(&self) -> [u8; LAYOUT_SIZE] {
        let mut out = [0u8; LAYOUT_SIZE];
        let mut pos = 0;
        out[pos] = self.version;
        pos += 1;
        out[pos..pos + 8].copy_from_slice(&self.filesize.to_le_bytes());
        pos += 8;
        out[pos..pos + 8].copy_from_slice(&self.metadata_size.to_le_bytes());
        pos += 8;
        out[pos..pos + 8].copy_from_slice(&self.fanout_size.to_le_bytes());
        pos += 8;
        out[pos] = self.data_pieces;
        pos += 1;
        out[pos] = self.parity_pieces;
        pos += 1;
        out[pos..pos + CIPHER_TYPE_LEN].copy_from_slice(&self.cipher_type);
        pos += CIPHER_TYPE_LEN;
        out[pos..pos + KEY_DATA_LEN].copy_from_slice(&self.key_data);
        pos += KEY_DATA_LEN;
        debug_assert_eq!(pos, LAYOUT_SIZE);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SkylinkError> {
        if bytes.len() < LAYOUT_SIZE {
            return Err(SkylinkError::BaseSectorTooShort { need: LAYOUT_SIZE, got: bytes.len() });
        }
        let mut pos = 0;
        let version = bytes[pos];
        pos += 1;
        if version != Self::SUPPORTED_VERSION {
            return Err(SkylinkError::UnsupportedVersion(version));
        }
        let filesize = u64::from_le_bytes(bytes[pos..pos + 8].try_into().unwrap());
        pos += 8;
        let metadata_size = u64::from_le_bytes(bytes[pos..pos + 8].try_into().unwrap());
        pos += 8;
        let fanout_size = u64::from_le_bytes(bytes[pos..pos + 8].try_into().unwrap());
        pos += 8;
        let data_pieces = bytes[pos];
        pos += 1;
        let parity_pieces = bytes[pos];
        pos += 1;
        let mut cipher_type = [0u8; CIPHER_TYPE_LEN];
        cipher_type.copy_from_slice(&bytes[pos..pos + CIPHER_TYPE_LEN]);
        pos += CIPHER_TYPE_LEN;
        let mut key_data = [0u8; KEY_DATA_LEN];
        key_data.copy_from_slice(&bytes[pos..pos + KEY_DATA_LEN]);
        pos += KEY_DATA_LEN;
        debug_assert_eq!(pos, LAYOUT_SIZE);
        Ok(Self { version, filesize, metadata_size, fanout_size, data_pieces, parity_pieces, cipher_type, key_data })
    }
}
