//! Wire encoding for `ReadRegistry`/`UpdateRegistry` instruction outputs.
//! Real hosts would frame this as part of the program-execution output;
//! this module gives test doubles and the worker a shared format to
//! encode/decode [`RegistryEntry`] through a `ProgramResponse.output`.

use skylink_primitives::registry::EntryType;
use skylink_primitives::RegistryEntry;

pub const ERR_ENTRY_NOT_FOUND: &str = "registry-entry-not-found";
pub const ERR_LOWER_REV_NUM: &str = "lower-rev-num";
pub const ERR_SAME_REV_NUM: &str = "same-rev-num";

pub fn encode_entry(entry: &RegistryEntry) -> Vec<u8> {
    let mut out = Vec::with_capacity(32 + 32 + 8 + 8 + entry.data.len() + 64 + 1);
    out.extend_from_slice(&entry.public_key);
    out.extend_from_slice(&entry.tweak);
    out.extend_from_slice(&entry.revision.to_le_bytes());
    out.extend_from_slice(&(entry.data.len() as u64).to_le_bytes());
    out.extend_from_slice(&entry.data);
    out.extend_from_slice(&entry.signature);
    out.push(match entry.entry_type {
        EntryType::Standard => 0,
        EntryType::WithPow => 1,
    });
    out
}

pub fn decode_entry(bytes: &[u8]) -> Option<RegistryEntry> {
    if bytes.len() < 32 + 32 + 8 + 8 {
        return None;
    }
    let mut pos = 0;
    let mut public_key = [0u8; 32];
    public_key.copy_from_slice(&bytes[pos..pos + 32]);
    pos += 32;
    let mut tweak = [0u8; 32];
    tweak.copy_from_slice(&bytes[pos..pos + 32]);
    pos += 32;
    let revision = u64::from_le_bytes(bytes[pos..pos + 8].try_into().ok()?);
    pos += 8;
    let data_len = u64::from_le_bytes(bytes[pos..pos + 8].try_into().ok()?) as usize;
    pos += 8;
    if bytes.len() < pos + data_len + 64 + 1 {
        return None;
    }
    let data = bytes[pos..pos + data_len].to_vec();
    pos += data_len;
    let mut signature = [0u8; 64];
    signature.copy_from_slice(&bytes[pos..pos + 64]);
    pos += 64;
    let entry_type = match bytes[pos] {
        1 => EntryType::WithPow,
        _ => EntryType::Standard,
    };
    Some(RegistryEntry { public_key, tweak, revision, data, signature, entry_type })
}
