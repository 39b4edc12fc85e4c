//! The cipher applied to chunk bytes when the base sector's layout names a
//! non-plaintext cipher type. Like the Merkle hash function elsewhere in
//! this workspace, the cipher itself is a black box with stated
//! properties (a position-addressable keystream); this is sha2-backed
//! stand-in, not a claim about which AEAD a production cipher type names.

use skylink_primitives::Hash;

const KEY_LEN: usize = 64;
const BLOCK_LEN: usize = Hash::LEN;

/// XORs `data` in place against the keystream for `chunk_index`, starting
/// at `offset_in_chunk`. Symmetric: the same call encrypts or decrypts.
pub fn apply_keystream(key: &[u8; KEY_LEN], chunk_index: u64, offset_in_chunk: u64, data: &mut [u8]) {
    let mut produced = 0usize;
    let mut block_counter = offset_in_chunk / BLOCK_LEN as u64;
    let mut skip = (offset_in_chunk % BLOCK_LEN as u64) as usize;
    while produced < data.len() {
        let mut seed = Vec::with_capacity(KEY_LEN + 16);
        seed.extend_from_slice(key);
        seed.extend_from_slice(&chunk_index.to_le_bytes());
        seed.extend_from_slice(&block_counter.to_le_bytes());
        let block = Hash::of(&seed);
        for &b in block.as_bytes().iter().skip(skip) {
            if produced >= data.len() {
                break;
            }
            data[produced] ^= b;
            produced += 1;
        }
        skip = 0;
        block_counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applying_the_keystream_twice_round_trips() {
        let key = [9u8; KEY_LEN];
        let original = b"the quick brown fox jumps over the lazy dog, twice".to_vec();
        let mut data = original.clone();
        apply_keystream(&key, 3, 17, &mut data);
        assert_ne!(data, original);
        apply_keystream(&key, 3, 17, &mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn keystream_is_position_dependent() {
        let key = [1u8; KEY_LEN];
        let mut a = vec![0u8; 40];
        let mut b = vec![0u8; 40];
        apply_keystream(&key, 0, 0, &mut a);
        apply_keystream(&key, 0, 5, &mut b);
        assert_ne!(a, b);
    }

    #[test]
    fn decrypting_a_sub_range_matches_decrypting_the_whole_then_trimming() {
        let key = [4u8; KEY_LEN];
        let mut whole = vec![7u8; 100];
        apply_keystream(&key, 1, 0, &mut whole);
        let mut sub = vec![7u8; 30];
        apply_keystream(&key, 1, 40, &mut sub);
        assert_eq!(&whole[40..70], &sub[..]);
    }
}
