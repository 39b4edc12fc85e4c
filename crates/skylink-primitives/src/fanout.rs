//! Decodes the fanout bytes trailing the layout header into one
//! [`ChunkRootSet`] per logical chunk.
//!
//! The fanout is a packed array of 32-byte roots. Ordinarily each chunk
//! contributes `data_pieces + parity_pieces` roots, one per encoded piece.
//! When `data_pieces == 1` and the cipher is plaintext, every encoded piece
//! of the chunk would be byte-identical (the "erasure code" is just the
//! identity function replicated `parity_pieces` times), so the fanout
//! stores a single root per chunk instead.

use crate::chunk::ChunkRootSet;
use crate::error::SkylinkError;
use crate::hash::Hash;

pub fn root_set_len(data_pieces: u8, parity_pieces: u8, is_plaintext: bool) -> usize {
    if data_pieces == 1 && is_plaintext {
        1
    } else {
        data_pieces as usize + parity_pieces as usize
    }
}

pub fn decode_fanout(
    bytes: &[u8],
    data_pieces: u8,
    parity_pieces: u8,
    is_plaintext: bool,
) -> Result<Vec<ChunkRootSet>, SkylinkError> {
    let roots_per_chunk = root_set_len(data_pieces, parity_pieces, is_plaintext);
    let root_set_bytes = roots_per_chunk * Hash::LEN;
    if root_set_bytes == 0 || bytes.len() % root_set_bytes != 0 {
        return Err(SkylinkError::ErasureMismatch { fanout_len: bytes.len(), root_set_len: root_set_bytes });
    }
    let mut chunks = Vec::with_capacity(bytes.len() / root_set_bytes);
    for chunk_bytes in bytes.chunks_exact(root_set_bytes) {
        let mut roots = Vec::with_capacity(roots_per_chunk);
        for root_bytes in chunk_bytes.chunks_exact(Hash::LEN) {
            let mut raw = [0u8; 32];
            raw.copy_from_slice(root_bytes);
            roots.push(Hash::from_bytes(raw));
        }
        chunks.push(ChunkRootSet::new(roots));
    }
    Ok(chunks)
}

pub fn encode_fanout(chunks: &[ChunkRootSet]) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in chunks {
        for root in &chunk.roots {
            out.extend_from_slice(root.as_bytes());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_root_optimization_for_one_data_piece_plaintext() {
        let chunks = vec![
            ChunkRootSet::new(vec![Hash::of(b"a")]),
            ChunkRootSet::new(vec![Hash::of(b"b")]),
        ];
        let bytes = encode_fanout(&chunks);
        assert_eq!(bytes.len(), 2 * Hash::LEN);
        let decoded = decode_fanout(&bytes, 1, 10, true).unwrap();
        assert_eq!(decoded, chunks);
    }

    #[test]
    fn full_root_set_for_erasure_coded_chunk() {
        let chunks = vec![ChunkRootSet::new((0..13).map(|i| Hash::of(&[i])).collect())];
        let bytes = encode_fanout(&chunks);
        let decoded = decode_fanout(&bytes, 10, 3, true).unwrap();
        assert_eq!(decoded, chunks);
    }

    #[test]
    fn rejects_fanout_not_evenly_divisible() {
        let bytes = vec![0u8; Hash::LEN + 1];
        assert!(matches!(
            decode_fanout(&bytes, 10, 3, true),
            Err(SkylinkError::ErasureMismatch { .. })
        ));
    }

    #[test]
    fn encrypted_one_data_piece_uses_full_root_set_not_single_root() {
        // The single-root shortcut only applies to plaintext; an encrypted
        // file with data_pieces = 1 still has distinct ciphertext per piece.
        assert_eq!(root_set_len(1, 10, false), 11);
    }
}
