//! The erasure code seam: a chunk is reconstructable from any
//! `data_pieces` of its encoded pieces via the erasure code identified by
//! the layout. Two implementations are provided: a Reed-Solomon code for
//! real chunks, and a one-piece passthrough for the single-root discovery
//! fetch `open()` uses, where there is nothing to reconstruct.

use reed_solomon_erasure::galois_8::ReedSolomon;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErasureError {
    TooFewPieces { have: usize, need: usize },
    InconsistentPieceSize,
    Underlying(String),
}

impl fmt::Display for ErasureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErasureError::TooFewPieces { have, need } => {
                write!(f, "have {have} pieces, need {need} to reconstruct")
            }
            ErasureError::InconsistentPieceSize => write!(f, "pieces are not all the same size"),
            ErasureError::Underlying(msg) => write!(f, "erasure code error: {msg}"),
        }
    }
}

impl std::error::Error for ErasureError {}

pub trait ErasureCode: Send + Sync {
    fn data_pieces(&self) -> usize;
    fn parity_pieces(&self) -> usize;
    fn num_pieces(&self) -> usize {
        self.data_pieces() + self.parity_pieces()
    }

    /// Splits `data` into `num_pieces()` shards, the first `data_pieces()`
    /// holding the data itself and the rest holding parity.
    fn encode(&self, data: &[u8]) -> Result<Vec<Vec<u8>>, ErasureError>;

    /// Reconstructs the original data given at least `data_pieces()`
    /// shards; `pieces[i]` is `None` for a piece that was never received.
    fn decode(&self, pieces: Vec<Option<Vec<u8>>>) -> Result<Vec<u8>, ErasureError>;
}

/// The identity code used when a chunk has exactly one data piece and no
/// parity, i.e. there is nothing to erasure-code: the single piece *is*
/// the chunk.
pub struct PassthroughCode;

impl ErasureCode for PassthroughCode {
    fn data_pieces(&self) -> usize {
        1
    }
    fn parity_pieces(&self) -> usize {
        0
    }
    fn encode(&self, data: &[u8]) -> Result<Vec<Vec<u8>>, ErasureError> {
        Ok(vec![data.to_vec()])
    }
    fn decode(&self, mut pieces: Vec<Option<Vec<u8>>>) -> Result<Vec<u8>, ErasureError> {
        pieces
            .pop()
            .flatten()
            .ok_or(ErasureError::TooFewPieces { have: 0, need: 1 })
    }
}

pub struct ReedSolomonCode {
    data_pieces: usize,
    parity_pieces: usize,
    rs: ReedSolomon,
}

impl ReedSolomonCode {
    pub fn new(data_pieces: usize, parity_pieces: usize) -> Result<Self, ErasureError> {
        let rs = ReedSolomon::new(data_pieces, parity_pieces)
            .map_err(|e| ErasureError::Underlying(e.to_string()))?;
        Ok(Self { data_pieces, parity_pieces, rs })
    }
}

impl ErasureCode for ReedSolomonCode {
    fn data_pieces(&self) -> usize {
        self.data_pieces
    }
    fn parity_pieces(&self) -> usize {
        self.parity_pieces
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<Vec<u8>>, ErasureError> {
        let piece_len = data.len().div_ceil(self.data_pieces);
        let mut shards: Vec<Vec<u8>> = data
            .chunks(piece_len)
            .map(|chunk| {
                let mut v = chunk.to_vec();
                v.resize(piece_len, 0);
                v
            })
            .collect();
        while shards.len() < self.data_pieces {
            shards.push(vec![0u8; piece_len]);
        }
        for _ in 0..self.parity_pieces {
            shards.push(vec![0u8; piece_len]);
        }
        self.rs.encode(&mut shards).map_err(|e| ErasureError::Underlying(e.to_string()))?;
        Ok(shards)
    }

    fn decode(&self, pieces: Vec<Option<Vec<u8>>>) -> Result<Vec<u8>, ErasureError> {
        if pieces.len() != self.num_pieces() {
            return Err(ErasureError::TooFewPieces { have: pieces.len(), need: self.num_pieces() });
        }
        let have = pieces.iter().filter(|p| p.is_some()).count();
        if have < self.data_pieces {
            return Err(ErasureError::TooFewPieces { have, need: self.data_pieces });
        }
        let piece_len = pieces
            .iter()
            .find_map(|p| p.as_ref().map(|v| v.len()))
            .ok_or(ErasureError::InconsistentPieceSize)?;
        if pieces.iter().flatten().any(|p| p.len() != piece_len) {
            return Err(ErasureError::InconsistentPieceSize);
        }
        let mut shards: Vec<Option<Vec<u8>>> = pieces;
        self.rs.reconstruct_data(&mut shards).map_err(|e| ErasureError::Underlying(e.to_string()))?;
        let mut out = Vec::with_capacity(piece_len * self.data_pieces);
        for shard in shards.into_iter().take(self.data_pieces) {
            out.extend_from_slice(&shard.expect("reconstruct_data fills every data shard"));
        }
        Ok(out)
    }
}
