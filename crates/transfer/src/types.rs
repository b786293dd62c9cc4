use crate::{DEFAULT_PIECE_SIZE, DEFAULT_SPLIT_THRESHOLD, TransferError};

/// A contiguous byte range of a segment, hashed independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    /// Zero-based position; also the `partseq` used on the wire.
    pub index: usize,
    /// Byte offset within the source file.
    pub offset: u64,
    /// Length of this piece in bytes.
    pub len: u64,
    /// Lowercase hex MD5 of the range.
    pub md5: String,
}

/// Split decision parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanConfig {
    /// Files of at least this many bytes are split.
    pub split_threshold: u64,
    /// Maximum size of each piece when splitting.
    pub piece_size: u64,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            split_threshold: DEFAULT_SPLIT_THRESHOLD,
            piece_size: DEFAULT_PIECE_SIZE,
        }
    }
}

impl PlanConfig {
    pub fn new(split_threshold: u64, piece_size: u64) -> Self {
        Self {
            split_threshold,
            piece_size,
        }
    }

    /// Rejects configurations that cannot produce a plan.
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.piece_size == 0 {
            return Err(TransferError::InvalidPlan("piece size must be > 0".into()));
        }
        if self.split_threshold == 0 {
            return Err(TransferError::InvalidPlan(
                "split threshold must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Locally computed hashes in piece order.
pub fn local_hashes(pieces: &[Piece]) -> Vec<String> {
    pieces.iter().map(|p| p.md5.clone()).collect()
}
