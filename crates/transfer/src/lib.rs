//! Piece planning for segment uploads.
//!
//! Decides whether a segment is sent whole or split, computes the byte
//! range of every piece and hashes each range with MD5 by streaming it
//! from the source file. Pieces are never materialized as separate files.

mod planner;
mod types;
mod validation;

pub use planner::{checksum_bytes, md5_range, piece_ranges, plan_pieces};
pub use types::{Piece, PlanConfig, local_hashes};
pub use validation::{remote_path_for, validate_remote_folder, validate_segment_name};

/// Files at or above this size are split (2 GiB).
pub const DEFAULT_SPLIT_THRESHOLD: u64 = 2 * 1024 * 1024 * 1024;

/// Size of each piece when a file is split (120 MiB).
pub const DEFAULT_PIECE_SIZE: u64 = 120 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file ended early at offset {offset}: expected {expected} bytes, read {actual}")]
    Truncated { offset: u64, expected: u64, actual: u64 },

    #[error("invalid piece plan: {0}")]
    InvalidPlan(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),
}
