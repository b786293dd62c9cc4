use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use md5::{Digest, Md5};

use crate::TransferError;
use crate::types::{Piece, PlanConfig};

/// Read buffer used while hashing a range.
const HASH_BUFFER_SIZE: usize = 1024 * 1024;

// ---------------------------------------------------------------------------
// Checksum helpers
// ---------------------------------------------------------------------------

/// Computes MD5 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Hashes `len` bytes of `file` starting at `offset`.
///
/// Streams through a bounded buffer; fails with [`TransferError::Truncated`]
/// if the file ends before `len` bytes were read.
pub fn md5_range(file: &mut File, offset: u64, len: u64) -> Result<String, TransferError> {
    file.seek(SeekFrom::Start(offset))?;

    let mut hasher = Md5::new();
    let mut limited = (&mut *file).take(len);
    let mut buf = vec![0u8; HASH_BUFFER_SIZE.min(len.max(1) as usize)];
    let mut read_total = 0u64;
    loop {
        let n = limited.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        read_total += n as u64;
    }

    if read_total != len {
        return Err(TransferError::Truncated {
            offset,
            expected: len,
            actual: read_total,
        });
    }
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Computes `(offset, len)` for every piece of a `size`-byte file.
///
/// Below the split threshold the whole file is one piece (a zero-byte
/// file yields a single empty range). At or above it the file is cut into
/// `ceil(size / piece_size)` contiguous ranges, the last one truncated.
pub fn piece_ranges(size: u64, config: &PlanConfig) -> Vec<(u64, u64)> {
    if size < config.split_threshold {
        return vec![(0, size)];
    }

    let piece_size = config.piece_size;
    let count = size.div_ceil(piece_size);
    (0..count)
        .map(|i| {
            let offset = i * piece_size;
            (offset, piece_size.min(size - offset))
        })
        .collect()
}

/// Plans and hashes the pieces of the file at `path`.
///
/// `size` is the size observed when the file was dequeued; only that many
/// bytes are covered. Blocking: call from `spawn_blocking` in async code.
pub fn plan_pieces(path: &Path, size: u64, config: &PlanConfig) -> Result<Vec<Piece>, TransferError> {
    config.validate()?;
    let mut file = File::open(path)?;

    piece_ranges(size, config)
        .into_iter()
        .enumerate()
        .map(|(index, (offset, len))| {
            let md5 = md5_range(&mut file, offset, len)?;
            Ok(Piece {
                index,
                offset,
                len,
                md5,
            })
        })
        .collect()
}
