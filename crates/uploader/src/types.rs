//! Data types for the upload flow.

use std::fmt;
use std::path::PathBuf;

use camvault_transfer::{Piece, local_hashes};

/// A segment bound for the remote folder, with its pieces already hashed.
///
/// Built when a file is dequeued and not modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub local_path: PathBuf,
    pub remote_folder: String,
    pub remote_path: String,
    pub size_bytes: u64,
    pub pieces: Vec<Piece>,
}

impl UploadTarget {
    /// Local piece hashes in upload order (the precreate `block_list`).
    pub fn block_list(&self) -> Vec<String> {
        local_hashes(&self.pieces)
    }

    /// File name component, used in logs and notifications.
    pub fn file_name(&self) -> String {
        self.local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Where an [`crate::UploadSession`] currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Precreating,
    RapidUploadComplete,
    PieceTransferring,
    Finalizing,
    Done,
    Failed,
}

impl SessionPhase {
    /// No further transitions happen from this phase.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionPhase::RapidUploadComplete | SessionPhase::Done | SessionPhase::Failed
        )
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Precreating => "precreating",
            SessionPhase::RapidUploadComplete => "rapid_upload_complete",
            SessionPhase::PieceTransferring => "piece_transferring",
            SessionPhase::Finalizing => "finalizing",
            SessionPhase::Done => "done",
            SessionPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Remote-side state of an accepted precreate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSessionState {
    /// Opaque id issued by precreate; sent unchanged with every later call.
    pub upload_id: String,
    pub target_path: String,
    pub pieces: usize,
    /// Hashes echoed by piece transfers, in `partseq` order.
    pub uploaded_piece_hashes: Vec<String>,
}

impl UploadSessionState {
    pub fn new(upload_id: impl Into<String>, target_path: impl Into<String>, pieces: usize) -> Self {
        Self {
            upload_id: upload_id.into(),
            target_path: target_path.into(),
            pieces,
            uploaded_piece_hashes: Vec::with_capacity(pieces),
        }
    }

    pub fn record(&mut self, md5: String) {
        self.uploaded_piece_hashes.push(md5);
    }

    pub fn transferred(&self) -> usize {
        self.uploaded_piece_hashes.len()
    }

    pub fn is_complete(&self) -> bool {
        self.transferred() == self.pieces
    }
}

/// How a successful upload concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Pieces transferred and committed.
    Uploaded { fs_id: u64 },
    /// Remote already had the content; nothing transferred.
    RapidUpload,
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub local_path: PathBuf,
    pub remote_path: String,
    pub size_bytes: u64,
    pub pieces: usize,
    pub outcome: UploadOutcome,
}

/// Progress event emitted while uploading.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// Session started for a file.
    Started {
        file: String,
        size_bytes: u64,
        pieces: usize,
    },
    /// One piece was accepted by the remote.
    PieceTransferred {
        file: String,
        index: usize,
        total: usize,
        bytes: u64,
    },
    /// Session ended successfully.
    Finished { file: String, outcome: UploadOutcome },
}
