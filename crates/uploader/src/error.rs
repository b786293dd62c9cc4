//! Upload error types.

use camvault_cloud::ApiError;
use camvault_transfer::TransferError;

/// Terminal reasons an upload attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("chunking failed: {0}")]
    ChunkingFailed(#[from] TransferError),

    #[error("invalid upload target: {0}")]
    InvalidTarget(String),

    #[error("credentials expired (errno {code}): {message}")]
    AuthExpired { code: i64, message: String },

    #[error("precreate rejected (errno {code}): {message}")]
    PrecreateRejected { code: i64, message: String },

    #[error("piece {index} upload failed: {source}")]
    PieceUploadFailed {
        index: usize,
        #[source]
        source: ApiError,
    },

    #[error("transferred {transferred} of {expected} pieces")]
    IncompleteTransfer { transferred: usize, expected: usize },

    #[error("create rejected (errno {code}): {message}")]
    FinalizeRejected { code: i64, message: String },

    #[error("insufficient quota: need {needed} bytes, {free} free")]
    QuotaDenied { needed: u64, free: u64 },

    #[error("file too large: {size} bytes exceeds limit of {limit}")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("file changed while queued: {expected} -> {actual} bytes")]
    FileChanged { expected: u64, actual: u64 },

    #[error("remote call failed: {0}")]
    Transport(#[from] ApiError),

    #[error("cancelled")]
    Cancelled,
}

impl UploadError {
    /// Stable short name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            UploadError::ChunkingFailed(_) => "chunking_failed",
            UploadError::InvalidTarget(_) => "invalid_target",
            UploadError::AuthExpired { .. } => "auth_expired",
            UploadError::PrecreateRejected { .. } => "precreate_rejected",
            UploadError::PieceUploadFailed { .. } => "piece_upload_failed",
            UploadError::IncompleteTransfer { .. } => "incomplete_transfer",
            UploadError::FinalizeRejected { .. } => "finalize_rejected",
            UploadError::QuotaDenied { .. } => "quota_denied",
            UploadError::FileTooLarge { .. } => "file_too_large",
            UploadError::FileChanged { .. } => "file_changed",
            UploadError::Transport(_) => "transport",
            UploadError::Cancelled => "cancelled",
        }
    }

    /// Code reported in failure notifications: the remote errno when the
    /// service supplied one, otherwise [`kind`](Self::kind).
    pub fn code(&self) -> String {
        match self {
            UploadError::AuthExpired { code, .. }
            | UploadError::PrecreateRejected { code, .. }
            | UploadError::FinalizeRejected { code, .. } => code.to_string(),
            UploadError::PieceUploadFailed { source, .. } | UploadError::Transport(source) => {
                match source.errno() {
                    Some(errno) => errno.to_string(),
                    None => self.kind().to_string(),
                }
            }
            _ => self.kind().to_string(),
        }
    }

    /// The file should simply be picked up again later; not a failure.
    pub fn is_skip(&self) -> bool {
        matches!(self, UploadError::FileChanged { .. })
    }
}
