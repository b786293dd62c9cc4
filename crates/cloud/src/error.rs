//! Remote call error types.

use camvault_protocol::constants::is_retryable_errno;

/// Errors produced by a single remote call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("undecodable response: {0}")]
    Decode(String),

    #[error("remote error {errno}: {message}")]
    Remote { errno: i64, message: String },

    #[error("piece {partseq} transfer returned no hash")]
    EmptyPieceHash { partseq: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Whether a retry with backoff may succeed.
    ///
    /// Local I/O failures and request construction errors are not
    /// retryable; remote codes are retryable only when listed as transient.
    /// `Status` only arises for bodies without a remote code.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(e) => !e.is_builder(),
            ApiError::Status { .. } | ApiError::Decode(_) | ApiError::EmptyPieceHash { .. } => {
                true
            }
            ApiError::Remote { errno, .. } => is_retryable_errno(*errno),
            ApiError::Io(_) => false,
        }
    }

    /// The remote status code, when the service reported one.
    pub fn errno(&self) -> Option<i64> {
        match self {
            ApiError::Remote { errno, .. } => Some(*errno),
            _ => None,
        }
    }
}
