//! Endpoint paths, parameter names and status codes of the remote service.

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// Registers an intended upload (relative to the API base URL).
pub const PRECREATE_PATH: &str = "/api/precreate";

/// Commits transferred pieces into a remote file (relative to the API base URL).
pub const CREATE_PATH: &str = "/api/create";

/// Account capacity probe (relative to the API base URL).
pub const QUOTA_PATH: &str = "/api/quota";

/// Piece transfer endpoint (relative to the upload base URL).
pub const SUPERFILE_PATH: &str = "/rest/2.0/pcs/superfile2";

/// Multipart field carrying the piece bytes.
pub const PIECE_FIELD_NAME: &str = "file";

// ---------------------------------------------------------------------------
// Credentials on the wire
// ---------------------------------------------------------------------------

/// Query parameter carrying the primary token.
pub const PRIMARY_TOKEN_PARAM: &str = "jsToken";

/// Query parameter carrying the secondary token (optional).
pub const SECONDARY_TOKEN_PARAM: &str = "bdstoken";

// ---------------------------------------------------------------------------
// Status codes
// ---------------------------------------------------------------------------

/// `errno` value reported on success.
pub const ERRNO_OK: i64 = 0;

/// Precreate `return_type` meaning the content already exists remotely.
pub const RETURN_TYPE_RAPID_UPLOAD: i32 = 2;

/// Codes meaning the session cookie or tokens are no longer accepted.
pub const AUTH_EXPIRED_ERRNOS: &[i64] = &[-6, 111];

/// Codes the service uses for transient overload.
pub const RETRYABLE_ERRNOS: &[i64] = &[31034, 31299];

/// Returns `true` if `errno` means the credentials need a refresh.
pub fn is_auth_expired(errno: i64) -> bool {
    AUTH_EXPIRED_ERRNOS.contains(&errno)
}

/// Returns `true` if `errno` is worth retrying with backoff.
pub fn is_retryable_errno(errno: i64) -> bool {
    RETRYABLE_ERRNOS.contains(&errno)
}

// ---------------------------------------------------------------------------
// Account limits
// ---------------------------------------------------------------------------

/// Largest single file a standard account may store (4 GiB).
pub const STANDARD_MAX_FILE_SIZE: u64 = 4 * 1024 * 1024 * 1024;

/// Largest single file a privileged account may store (20 GiB).
pub const PRIVILEGED_MAX_FILE_SIZE: u64 = 20 * 1024 * 1024 * 1024;
