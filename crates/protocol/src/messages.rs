use serde::{Deserialize, Serialize, Serializer};

use crate::constants::{ERRNO_OK, RETURN_TYPE_RAPID_UPLOAD};

// ---------------------------------------------------------------------------
// Request payloads (form-encoded)
// ---------------------------------------------------------------------------

/// Registers an intended upload.
///
/// `block_list` holds the locally computed piece MD5s in piece order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrecreateRequest {
    pub path: String,
    pub size: u64,
    pub isdir: u8,
    pub autoinit: u8,
    pub target_path: String,
    #[serde(serialize_with = "block_list_as_json")]
    pub block_list: Vec<String>,
}

impl PrecreateRequest {
    /// Builds a file (not directory) precreate with `autoinit` set.
    pub fn new(
        path: impl Into<String>,
        size: u64,
        target_path: impl Into<String>,
        block_list: Vec<String>,
    ) -> Self {
        Self {
            path: path.into(),
            size,
            isdir: 0,
            autoinit: 1,
            target_path: target_path.into(),
            block_list,
        }
    }
}

/// Query string of a piece transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieceUploadQuery {
    pub method: &'static str,
    pub uploadid: String,
    pub path: String,
    pub partseq: usize,
}

impl PieceUploadQuery {
    pub fn new(uploadid: impl Into<String>, path: impl Into<String>, partseq: usize) -> Self {
        Self {
            method: "upload",
            uploadid: uploadid.into(),
            path: path.into(),
            partseq,
        }
    }
}

/// Commits the transferred pieces.
///
/// `block_list` must be the hashes echoed by the piece transfers, in
/// `partseq` order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateRequest {
    pub path: String,
    pub size: u64,
    pub isdir: u8,
    pub uploadid: String,
    pub target_path: String,
    #[serde(serialize_with = "block_list_as_json")]
    pub block_list: Vec<String>,
}

impl CreateRequest {
    pub fn new(
        path: impl Into<String>,
        size: u64,
        uploadid: impl Into<String>,
        target_path: impl Into<String>,
        block_list: Vec<String>,
    ) -> Self {
        Self {
            path: path.into(),
            size,
            isdir: 0,
            uploadid: uploadid.into(),
            target_path: target_path.into(),
            block_list,
        }
    }
}

/// The service expects `block_list` as a JSON array inside a form field.
fn block_list_as_json<S: Serializer>(list: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    let json = serde_json::to_string(list).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&json)
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

/// Response to a precreate call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PrecreateResponse {
    #[serde(default)]
    pub errno: i64,
    #[serde(default, alias = "show_msg")]
    pub errmsg: String,
    #[serde(default)]
    pub uploadid: String,
    #[serde(default)]
    pub return_type: i32,
}

impl PrecreateResponse {
    /// Content already exists remotely; no transfer or finalize needed.
    pub fn is_rapid_upload(&self) -> bool {
        self.errno == ERRNO_OK && self.return_type == RETURN_TYPE_RAPID_UPLOAD
    }
}

/// Response to a piece transfer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PieceUploadResponse {
    #[serde(default)]
    pub md5: String,
    #[serde(default)]
    pub error_code: i64,
    #[serde(default)]
    pub error_msg: String,
}

/// Response to a create (finalize) call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CreateResponse {
    #[serde(default)]
    pub errno: i64,
    #[serde(default, alias = "show_msg")]
    pub errmsg: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub fs_id: u64,
}

impl CreateResponse {
    pub fn is_success(&self) -> bool {
        self.errno == ERRNO_OK
    }
}

/// Response to a quota probe.
///
/// Every field is optional: a body missing `total` or `used` is reported
/// as "unknown" by the caller rather than failing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QuotaResponse {
    #[serde(default)]
    pub errno: i64,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub used: Option<u64>,
    #[serde(default)]
    pub vip_type: Option<i32>,
}
