//! The remote-service capability used by the uploader.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use camvault_protocol::{
    CreateRequest, CreateResponse, Credentials, PieceUploadResponse, PrecreateRequest,
    PrecreateResponse, QuotaResponse,
};

use crate::error::ApiError;

/// Boxed future returned by [`CloudApi`] methods.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// One piece transfer: which byte range of which local file goes where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceUpload {
    pub upload_id: String,
    pub remote_path: String,
    /// Zero-based piece index.
    pub partseq: usize,
    pub source: PathBuf,
    pub offset: u64,
    pub len: u64,
}

/// Abstract connection to the storage service.
///
/// [`crate::HttpCloudClient`] implements this over HTTP. Keeping the upload
/// logic behind a trait lets it be exercised with mocks that count calls.
///
/// Implementations return the decoded body for 2xx responses even when it
/// carries a non-zero `errno`; interpreting the code is the caller's job.
/// The exception is `upload_piece`, which maps a non-zero `error_code` to
/// [`ApiError::Remote`]. A non-2xx response whose body carries a code is
/// also [`ApiError::Remote`].
pub trait CloudApi: Send + Sync {
    /// Queries account capacity.
    fn quota<'a>(&'a self, creds: &'a Credentials) -> ApiFuture<'a, QuotaResponse>;

    /// Registers an intended upload.
    fn precreate<'a>(
        &'a self,
        creds: &'a Credentials,
        req: &'a PrecreateRequest,
    ) -> ApiFuture<'a, PrecreateResponse>;

    /// Transfers one piece.
    fn upload_piece<'a>(
        &'a self,
        creds: &'a Credentials,
        piece: &'a PieceUpload,
    ) -> ApiFuture<'a, PieceUploadResponse>;

    /// Commits the transferred pieces.
    fn create<'a>(
        &'a self,
        creds: &'a Credentials,
        req: &'a CreateRequest,
    ) -> ApiFuture<'a, CreateResponse>;

    /// Fetches the service's landing page (used to scrape fresh tokens).
    fn landing_page<'a>(&'a self, creds: &'a Credentials) -> ApiFuture<'a, String>;
}
