//! Segment upload flow: plan, credentials, quota, precreate, transfer, create.
//!
//! This crate holds the upload **business logic**. It talks to the storage
//! service only through [`camvault_cloud::CloudApi`], so every step can be
//! driven by mocks in tests.
//!
//! # Pipeline
//!
//! 1. **Plan**: split the segment into byte ranges and hash each one
//! 2. **Credentials**: obtain fresh tokens from a [`CredentialRefresher`]
//! 3. **Quota**: advisory capacity check via [`QuotaGate`]
//! 4. **Session**: precreate, transfer pieces in order, create
//!
//! Every remote step is wrapped by [`retry`] with a [`RetryPolicy`].

pub mod credentials;
pub mod error;
pub mod pipeline;
pub mod quota;
pub mod retry;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use credentials::{CredentialRefresher, CredentialsFuture, LandingPageRefresher, StaticCredentials};
pub use error::UploadError;
pub use pipeline::{SegmentUploader, UploadPipeline, UploadFuture, UploaderConfig};
pub use quota::{DenyReason, QuotaDecision, QuotaGate, QuotaSnapshot};
pub use retry::{RetryError, RetryPolicy, Retryable, retry};
pub use session::UploadSession;
pub use types::{SessionPhase, UploadEvent, UploadOutcome, UploadReport, UploadSessionState, UploadTarget};
