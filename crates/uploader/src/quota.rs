//! Advisory capacity check before an upload.

use camvault_cloud::CloudApi;
use camvault_protocol::constants::{ERRNO_OK, PRIVILEGED_MAX_FILE_SIZE, STANDARD_MAX_FILE_SIZE};
use camvault_protocol::{Credentials, QuotaResponse};
use tracing::{debug, warn};

use crate::error::UploadError;

/// Account capacity at the time of the check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSnapshot {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub is_privileged_account: bool,
}

impl QuotaSnapshot {
    /// Reads a snapshot from a quota response; `None` if incomplete.
    pub fn from_response(resp: &QuotaResponse) -> Option<Self> {
        if resp.errno != ERRNO_OK {
            return None;
        }
        Some(Self {
            total_bytes: resp.total?,
            used_bytes: resp.used?,
            is_privileged_account: resp.vip_type.is_some_and(|v| v > 0),
        })
    }

    pub fn free_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.used_bytes)
    }

    /// Largest single file the account may store.
    pub fn max_file_size(&self) -> u64 {
        if self.is_privileged_account {
            PRIVILEGED_MAX_FILE_SIZE
        } else {
            STANDARD_MAX_FILE_SIZE
        }
    }

    /// Decides whether a file of `size` bytes fits.
    pub fn evaluate(&self, size: u64) -> QuotaDecision {
        let limit = self.max_file_size();
        if size > limit {
            return QuotaDecision::Denied(DenyReason::FileTooLarge { size, limit });
        }
        let free = self.free_bytes();
        if size > free {
            return QuotaDecision::Denied(DenyReason::InsufficientQuota { needed: size, free });
        }
        QuotaDecision::Allowed(*self)
    }
}

/// Why an upload was refused before any transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    InsufficientQuota { needed: u64, free: u64 },
    FileTooLarge { size: u64, limit: u64 },
}

impl From<DenyReason> for UploadError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::InsufficientQuota { needed, free } => UploadError::QuotaDenied { needed, free },
            DenyReason::FileTooLarge { size, limit } => UploadError::FileTooLarge { size, limit },
        }
    }
}

/// Outcome of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Allowed(QuotaSnapshot),
    /// The probe failed or was unreadable; the upload proceeds.
    Unknown,
    Denied(DenyReason),
}

impl QuotaDecision {
    /// Converts the decision into a go/no-go for the caller.
    pub fn into_result(self) -> Result<(), UploadError> {
        match self {
            QuotaDecision::Allowed(_) | QuotaDecision::Unknown => Ok(()),
            QuotaDecision::Denied(reason) => Err(reason.into()),
        }
    }
}

/// Queries the account quota once per upload. Never retried and never fails.
pub struct QuotaGate<'a> {
    api: &'a dyn CloudApi,
}

impl<'a> QuotaGate<'a> {
    pub fn new(api: &'a dyn CloudApi) -> Self {
        Self { api }
    }

    pub async fn check(&self, creds: &Credentials, size: u64) -> QuotaDecision {
        let resp = match self.api.quota(creds).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "quota probe failed, proceeding");
                return QuotaDecision::Unknown;
            }
        };

        let Some(snapshot) = QuotaSnapshot::from_response(&resp) else {
            warn!(errno = resp.errno, "quota response incomplete, proceeding");
            return QuotaDecision::Unknown;
        };

        let decision = snapshot.evaluate(size);
        debug!(
            size,
            free = snapshot.free_bytes(),
            privileged = snapshot.is_privileged_account,
            ?decision,
            "quota checked"
        );
        decision
    }
}
