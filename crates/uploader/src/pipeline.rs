//! Per-file upload pipeline: plan, credentials, quota, session.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use camvault_cloud::CloudApi;
use camvault_transfer::{PlanConfig, TransferError, plan_pieces, remote_path_for};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::credentials::CredentialRefresher;
use crate::error::UploadError;
use crate::quota::QuotaGate;
use crate::retry::RetryPolicy;
use crate::session::UploadSession;
use crate::types::{UploadEvent, UploadReport, UploadTarget};

/// Boxed future returned by [`UploadPipeline::upload`].
pub type UploadFuture<'a> = Pin<Box<dyn Future<Output = Result<UploadReport, UploadError>> + Send + 'a>>;

/// Uploads one local file.
///
/// The watcher only depends on this trait; [`SegmentUploader`] is the
/// production implementation.
pub trait UploadPipeline: Send + Sync {
    fn upload<'a>(&'a self, path: &'a Path, cancel: &'a CancellationToken) -> UploadFuture<'a>;

    /// Remote folder files are uploaded into, for failure reports.
    fn remote_folder(&self) -> &str;
}

/// Settings fixed for the lifetime of a [`SegmentUploader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploaderConfig {
    /// Absolute remote folder.
    pub remote_folder: String,
    pub plan: PlanConfig,
}

impl UploaderConfig {
    pub fn new(remote_folder: impl Into<String>) -> Self {
        Self {
            remote_folder: remote_folder.into(),
            plan: PlanConfig::default(),
        }
    }

    pub fn with_plan(mut self, plan: PlanConfig) -> Self {
        self.plan = plan;
        self
    }
}

/// Runs the full pipeline for one segment at a time.
pub struct SegmentUploader {
    api: Arc<dyn CloudApi>,
    credentials: Arc<dyn CredentialRefresher>,
    config: UploaderConfig,
    retry: RetryPolicy,
    events: Option<mpsc::Sender<UploadEvent>>,
}

impl SegmentUploader {
    pub fn new(
        api: Arc<dyn CloudApi>,
        credentials: Arc<dyn CredentialRefresher>,
        config: UploaderConfig,
    ) -> Self {
        Self {
            api,
            credentials,
            config,
            retry: RetryPolicy::default(),
            events: None,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_events(mut self, events: mpsc::Sender<UploadEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    /// Uploads `path`. On `Ok` the caller may delete the local file.
    pub async fn upload_segment(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<UploadReport, UploadError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| UploadError::InvalidTarget(format!("no file name: {}", path.display())))?;
        let remote_path = remote_path_for(&self.config.remote_folder, &name)
            .map_err(|e| UploadError::InvalidTarget(e.to_string()))?;

        // 1. Plan
        let size = file_size(path).await?;
        let pieces = tokio::task::spawn_blocking({
            let path = path.to_path_buf();
            let plan = self.config.plan;
            move || plan_pieces(&path, size, &plan)
        })
        .await
        .map_err(|e| TransferError::Io(std::io::Error::other(format!("hashing task failed: {e}"))))??;

        let target = UploadTarget {
            local_path: path.to_path_buf(),
            remote_folder: self.config.remote_folder.clone(),
            remote_path,
            size_bytes: size,
            pieces,
        };
        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        // 2. Credentials
        let creds = self.credentials.current_credentials().await;
        if !creds.is_complete() {
            warn!("credentials incomplete, remote calls will likely be rejected");
        }

        // 3. Quota
        QuotaGate::new(self.api.as_ref())
            .check(&creds, size)
            .await
            .into_result()?;

        // Settle check: a file still being written is picked up again later.
        let current = file_size(path).await?;
        if current != size {
            return Err(UploadError::FileChanged {
                expected: size,
                actual: current,
            });
        }

        // 4. Session
        info!(
            file = %name,
            size,
            pieces = target.pieces.len(),
            remote_path = %target.remote_path,
            "uploading segment"
        );
        self.emit(UploadEvent::Started {
            file: name.clone(),
            size_bytes: size,
            pieces: target.pieces.len(),
        })
        .await;

        let mut session = UploadSession::new(
            self.api.as_ref(),
            self.credentials.as_ref(),
            &self.retry,
            cancel.clone(),
        );
        if let Some(ref tx) = self.events {
            session = session.with_events(tx);
        }
        let outcome = session.run(&target, creds).await?;

        self.emit(UploadEvent::Finished {
            file: name,
            outcome: outcome.clone(),
        })
        .await;

        Ok(UploadReport {
            local_path: target.local_path,
            remote_path: target.remote_path,
            size_bytes: size,
            pieces: target.pieces.len(),
            outcome,
        })
    }

    async fn emit(&self, event: UploadEvent) {
        if let Some(ref tx) = self.events {
            let _ = tx.send(event).await;
        }
    }
}

impl UploadPipeline for SegmentUploader {
    fn upload<'a>(&'a self, path: &'a Path, cancel: &'a CancellationToken) -> UploadFuture<'a> {
        Box::pin(self.upload_segment(path, cancel))
    }

    fn remote_folder(&self) -> &str {
        &self.config.remote_folder
    }
}

async fn file_size(path: &Path) -> Result<u64, UploadError> {
    let meta = tokio::fs::metadata(path).await.map_err(TransferError::from)?;
    Ok(meta.len())
}
