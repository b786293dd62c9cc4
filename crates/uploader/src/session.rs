//! Precreate, piece transfer and create for a single segment.

use std::future::Future;

use camvault_cloud::{ApiError, CloudApi, PieceUpload};
use camvault_protocol::constants::{ERRNO_OK, is_auth_expired, is_retryable_errno};
use camvault_protocol::{
    CreateRequest, CreateResponse, Credentials, PrecreateRequest, PrecreateResponse,
};
use camvault_transfer::Piece;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::credentials::CredentialRefresher;
use crate::error::UploadError;
use crate::retry::{RetryError, RetryPolicy, retry};
use crate::types::{SessionPhase, UploadEvent, UploadOutcome, UploadSessionState, UploadTarget};

/// Drives one target through the upload state machine.
///
/// `Idle → Precreating → {RapidUploadComplete | PieceTransferring} →
/// Finalizing → {Done | Failed}`. Every transition is logged.
pub struct UploadSession<'a> {
    api: &'a dyn CloudApi,
    credentials: &'a dyn CredentialRefresher,
    retry: &'a RetryPolicy,
    cancel: CancellationToken,
    events: Option<&'a mpsc::Sender<UploadEvent>>,
    phase: SessionPhase,
}

impl<'a> UploadSession<'a> {
    pub fn new(
        api: &'a dyn CloudApi,
        credentials: &'a dyn CredentialRefresher,
        retry: &'a RetryPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            api,
            credentials,
            retry,
            cancel,
            events: None,
            phase: SessionPhase::Idle,
        }
    }

    /// Sends [`UploadEvent::PieceTransferred`] events to `events`.
    pub fn with_events(mut self, events: &'a mpsc::Sender<UploadEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Runs the session to a terminal phase.
    ///
    /// `Ok` means the remote holds the file and the local copy may go.
    pub async fn run(
        &mut self,
        target: &UploadTarget,
        creds: Credentials,
    ) -> Result<UploadOutcome, UploadError> {
        let result = self.drive(target, creds).await;
        match &result {
            Ok(UploadOutcome::Uploaded { .. }) => self.transition(SessionPhase::Done),
            Ok(UploadOutcome::RapidUpload) => {}
            Err(e) => {
                warn!(
                    file = %target.file_name(),
                    phase = %self.phase,
                    code = %e.code(),
                    error = %e,
                    "upload session failed"
                );
                self.transition(SessionPhase::Failed);
            }
        }
        result
    }

    async fn drive(
        &mut self,
        target: &UploadTarget,
        creds: Credentials,
    ) -> Result<UploadOutcome, UploadError> {
        self.check_cancelled()?;
        let mut creds = creds;

        self.transition(SessionPhase::Precreating);
        let precreate = self.precreate(target, &mut creds).await?;
        if precreate.is_rapid_upload() {
            self.transition(SessionPhase::RapidUploadComplete);
            return Ok(UploadOutcome::RapidUpload);
        }
        if precreate.uploadid.is_empty() {
            return Err(UploadError::PrecreateRejected {
                code: precreate.errno,
                message: "precreate returned neither an upload id nor a rapid upload".into(),
            });
        }

        let mut state = UploadSessionState::new(
            precreate.uploadid,
            target.remote_path.clone(),
            target.pieces.len(),
        );

        self.transition(SessionPhase::PieceTransferring);
        for piece in &target.pieces {
            self.check_cancelled()?;
            let md5 = self.transfer_piece(target, &state, piece, &creds).await?;
            state.record(md5);
            self.emit(UploadEvent::PieceTransferred {
                file: target.file_name(),
                index: piece.index,
                total: state.pieces,
                bytes: piece.len,
            })
            .await;
        }

        self.transition(SessionPhase::Finalizing);
        self.finalize(target, &state, &mut creds).await
    }

    /// Registers the upload.
    async fn precreate(
        &self,
        target: &UploadTarget,
        creds: &mut Credentials,
    ) -> Result<PrecreateResponse, UploadError> {
        let req = PrecreateRequest::new(
            target.remote_path.clone(),
            target.size_bytes,
            target.remote_folder.clone(),
            target.block_list(),
        );
        let (api, r) = (self.api, &req);

        let resp = self
            .call_refreshing(
                "precreate",
                creds,
                move |c| async move { api.precreate(&c, r).await },
                |code, message| UploadError::PrecreateRejected { code, message },
            )
            .await?;

        if resp.errno != ERRNO_OK {
            return Err(UploadError::PrecreateRejected {
                code: resp.errno,
                message: resp.errmsg,
            });
        }
        debug!(upload_id = %resp.uploadid, return_type = resp.return_type, "precreate accepted");
        Ok(resp)
    }

    /// Issues `call` under the retry policy.
    ///
    /// An auth-expired errno, in a decoded body or in an error response,
    /// invalidates the credentials and re-issues the call once. A
    /// non-retryable code from an error response is handed to `reject`.
    async fn call_refreshing<T, F, Fut>(
        &self,
        operation: &'static str,
        creds: &mut Credentials,
        mut call: F,
        reject: fn(i64, String) -> UploadError,
    ) -> Result<T, UploadError>
    where
        T: RemoteStatus,
        F: FnMut(Credentials) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut refreshed = false;
        loop {
            let current = creds.clone();
            let result = retry(self.retry, &self.cancel, operation, || {
                let pending = call(current.clone());
                async move {
                    let resp = pending.await?;
                    transient_errno(resp.errno(), resp.errmsg())?;
                    Ok::<_, ApiError>(resp)
                }
            })
            .await;

            let expired = match &result {
                Ok(resp) if is_auth_expired(resp.errno()) => {
                    Some((resp.errno(), resp.errmsg().to_string()))
                }
                Err(RetryError::Failed(ApiError::Remote { errno, message }))
                    if is_auth_expired(*errno) =>
                {
                    Some((*errno, message.clone()))
                }
                _ => None,
            };

            let Some((code, message)) = expired else {
                return result.map_err(|e| match e {
                    RetryError::Cancelled => UploadError::Cancelled,
                    RetryError::Failed(ApiError::Remote { errno, message })
                        if !is_retryable_errno(errno) =>
                    {
                        reject(errno, message)
                    }
                    RetryError::Failed(e) => UploadError::Transport(e),
                });
            };
            if refreshed {
                return Err(UploadError::AuthExpired { code, message });
            }
            warn!(operation, errno = code, "credentials rejected, refreshing");
            self.credentials.invalidate();
            *creds = self.credentials.current_credentials().await;
            refreshed = true;
        }
    }

    /// Transfers one piece; returns the hash echoed by the remote.
    async fn transfer_piece(
        &self,
        target: &UploadTarget,
        state: &UploadSessionState,
        piece: &Piece,
        creds: &Credentials,
    ) -> Result<String, UploadError> {
        let upload = PieceUpload {
            upload_id: state.upload_id.clone(),
            remote_path: target.remote_path.clone(),
            partseq: piece.index,
            source: target.local_path.clone(),
            offset: piece.offset,
            len: piece.len,
        };
        let api = self.api;
        let u = &upload;

        let resp = retry(self.retry, &self.cancel, "upload_piece", move || async move {
            let resp = api.upload_piece(creds, u).await?;
            if resp.md5.is_empty() {
                return Err(ApiError::EmptyPieceHash { partseq: u.partseq });
            }
            Ok::<_, ApiError>(resp)
        })
        .await
        .map_err(|e| match e {
            RetryError::Cancelled => UploadError::Cancelled,
            RetryError::Failed(source) => UploadError::PieceUploadFailed {
                index: piece.index,
                source,
            },
        })?;

        if resp.md5 != piece.md5 {
            debug!(
                partseq = piece.index,
                local = %piece.md5,
                remote = %resp.md5,
                "remote piece hash differs from local"
            );
        }
        Ok(resp.md5)
    }

    /// Commits the pieces using the remote-echoed hashes.
    async fn finalize(
        &self,
        target: &UploadTarget,
        state: &UploadSessionState,
        creds: &mut Credentials,
    ) -> Result<UploadOutcome, UploadError> {
        if !state.is_complete() {
            return Err(UploadError::IncompleteTransfer {
                transferred: state.transferred(),
                expected: state.pieces,
            });
        }

        let req = CreateRequest::new(
            target.remote_path.clone(),
            target.size_bytes,
            state.upload_id.clone(),
            target.remote_folder.clone(),
            state.uploaded_piece_hashes.clone(),
        );
        let (api, r) = (self.api, &req);

        let resp = self
            .call_refreshing(
                "create",
                creds,
                move |c| async move { api.create(&c, r).await },
                |code, message| UploadError::FinalizeRejected { code, message },
            )
            .await?;

        if !resp.is_success() {
            return Err(UploadError::FinalizeRejected {
                code: resp.errno,
                message: resp.errmsg,
            });
        }
        info!(
            remote_path = %resp.path,
            fs_id = resp.fs_id,
            pieces = state.pieces,
            "upload committed"
        );
        Ok(UploadOutcome::Uploaded { fs_id: resp.fs_id })
    }

    fn transition(&mut self, next: SessionPhase) {
        debug!(from = %self.phase, to = %next, "session transition");
        self.phase = next;
    }

    fn check_cancelled(&self) -> Result<(), UploadError> {
        if self.cancel.is_cancelled() {
            Err(UploadError::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn emit(&self, event: UploadEvent) {
        if let Some(tx) = self.events {
            let _ = tx.send(event).await;
        }
    }
}

/// Surfaces a transient errno in a decoded body as an error so it is retried.
fn transient_errno(errno: i64, message: &str) -> Result<(), ApiError> {
    if is_retryable_errno(errno) {
        return Err(ApiError::Remote {
            errno,
            message: message.to_string(),
        });
    }
    Ok(())
}

/// Status fields shared by precreate and create responses.
trait RemoteStatus {
    fn errno(&self) -> i64;
    fn errmsg(&self) -> &str;
}

impl RemoteStatus for PrecreateResponse {
    fn errno(&self) -> i64 {
        self.errno
    }

    fn errmsg(&self) -> &str {
        &self.errmsg
    }
}

impl RemoteStatus for CreateResponse {
    fn errno(&self) -> i64 {
        self.errno
    }

    fn errmsg(&self) -> &str {
        &self.errmsg
    }
}
