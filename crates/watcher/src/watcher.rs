//! Sequential upload consumer fed by filesystem events.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use camvault_notifier::{FailureSummary, NotificationSink};
use camvault_uploader::{UploadError, UploadPipeline};
use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::WatchError;
use crate::filter::{SegmentFilter, scan_existing};
use crate::queue::UploadQueue;

/// Files handled during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl UploadSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Paths an event reports as fully written.
///
/// Close-after-write and rename-into-place count; everything else
/// (creation, partial writes, removals) is ignored.
pub fn completed_paths(event: &Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write))
        | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths.clone(),
        // Both carries [from, to].
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.last().cloned().into_iter().collect()
        }
        _ => Vec::new(),
    }
}

/// Uploads finished segments from one directory, one at a time.
pub struct UploadQueueWatcher {
    dir: PathBuf,
    filter: SegmentFilter,
    pipeline: Arc<dyn UploadPipeline>,
    sink: Arc<dyn NotificationSink>,
}

impl UploadQueueWatcher {
    pub fn new(
        dir: impl Into<PathBuf>,
        filter: SegmentFilter,
        pipeline: Arc<dyn UploadPipeline>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            dir: dir.into(),
            filter,
            pipeline,
            sink,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Drains the files present now, then returns.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<UploadSummary, WatchError> {
        self.check_dir()?;
        let mut summary = UploadSummary::default();
        let files = scan_existing(&self.dir, &self.filter)?;
        info!(dir = %self.dir.display(), files = files.len(), "uploading existing segments");

        for path in files {
            if cancel.is_cancelled() {
                break;
            }
            self.process(&path, cancel, &mut summary).await;
        }
        Ok(summary)
    }

    /// Watches the directory until `cancel` fires.
    ///
    /// Files already present are queued first, in name order.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<UploadSummary, WatchError> {
        self.check_dir()?;
        let (tx, mut rx) = mpsc::unbounded_channel::<PathBuf>();

        // The callback runs on notify's thread; it only forwards paths.
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for path in completed_paths(&event) {
                    let _ = tx.send(path);
                }
            }
            Err(e) => warn!(error = %e, "watch error"),
        })?;
        watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;

        let mut queue = UploadQueue::new();
        for path in scan_existing(&self.dir, &self.filter)? {
            queue.push(path);
        }
        info!(
            dir = %self.dir.display(),
            queued = queue.len(),
            "watching for finished segments"
        );

        let mut summary = UploadSummary::default();
        loop {
            while let Ok(path) = rx.try_recv() {
                self.enqueue(&mut queue, path);
            }

            if let Some(path) = queue.pop() {
                if cancel.is_cancelled() {
                    break;
                }
                self.process(&path, cancel, &mut summary).await;
                continue;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                Some(path) = rx.recv() => self.enqueue(&mut queue, path),
            }
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            pending = queue.len(),
            "watcher stopped"
        );
        Ok(summary)
    }

    fn enqueue(&self, queue: &mut UploadQueue, path: PathBuf) {
        if !self.filter.accepts(&path) {
            return;
        }
        if queue.push(path.clone()) {
            debug!(file = %path.display(), "queued");
        }
    }

    fn check_dir(&self) -> Result<(), WatchError> {
        if !self.dir.is_dir() {
            return Err(WatchError::NotADirectory(self.dir.display().to_string()));
        }
        Ok(())
    }

    /// Uploads one file and applies the delete-or-keep rule.
    async fn process(&self, path: &Path, cancel: &CancellationToken, summary: &mut UploadSummary) {
        let size = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.len(),
            Err(_) => {
                debug!(file = %path.display(), "file gone before upload, skipping");
                return;
            }
        };

        match self.pipeline.upload(path, cancel).await {
            Ok(report) => {
                summary.succeeded += 1;
                match tokio::fs::remove_file(path).await {
                    Ok(()) => info!(
                        file = %path.display(),
                        remote_path = %report.remote_path,
                        outcome = ?report.outcome,
                        "uploaded, local copy removed"
                    ),
                    Err(e) => warn!(
                        file = %path.display(),
                        error = %e,
                        "uploaded, but failed to remove local copy"
                    ),
                }
            }
            Err(e) if e.is_skip() => {
                info!(file = %path.display(), reason = %e, "segment still changing, waiting for next event");
            }
            Err(UploadError::Cancelled) => {
                info!(file = %path.display(), "upload cancelled, local copy kept");
            }
            Err(e) => {
                summary.failed += 1;
                error!(
                    file = %path.display(),
                    size,
                    code = %e.code(),
                    error = %e,
                    "upload failed, local copy kept"
                );
                self.notify_failure(path, size, &e).await;
            }
        }
    }

    async fn notify_failure(&self, path: &Path, size: u64, err: &UploadError) {
        let summary = FailureSummary {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size_bytes: size,
            code: err.code(),
            message: err.to_string(),
            target_folder: self.pipeline.remote_folder().to_string(),
        };
        let notification = summary.to_notification();
        if let Err(e) = self.sink.notify(&notification).await {
            warn!(error = %e, "failed to deliver failure notification");
        }
    }
}
