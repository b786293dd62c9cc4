//! Failure notifications.
//!
//! The watcher reports each failed segment once through a
//! [`NotificationSink`]. [`WebhookNotifier`] posts a small JSON document to
//! an operator endpoint; [`LogNotifier`] only writes a log line and is used
//! when no endpoint is configured.

mod sink;
mod types;

pub use sink::{LogNotifier, NotificationSink, NotifyFuture, WebhookNotifier};
pub use types::{FailureSummary, Notification};

/// Errors produced while delivering a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned status {status}: {body}")]
    Status { status: u16, body: String },
}
