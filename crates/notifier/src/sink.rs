use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, warn};

use crate::NotifyError;
use crate::types::Notification;

/// Boxed future returned by [`NotificationSink::notify`].
pub type NotifyFuture<'a> = Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + 'a>>;

/// Destination for failure notifications.
///
/// Callers log a delivery error and carry on; it is never escalated.
pub trait NotificationSink: Send + Sync {
    fn notify<'a>(&'a self, notification: &'a Notification) -> NotifyFuture<'a>;
}

/// Posts notifications as JSON to a webhook URL.
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, url))
    }

    pub fn with_client(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    async fn post(&self, notification: &Notification) -> Result<(), NotifyError> {
        let resp = self.http.post(&self.url).json(notification).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }
        debug!(title = %notification.title, "notification delivered");
        Ok(())
    }
}

impl NotificationSink for WebhookNotifier {
    fn notify<'a>(&'a self, notification: &'a Notification) -> NotifyFuture<'a> {
        Box::pin(self.post(notification))
    }
}

/// Writes notifications to the log only.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify<'a>(&'a self, notification: &'a Notification) -> NotifyFuture<'a> {
        warn!(
            title = %notification.title,
            body = %notification.body,
            timestamp = %notification.timestamp.to_rfc3339(),
            "notification"
        );
        Box::pin(async { Ok(()) })
    }
}
