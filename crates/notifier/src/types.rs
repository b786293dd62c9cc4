use chrono::{DateTime, Utc};
use serde::Serialize;

/// Payload delivered to a sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            timestamp: Utc::now(),
        }
    }
}

/// What went wrong with one segment, as reported to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureSummary {
    pub file_name: String,
    pub size_bytes: u64,
    pub code: String,
    pub message: String,
    pub target_folder: String,
}

impl FailureSummary {
    pub fn to_notification(&self) -> Notification {
        Notification::new(
            format!("Upload failed: {}", self.file_name),
            format!(
                "file: {}\nsize: {} bytes\ncode: {}\nmessage: {}\ntarget: {}\nThe file was kept locally.",
                self.file_name, self.size_bytes, self.code, self.message, self.target_folder
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> FailureSummary {
        FailureSummary {
            file_name: "20260101_120000.mp4".into(),
            size_bytes: 524_288_000,
            code: "4000023".into(),
            message: "precreate rejected".into(),
            target_folder: "/recordings".into(),
        }
    }

    #[test]
    fn notification_carries_every_summary_field() {
        let n = summary().to_notification();
        assert_eq!(n.title, "Upload failed: 20260101_120000.mp4");
        for needle in ["524288000", "4000023", "precreate rejected", "/recordings"] {
            assert!(n.body.contains(needle), "body missing {needle}: {}", n.body);
        }
    }

    #[test]
    fn serializes_title_body_timestamp() {
        let n = summary().to_notification();
        let value = serde_json::to_value(&n).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert!(obj["timestamp"].as_str().unwrap().contains('T'));
        assert_eq!(obj["title"], n.title);
    }
}
