//! Directory watch queue for finished segments.
//!
//! [`UploadQueueWatcher`] consumes write-complete events from the segment
//! directory one file at a time: upload, then delete the local copy on
//! success or keep it and notify on failure.

mod error;
mod filter;
mod queue;
mod watcher;

pub use error::WatchError;
pub use filter::{SegmentFilter, scan_existing};
pub use queue::UploadQueue;
pub use watcher::{UploadQueueWatcher, UploadSummary, completed_paths};
