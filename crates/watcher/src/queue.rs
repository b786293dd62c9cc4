use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;

/// FIFO of pending files; a path already waiting is not queued twice.
#[derive(Debug, Default)]
pub struct UploadQueue {
    order: VecDeque<PathBuf>,
    queued: HashSet<PathBuf>,
}

impl UploadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if `path` was already waiting.
    pub fn push(&mut self, path: PathBuf) -> bool {
        if !self.queued.insert(path.clone()) {
            return false;
        }
        self.order.push_back(path);
        true
    }

    pub fn pop(&mut self) -> Option<PathBuf> {
        let path = self.order.pop_front()?;
        self.queued.remove(&path);
        Some(path)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
