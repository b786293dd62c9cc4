/// Errors that stop the watcher itself (never a single file's failure).
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("file watch error: {0}")]
    Notify(#[from] notify::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a directory: {0}")]
    NotADirectory(String),
}
