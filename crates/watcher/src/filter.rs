use std::path::{Path, PathBuf};

/// Suffixes recorders use while a file is still being written.
const PARTIAL_SUFFIXES: &[&str] = &[".part", ".tmp"];

/// Decides which files in the segment directory are upload candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentFilter {
    /// Lowercase extension without the dot; `None` accepts any extension.
    extension: Option<String>,
}

impl SegmentFilter {
    pub fn new(extension: Option<&str>) -> Self {
        let extension = extension
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty());
        Self { extension }
    }

    /// Name-based check; does not touch the filesystem.
    pub fn accepts(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if name.starts_with('.') {
            return false;
        }
        let lower = name.to_ascii_lowercase();
        if PARTIAL_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
            return false;
        }
        match &self.extension {
            None => true,
            Some(ext) => path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(ext)),
        }
    }
}

/// Lists accepted regular files in `dir`, sorted by name.
///
/// Segment names carry a sortable timestamp, so name order is recording
/// order.
pub fn scan_existing(dir: &Path, filter: &SegmentFilter) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .map(|entry| entry.path())
        .filter(|path| filter.accepts(path))
        .collect();
    files.sort();
    Ok(files)
}
