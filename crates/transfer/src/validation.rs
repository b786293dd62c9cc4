use std::path::{Component, Path};

use crate::TransferError;

/// Validates that a segment name is a single plain file name.
///
/// Rejects:
/// - Empty names
/// - Names containing `/` or `\`
/// - `.` and `..`
pub fn validate_segment_name(name: &str) -> Result<(), TransferError> {
    if name.is_empty() {
        return Err(TransferError::InvalidPath("empty segment name".into()));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(TransferError::InvalidPath(format!(
            "segment name must not contain separators: {name}"
        )));
    }
    if name == "." || name == ".." {
        return Err(TransferError::InvalidPath(format!(
            "segment name not allowed: {name}"
        )));
    }
    Ok(())
}

/// Validates a remote folder: absolute, `/`-separated, no traversal.
pub fn validate_remote_folder(folder: &str) -> Result<(), TransferError> {
    if !folder.starts_with('/') {
        return Err(TransferError::InvalidPath(format!(
            "remote folder must be absolute: {folder}"
        )));
    }

    for component in Path::new(folder).components() {
        match component {
            Component::ParentDir => {
                return Err(TransferError::InvalidPath(format!(
                    "parent directory traversal not allowed: {folder}"
                )));
            }
            Component::Prefix(_) => {
                return Err(TransferError::InvalidPath(format!(
                    "path prefix not allowed: {folder}"
                )));
            }
            Component::RootDir | Component::CurDir | Component::Normal(_) => {}
        }
    }

    Ok(())
}

/// Joins a remote folder and a segment name into the remote file path.
pub fn remote_path_for(folder: &str, name: &str) -> Result<String, TransferError> {
    validate_remote_folder(folder)?;
    validate_segment_name(name)?;
    let folder = folder.trim_end_matches('/');
    Ok(format!("{folder}/{name}"))
}
