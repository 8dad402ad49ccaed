use std::path::Path;

use crate::TransferError;

/// Derives the remote object name from a local path: its final component.
pub fn remote_name_for(path: &Path) -> Result<String, TransferError> {
    let name = path
        .file_name()
        .ok_or_else(|| {
            TransferError::InvalidPath(format!("no file name in {}", path.display()))
        })?
        .to_string_lossy()
        .into_owned();
    validate_remote_name(&name)?;
    Ok(name)
}

/// Validates that a name can be sent as a plain `STOR` argument.
///
/// Rejects:
/// - Empty names and `.`/`..`
/// - Path separators (`/` or `\`)
/// - CR or LF
pub fn validate_remote_name(name: &str) -> Result<(), TransferError> {
    if name.is_empty() {
        return Err(TransferError::InvalidPath("empty file name".into()));
    }
    if name == "." || name == ".." {
        return Err(TransferError::InvalidPath(format!(
            "not a file name: {name}"
        )));
    }
    if name.contains(['/', '\\']) {
        return Err(TransferError::InvalidPath(format!(
            "path separator not allowed: {name}"
        )));
    }
    if name.contains(['\r', '\n']) {
        return Err(TransferError::InvalidPath(format!(
            "line break not allowed: {name:?}"
        )));
    }
    Ok(())
}
