//! Folder setup helpers.

use crate::result::{TimelapseError, TimelapseResult};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Make sure `path` is a directory, optionally emptying it first.
///
/// Creation is not recursive: the parent must already exist.
///
/// # Errors
///
/// `NotADirectory` if a non-directory node sits at `path`, `Io` if the
/// directory cannot be created.
pub fn ensure_folder(path: &Path, clear: bool) -> TimelapseResult<()> {
    if path.exists() {
        if !path.is_dir() {
            return Err(TimelapseError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        if !clear {
            return Ok(());
        }
        remove_folder_best_effort(path);
    }
    fs::create_dir(path)?;
    debug!(path = %path.display(), "created folder");
    Ok(())
}

/// Recursively delete `path`, ignoring failures.
///
/// Cleanup is advisory: callers must not treat the folder's absence as a
/// correctness signal.
pub fn remove_folder_best_effort(path: &Path) {
    if let Err(e) = fs::remove_dir_all(path) {
        debug!(path = %path.display(), error = %e, "ignoring folder cleanup failure");
    }
}
