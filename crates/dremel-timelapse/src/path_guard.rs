//! Path and filename validation
//!
//! Every caller-supplied folder goes through [`PathGuard::resolve`] before
//! anything touches the filesystem. Relative paths are anchored to the config
//! directory; absolute paths must sit inside an allow-listed directory.

use crate::result::{TimelapseError, TimelapseResult};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

type PatternCell = OnceLock<Result<Regex, regex::Error>>;

/// Compile `pattern` once into `cell`
fn compiled(cell: &'static PatternCell, pattern: &str) -> TimelapseResult<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern))
        .as_ref()
        .map_err(|e| TimelapseError::Config {
            message: format!("invalid pattern {pattern:?}: {e}"),
        })
}

/// `~` or a run of two or more dots
fn traversal_pattern() -> TimelapseResult<&'static Regex> {
    static PATTERN: PatternCell = OnceLock::new();
    compiled(&PATTERN, r"~|\.\.+")
}

/// Characters and sequences that make a filename unsafe
fn unsafe_filename_pattern() -> TimelapseResult<&'static Regex> {
    static PATTERN: PatternCell = OnceLock::new();
    compiled(&PATTERN, r"~|\.\.|/|\\")
}

/// Reject paths containing `~` or `..`-style traversal sequences
pub fn validate_path(path: &str) -> TimelapseResult<()> {
    if path.is_empty() {
        return Err(TimelapseError::InvalidPath {
            path: path.to_string(),
            reason: "path is empty".to_string(),
        });
    }
    if let Some(m) = traversal_pattern()?.find(path) {
        return Err(TimelapseError::InvalidPath {
            path: path.to_string(),
            reason: format!("contains {:?}", m.as_str()),
        });
    }
    Ok(())
}

/// Reject names that are empty or contain `~`, `..`, `/` or `\`
pub fn validate_filename(name: &str) -> TimelapseResult<()> {
    if name.is_empty() {
        return Err(TimelapseError::InvalidName {
            name: name.to_string(),
            reason: "name is empty".to_string(),
        });
    }
    if let Some(m) = unsafe_filename_pattern()?.find(name) {
        return Err(TimelapseError::InvalidName {
            name: name.to_string(),
            reason: format!("contains {:?}", m.as_str()),
        });
    }
    Ok(())
}

/// Resolves caller paths against a base directory and an allow-list
#[derive(Debug, Clone)]
pub struct PathGuard {
    base_dir: PathBuf,
    allowlist: Vec<PathBuf>,
}

impl PathGuard {
    /// Create a guard anchored at `base_dir`
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>, allowlist: Vec<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            allowlist,
        }
    }

    /// Base directory relative paths resolve against
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Validate `candidate` and return the path to operate on
    ///
    /// # Errors
    ///
    /// `InvalidPath` for traversal sequences, `PathNotAllowed` for absolute
    /// paths outside the allow-list.
    pub fn resolve(&self, candidate: &str) -> TimelapseResult<PathBuf> {
        validate_path(candidate)?;

        let path = Path::new(candidate);
        if !path.is_absolute() {
            return Ok(self.base_dir.join(path));
        }
        if self.is_allowed_path(path) {
            Ok(path.to_path_buf())
        } else {
            Err(TimelapseError::PathNotAllowed {
                path: path.to_path_buf(),
            })
        }
    }

    /// Check whether `path` lies inside an allow-listed directory
    ///
    /// The path itself need not exist, but its parent must.
    #[must_use]
    pub fn is_allowed_path(&self, path: &Path) -> bool {
        let resolved = if path.exists() {
            path.canonicalize()
        } else {
            match path.parent() {
                Some(parent) => parent.canonicalize(),
                None => return false,
            }
        };
        let Ok(resolved) = resolved else {
            return false;
        };

        self.allowlist.iter().any(|allowed| {
            let allowed = allowed.canonicalize().unwrap_or_else(|_| allowed.clone());
            resolved.starts_with(allowed)
        })
    }
}
