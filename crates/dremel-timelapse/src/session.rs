//! Session catalog
//!
//! Sessions whose GIF was never assembled stay on disk. The catalog lists
//! them and discards them on request.

use crate::config::TimelapseConfig;
use crate::frame_store::{list_frames, FrameStore};
use crate::result::{TimelapseError, TimelapseResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// One session folder under the snapshot root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session name
    pub name: String,
    /// Session folder
    pub path: PathBuf,
    /// Number of numbered frames
    pub frame_count: usize,
}

/// Lists and discards sessions
#[derive(Debug, Clone)]
pub struct SessionCatalog {
    store: FrameStore,
}

impl SessionCatalog {
    /// Create a catalog from configuration
    #[must_use]
    pub fn new(config: &TimelapseConfig) -> Self {
        Self {
            store: FrameStore::new(config),
        }
    }

    /// All sessions, sorted by name; empty when the root does not exist yet
    pub fn list_sessions(&self) -> TimelapseResult<Vec<SessionSummary>> {
        let root = self.store.root_dir()?;
        if !root.is_dir() {
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();
        for entry in fs::read_dir(&root)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let frame_count = list_frames(&path)?.len();
            sessions.push(SessionSummary {
                name,
                path,
                frame_count,
            });
        }

        sessions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sessions)
    }

    /// Delete session `name` and its frames
    ///
    /// Unlike post-assembly cleanup, failures here are reported.
    pub fn discard_session(&self, name: &str) -> TimelapseResult<PathBuf> {
        let path = self.store.session_dir(name)?;
        if !path.exists() {
            return Err(TimelapseError::SessionNotFound { path });
        }
        if !path.is_dir() {
            return Err(TimelapseError::NotADirectory { path });
        }
        fs::remove_dir_all(&path)?;
        info!(session = name, "discarded session");
        Ok(path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::frame_store::tests::solid;

    #[test]
    fn test_list_without_root() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = SessionCatalog::new(&TimelapseConfig::new(dir.path()));
        assert!(catalog.list_sessions().unwrap().is_empty());
    }

    #[test]
    fn test_list_counts_frames() {
        let dir = tempfile::tempdir().unwrap();
        let config = TimelapseConfig::new(dir.path());
        let store = FrameStore::new(&config);
        for _ in 0..3 {
            store.append("benchy", &solid(4, 4, [0, 0, 0])).unwrap();
        }
        store.append("anchor", &solid(4, 4, [0, 0, 0])).unwrap();
        fs::write(store.root_dir().unwrap().join("stray.txt"), b"x").unwrap();

        let sessions = SessionCatalog::new(&config).list_sessions().unwrap();
        let summary: Vec<(&str, usize)> = sessions
            .iter()
            .map(|s| (s.name.as_str(), s.frame_count))
            .collect();
        assert_eq!(summary, vec![("anchor", 1), ("benchy", 3)]);
    }

    #[test]
    fn test_discard_session() {
        let dir = tempfile::tempdir().unwrap();
        let config = TimelapseConfig::new(dir.path());
        let store = FrameStore::new(&config);
        store.append("stale", &solid(4, 4, [0, 0, 0])).unwrap();

        let catalog = SessionCatalog::new(&config);
        let removed = catalog.discard_session("stale").unwrap();
        assert!(!removed.exists());
        assert!(matches!(
            catalog.discard_session("stale"),
            Err(TimelapseError::SessionNotFound { .. })
        ));
    }

    #[test]
    fn test_discard_rejects_unsafe_name() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = SessionCatalog::new(&TimelapseConfig::new(dir.path()));
        assert!(matches!(
            catalog.discard_session(".."),
            Err(TimelapseError::InvalidName { .. })
        ));
    }
}
