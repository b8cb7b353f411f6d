//! Timelapse configuration
//!
//! Mirrors the pieces of host configuration the toolkit depends on: the
//! config directory relative paths are anchored to, the allow-list for
//! absolute paths, and the encoding and worker settings.

use crate::media::{FrameTiming, GifConfig};
use crate::path_guard::PathGuard;
use crate::result::{TimelapseError, TimelapseResult};
use crate::services::{ErrorPolicy, ServiceKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Hidden folder under the config dir that holds every session
pub const SNAPSHOTS_MAIN_FOLDER: &str = ".dremel_3d_printer";

/// Extension of stored frames and snapshots
pub const FRAME_EXTENSION: &str = "jpeg";

/// Frame rate used when neither fps nor duration is supplied
pub const DEFAULT_FPS: f64 = 10.0;

/// Toolkit configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelapseConfig {
    /// Base directory relative paths resolve against
    pub config_dir: PathBuf,
    /// Absolute directories callers may read and write
    pub allowlist_external_dirs: Vec<PathBuf>,
    /// Session root folder name, relative to `config_dir`
    pub snapshot_root: String,
    /// Frame rate when the caller gives no timing
    pub default_fps: f64,
    /// GIF palette quality (1-100)
    pub gif_quality: u8,
    /// Upper bound on blocking worker threads
    pub worker_threads: usize,
    /// Per-service overrides of the error policy
    pub error_policy: BTreeMap<ServiceKind, ErrorPolicy>,
}

impl Default for TimelapseConfig {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("."),
            allowlist_external_dirs: Vec::new(),
            snapshot_root: SNAPSHOTS_MAIN_FOLDER.to_string(),
            default_fps: DEFAULT_FPS,
            gif_quality: 80,
            worker_threads: 4,
            error_policy: BTreeMap::new(),
        }
    }
}

impl TimelapseConfig {
    /// Create a configuration anchored at `config_dir`
    #[must_use]
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            ..Default::default()
        }
    }

    /// Allow absolute paths under `dir`
    #[must_use]
    pub fn with_allowed_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.allowlist_external_dirs.push(dir.into());
        self
    }

    /// Set the session root folder name
    #[must_use]
    pub fn with_snapshot_root(mut self, root: impl Into<String>) -> Self {
        self.snapshot_root = root.into();
        self
    }

    /// Set the default frame rate
    #[must_use]
    pub fn with_default_fps(mut self, fps: f64) -> Self {
        self.default_fps = fps;
        self
    }

    /// Set GIF quality (1-100)
    #[must_use]
    pub fn with_gif_quality(mut self, quality: u8) -> Self {
        self.gif_quality = quality.clamp(1, 100);
        self
    }

    /// Set the blocking worker bound (at least 1)
    #[must_use]
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.max(1);
        self
    }

    /// Override the error policy for one service
    #[must_use]
    pub fn with_error_policy(mut self, kind: ServiceKind, policy: ErrorPolicy) -> Self {
        self.error_policy.insert(kind, policy);
        self
    }

    /// Join `relative` onto the config dir
    #[must_use]
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.config_dir.join(relative)
    }

    /// Path guard for this configuration
    #[must_use]
    pub fn path_guard(&self) -> PathGuard {
        PathGuard::new(&self.config_dir, self.allowlist_external_dirs.clone())
    }

    /// Effective error policy for `kind`
    #[must_use]
    pub fn policy_for(&self, kind: ServiceKind) -> ErrorPolicy {
        self.error_policy
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_policy())
    }

    /// GIF encoder settings for `timing`
    #[must_use]
    pub fn gif_config(&self, timing: FrameTiming) -> GifConfig {
        GifConfig::new(timing).with_quality(self.gif_quality)
    }

    /// Parse configuration from YAML
    pub fn from_yaml_str(yaml: &str) -> TimelapseResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> TimelapseResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Render configuration as YAML
    pub fn to_yaml(&self) -> TimelapseResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    fn validate(&self) -> TimelapseResult<()> {
        if !(self.default_fps.is_finite() && self.default_fps > 0.0) {
            return Err(TimelapseError::Config {
                message: format!("default_fps must be positive, got {}", self.default_fps),
            });
        }
        if self.snapshot_root.trim().is_empty() {
            return Err(TimelapseError::Config {
                message: "snapshot_root must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
