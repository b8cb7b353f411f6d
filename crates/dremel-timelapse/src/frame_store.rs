//! Snapshot and timelapse frame storage
//!
//! Sessions live under `<config_dir>/<snapshot_root>/<session>/` and hold
//! frames named `0.jpeg`, `1.jpeg`, ... in write order. Playback order is the
//! numeric index, never the lexical filename order.

use crate::config::{TimelapseConfig, FRAME_EXTENSION};
use crate::folder::ensure_folder;
use crate::path_guard::{validate_filename, PathGuard};
use crate::result::TimelapseResult;
use image::{DynamicImage, ImageFormat};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A stored timelapse frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFrame {
    /// Numeric index parsed from the filename
    pub index: u64,
    /// Full path of the frame file
    pub path: PathBuf,
}

/// Parse the index of a frame filename such as `12.jpeg`
///
/// Returns `None` when the stem is not made of ASCII digits only.
#[must_use]
pub fn frame_index(file_name: &str) -> Option<u64> {
    let stem = file_name.strip_suffix(FRAME_EXTENSION)?.strip_suffix('.')?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// Index the next frame should use: one past the highest, or 0
#[must_use]
pub fn next_frame_index(frames: &[StoredFrame]) -> u64 {
    frames
        .iter()
        .map(|f| f.index)
        .max()
        .map_or(0, |max| max.saturating_add(1))
}

/// List the frames in `dir`, sorted by numeric index
///
/// `.jpeg` files without a numeric stem are skipped with a warning; other
/// files are ignored.
pub fn list_frames(dir: &Path) -> TimelapseResult<Vec<StoredFrame>> {
    let mut frames = Vec::new();
    let suffix = format!(".{FRAME_EXTENSION}");

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if !name.ends_with(&suffix) {
            continue;
        }
        match frame_index(name) {
            Some(index) => frames.push(StoredFrame {
                index,
                path: entry.path(),
            }),
            None => warn!(file = name, dir = %dir.display(), "skipping non-numeric frame file"),
        }
    }

    frames.sort_by_key(|f| f.index);
    Ok(frames)
}

/// Encode `image` as JPEG at `path`
///
/// JPEG carries no alpha channel, so the image is flattened to RGB first.
pub fn write_jpeg(path: &Path, image: &DynamicImage) -> TimelapseResult<()> {
    image.to_rgb8().save_with_format(path, ImageFormat::Jpeg)?;
    Ok(())
}

/// Filesystem store for snapshots and session frames
#[derive(Debug, Clone)]
pub struct FrameStore {
    guard: PathGuard,
    snapshot_root: String,
}

impl FrameStore {
    /// Create a store from configuration
    #[must_use]
    pub fn new(config: &TimelapseConfig) -> Self {
        Self {
            guard: config.path_guard(),
            snapshot_root: config.snapshot_root.clone(),
        }
    }

    /// Path guard used for every caller path
    #[must_use]
    pub fn guard(&self) -> &PathGuard {
        &self.guard
    }

    /// Resolved session root directory (not created)
    pub fn root_dir(&self) -> TimelapseResult<PathBuf> {
        self.guard.resolve(&self.snapshot_root)
    }

    /// Resolved folder for session `name` (not created)
    pub fn session_dir(&self, name: &str) -> TimelapseResult<PathBuf> {
        validate_filename(name)?;
        Ok(self.root_dir()?.join(name))
    }

    /// Ensure the session root exists and return the folder for `name`
    ///
    /// The session folder itself is left alone.
    pub fn prepare_session(&self, name: &str) -> TimelapseResult<PathBuf> {
        let root = self.root_dir()?;
        ensure_folder(&root, false)?;
        validate_filename(name)?;
        Ok(root.join(name))
    }

    /// Write a one-off snapshot as `<output_dir>/<name>.jpeg`
    ///
    /// # Errors
    ///
    /// `InvalidName` for unsafe names, path errors from the guard,
    /// `NotADirectory` if the output path is a file, codec errors unchanged.
    pub fn write_snapshot(
        &self,
        output_dir: &str,
        name: &str,
        image: &DynamicImage,
    ) -> TimelapseResult<PathBuf> {
        validate_filename(name)?;
        let output_dir = self.guard.resolve(output_dir)?;
        ensure_folder(&output_dir, false)?;

        let path = output_dir.join(format!("{name}.{FRAME_EXTENSION}"));
        write_jpeg(&path, image)?;
        debug!(path = %path.display(), "wrote snapshot");
        Ok(path)
    }

    /// Append a frame to session `session`, creating it on first use
    ///
    /// Index computation is a read-modify-write of the folder listing and is
    /// not atomic: concurrent appends to one session may collide.
    pub fn append(&self, session: &str, image: &DynamicImage) -> TimelapseResult<PathBuf> {
        let session_dir = self.prepare_session(session)?;
        ensure_folder(&session_dir, false)?;

        let frames = list_frames(&session_dir)?;
        let index = next_frame_index(&frames);
        let path = session_dir.join(format!("{index}.{FRAME_EXTENSION}"));
        write_jpeg(&path, image)?;
        debug!(session, index, path = %path.display(), "appended frame");
        Ok(path)
    }
}
