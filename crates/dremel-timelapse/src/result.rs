//! Result and error types for the timelapse toolkit.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for timelapse operations
pub type TimelapseResult<T> = Result<T, TimelapseError>;

/// Errors that can occur while capturing, storing or assembling frames
#[derive(Debug, Error)]
pub enum TimelapseError {
    /// Path contains a traversal sequence or is otherwise malformed
    #[error("Invalid path {path}: {reason}")]
    InvalidPath {
        /// Offending path as supplied by the caller
        path: String,
        /// Why it was rejected
        reason: String,
    },

    /// Absolute path outside every allow-listed directory
    #[error("Path not allowed: {path}")]
    PathNotAllowed {
        /// Offending path
        path: PathBuf,
    },

    /// An existing filesystem node is not a directory
    #[error("{path} is not a folder")]
    NotADirectory {
        /// Offending path
        path: PathBuf,
    },

    /// Output or session name is not a safe filename
    #[error("Invalid name {name:?}: {reason}")]
    InvalidName {
        /// Offending name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Session folder does not exist
    #[error("Folder {path} does not exist")]
    SessionNotFound {
        /// Expected session folder
        path: PathBuf,
    },

    /// Session folder holds no frames
    #[error("Folder {path} has no snapshots")]
    EmptySession {
        /// Session folder
        path: PathBuf,
    },

    /// Both fps and duration were supplied
    #[error("You should specify exactly one of FPS or Duration")]
    AmbiguousRate,

    /// Frame rate or duration is not a positive number
    #[error("Invalid frame timing: {message}")]
    InvalidRate {
        /// Error message
        message: String,
    },

    /// Image processing error (resizing, dimension limits)
    #[error("Image processing failed: {message}")]
    ImageProcessing {
        /// Error message
        message: String,
    },

    /// Image codec error
    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    /// GIF encoder error
    #[error("GIF encoding error: {0}")]
    GifEncoding(#[from] gif::EncodingError),

    /// Device id not present in the registry
    #[error("Invalid device ID: {device_id}")]
    UnknownDevice {
        /// Requested device id
        device_id: String,
    },

    /// Device has no config entries
    #[error("No config entries for device ID: {device_id}")]
    NoConfigEntry {
        /// Requested device id
        device_id: String,
    },

    /// Config entry has no live printer connection
    #[error("No printer connection for config entry: {entry_id}")]
    NoConnection {
        /// Config entry id
        entry_id: String,
    },

    /// Neither a usable gcode file nor a gcode URL was supplied
    #[error("No valid .gcode file or URL to print: {message}")]
    InvalidPrintSource {
        /// Error message
        message: String,
    },

    /// Printer library reported a failure
    #[error("Printer error: {message}")]
    Printer {
        /// Error message
        message: String,
    },

    /// Blocking worker task panicked or was cancelled
    #[error("Worker task failed: {message}")]
    Worker {
        /// Error message
        message: String,
    },

    /// Configuration could not be loaded
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TimelapseError {
    /// Create a printer error
    #[must_use]
    pub fn printer(message: impl Into<String>) -> Self {
        Self::Printer {
            message: message.into(),
        }
    }

    /// Create an invalid rate error
    #[must_use]
    pub fn invalid_rate(message: impl Into<String>) -> Self {
        Self::InvalidRate {
            message: message.into(),
        }
    }

    /// Create an image processing error
    #[must_use]
    pub fn image_processing(message: impl Into<String>) -> Self {
        Self::ImageProcessing {
            message: message.into(),
        }
    }
}

impl From<serde_yaml_ng::Error> for TimelapseError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}
