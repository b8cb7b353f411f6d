//! Printer abstraction and device registry
//!
//! The printer-control library is an external collaborator; [`PrinterApi`]
//! is the seam. Its calls block on the network, so the service layer always
//! runs them on the worker pool.
//!
//! ```text
//! device id ──► DeviceEntry { config entries } ──► first entry ──► Arc<dyn PrinterApi>
//! ```

use crate::result::{TimelapseError, TimelapseResult};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Statistics returned by the printer when a job starts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrintStats(pub serde_json::Map<String, serde_json::Value>);

impl PrintStats {
    /// Stats with a single field, mostly for tests and doubles
    #[must_use]
    pub fn with_field(key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        let mut map = serde_json::Map::new();
        map.insert(key.into(), value.into());
        Self(map)
    }
}

/// Blocking client for one printer
pub trait PrinterApi: Send + Sync {
    /// Upload and start a local gcode file
    fn start_print_from_file(&self, path: &Path) -> TimelapseResult<PrintStats>;

    /// Start a gcode file the printer downloads from `url`
    fn start_print_from_url(&self, url: &str) -> TimelapseResult<PrintStats>;

    /// Pause the running job
    fn pause_print(&self) -> TimelapseResult<()>;

    /// Resume the paused job
    fn resume_print(&self) -> TimelapseResult<()>;

    /// Cancel the running job
    fn stop_print(&self) -> TimelapseResult<()>;

    /// Name of the current (or last) job
    fn job_name(&self) -> TimelapseResult<String>;

    /// Grab one camera frame
    fn capture_snapshot(&self) -> TimelapseResult<DynamicImage>;
}

/// A registered device and the config entries that own it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceEntry {
    /// Config entry ids, first one wins
    pub config_entries: Vec<String>,
}

/// Device id → printer connection lookup table
///
/// Passed explicitly to the service layer instead of living in global state.
#[derive(Default, Clone)]
pub struct DeviceRegistry {
    devices: HashMap<String, DeviceEntry>,
    connections: HashMap<String, Arc<dyn PrinterApi>>,
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("devices", &self.devices)
            .field("connections", &self.connections.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DeviceRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `device_id` under a single config entry with its connection
    pub fn register(
        &mut self,
        device_id: impl Into<String>,
        entry_id: impl Into<String>,
        api: Arc<dyn PrinterApi>,
    ) {
        let entry_id = entry_id.into();
        self.devices
            .entry(device_id.into())
            .or_default()
            .config_entries
            .push(entry_id.clone());
        self.connections.insert(entry_id, api);
    }

    /// Register a device with an explicit entry list (connections added separately)
    pub fn insert_device(&mut self, device_id: impl Into<String>, entry: DeviceEntry) {
        self.devices.insert(device_id.into(), entry);
    }

    /// Attach a connection to a config entry
    pub fn insert_connection(&mut self, entry_id: impl Into<String>, api: Arc<dyn PrinterApi>) {
        self.connections.insert(entry_id.into(), api);
    }

    /// Number of registered devices
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Check if no device is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Connection for `device_id`
    ///
    /// # Errors
    ///
    /// `UnknownDevice`, `NoConfigEntry` or `NoConnection`.
    pub fn api(&self, device_id: &str) -> TimelapseResult<Arc<dyn PrinterApi>> {
        let entry = self
            .devices
            .get(device_id)
            .ok_or_else(|| TimelapseError::UnknownDevice {
                device_id: device_id.to_string(),
            })?;
        let entry_id =
            entry
                .config_entries
                .first()
                .ok_or_else(|| TimelapseError::NoConfigEntry {
                    device_id: device_id.to_string(),
                })?;
        self.connections
            .get(entry_id)
            .cloned()
            .ok_or_else(|| TimelapseError::NoConnection {
                entry_id: entry_id.clone(),
            })
    }
}

/// In-memory printer double that records every call
#[derive(Debug, Default)]
pub struct MockPrinter {
    /// Job name reported by `job_name`
    pub job_name: String,
    /// Frame returned by `capture_snapshot`
    pub snapshot: Option<DynamicImage>,
    /// Stats returned when a print starts
    pub stats: PrintStats,
    /// Make every call fail with this message
    pub failure: Option<String>,
    /// Call history for verification
    pub call_history: Mutex<Vec<String>>,
}

impl MockPrinter {
    /// Create a printer double running `job_name`
    #[must_use]
    pub fn new(job_name: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            ..Default::default()
        }
    }

    /// Set the frame returned by the camera
    #[must_use]
    pub fn with_snapshot(mut self, image: DynamicImage) -> Self {
        self.snapshot = Some(image);
        self
    }

    /// Set the stats returned by print starts
    #[must_use]
    pub fn with_stats(mut self, stats: PrintStats) -> Self {
        self.stats = stats;
        self
    }

    /// Make every call fail
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Recorded calls
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.call_history
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, call: String) -> TimelapseResult<()> {
        if let Ok(mut calls) = self.call_history.lock() {
            calls.push(call);
        }
        match &self.failure {
            Some(message) => Err(TimelapseError::printer(message.clone())),
            None => Ok(()),
        }
    }
}

impl PrinterApi for MockPrinter {
    fn start_print_from_file(&self, path: &Path) -> TimelapseResult<PrintStats> {
        self.record(format!("start_file:{}", path.display()))?;
        Ok(self.stats.clone())
    }

    fn start_print_from_url(&self, url: &str) -> TimelapseResult<PrintStats> {
        self.record(format!("start_url:{url}"))?;
        Ok(self.stats.clone())
    }

    fn pause_print(&self) -> TimelapseResult<()> {
        self.record("pause".to_string())
    }

    fn resume_print(&self) -> TimelapseResult<()> {
        self.record("resume".to_string())
    }

    fn stop_print(&self) -> TimelapseResult<()> {
        self.record("stop".to_string())
    }

    fn job_name(&self) -> TimelapseResult<String> {
        self.record("job_name".to_string())?;
        Ok(self.job_name.clone())
    }

    fn capture_snapshot(&self) -> TimelapseResult<DynamicImage> {
        self.record("snapshot".to_string())?;
        self.snapshot
            .clone()
            .ok_or_else(|| TimelapseError::printer("camera returned no frame"))
    }
}
