//! Service facade
//!
//! Maps service invocations onto the printer registry and the timelapse
//! core. Every blocking step (printer calls, disk, codecs) goes through
//! [`run_blocking`] and is awaited before the next one.
//!
//! Failures are returned as `TimelapseResult`; [`Services::dispatch`] then
//! applies the per-service [`ErrorPolicy`] so the log-or-raise decision is
//! visible in one place.

use crate::config::TimelapseConfig;
use crate::frame_store::FrameStore;
use crate::media::{AssembledGif, FrameTiming, GifAssembler};
use crate::path_guard::PathGuard;
use crate::printer::{DeviceRegistry, PrintStats, PrinterApi};
use crate::result::{TimelapseError, TimelapseResult};
use crate::worker::run_blocking;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Event name published after a print starts
pub const EVENT_NEW_PRINT_STATS: &str = "dremel_3d_printer_new_print_stats";

const EVENT_CAPACITY: usize = 16;

/// Services exposed to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// Start a print from a file or URL
    PrintJob,
    /// Pause the running print
    PauseJob,
    /// Resume a paused print
    ResumeJob,
    /// Cancel the running print
    StopJob,
    /// Save one camera frame
    TakeSnapshot,
    /// Append one camera frame to a session
    AddSnapshotToGif,
    /// Assemble a session into a GIF
    MakeGif,
}

impl ServiceKind {
    /// Every service, in registration order
    pub const ALL: [Self; 7] = [
        Self::PrintJob,
        Self::PauseJob,
        Self::ResumeJob,
        Self::StopJob,
        Self::TakeSnapshot,
        Self::AddSnapshotToGif,
        Self::MakeGif,
    ];

    /// Service name as registered with the host
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PrintJob => "print_job",
            Self::PauseJob => "pause_job",
            Self::ResumeJob => "resume_job",
            Self::StopJob => "stop_job",
            Self::TakeSnapshot => "take_snapshot",
            Self::AddSnapshotToGif => "add_snapshot_to_gif",
            Self::MakeGif => "make_gif",
        }
    }

    /// Policy applied when the configuration has no override
    ///
    /// Print-job control failures are logged; snapshot and GIF failures
    /// fail the call.
    #[must_use]
    pub const fn default_policy(self) -> ErrorPolicy {
        match self {
            Self::PrintJob | Self::PauseJob | Self::ResumeJob | Self::StopJob => ErrorPolicy::Log,
            Self::TakeSnapshot | Self::AddSnapshotToGif | Self::MakeGif => ErrorPolicy::Propagate,
        }
    }
}

/// What `dispatch` does with a failed call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Log the error and report success
    Log,
    /// Fail the call
    Propagate,
}

/// A service invocation with its parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "service", rename_all = "snake_case")]
pub enum ServiceCall {
    /// `print_job`
    PrintJob {
        /// Target device
        device_id: String,
        /// Local gcode file
        filepath: Option<String>,
        /// Remote gcode URL
        url: Option<String>,
    },
    /// `pause_job`
    PauseJob {
        /// Target device
        device_id: String,
    },
    /// `resume_job`
    ResumeJob {
        /// Target device
        device_id: String,
    },
    /// `stop_job`
    StopJob {
        /// Target device
        device_id: String,
    },
    /// `take_snapshot`
    TakeSnapshot {
        /// Target device
        device_id: String,
        /// Folder the snapshot is written to
        output_dir: String,
    },
    /// `add_snapshot_to_gif`
    AddSnapshotToGif {
        /// Target device
        device_id: String,
        /// Session name, defaults to the job name
        name: Option<String>,
    },
    /// `make_gif`
    MakeGif {
        /// Target device
        device_id: String,
        /// Folder the GIF is written to
        output_dir: String,
        /// Session name, defaults to the job name
        name: Option<String>,
        /// Frames per second
        fps: Option<String>,
        /// Seconds per frame
        duration: Option<String>,
    },
}

impl ServiceCall {
    /// Service this call targets
    #[must_use]
    pub const fn kind(&self) -> ServiceKind {
        match self {
            Self::PrintJob { .. } => ServiceKind::PrintJob,
            Self::PauseJob { .. } => ServiceKind::PauseJob,
            Self::ResumeJob { .. } => ServiceKind::ResumeJob,
            Self::StopJob { .. } => ServiceKind::StopJob,
            Self::TakeSnapshot { .. } => ServiceKind::TakeSnapshot,
            Self::AddSnapshotToGif { .. } => ServiceKind::AddSnapshotToGif,
            Self::MakeGif { .. } => ServiceKind::MakeGif,
        }
    }
}

/// Events published by the services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PrintEvent {
    /// A print started; carries the printer's stats
    NewPrintStats {
        /// Device that started printing
        device_id: String,
        /// Stats reported by the printer
        stats: PrintStats,
    },
}

impl PrintEvent {
    /// Event name on the host bus
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NewPrintStats { .. } => EVENT_NEW_PRINT_STATS,
        }
    }
}

/// Accept `digits` with at most one `.`, e.g. `10`, `2.5`, `.5`
fn is_decimal(value: &str) -> bool {
    let digits = value.replacen('.', "", 1);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn parse_decimal(label: &str, value: &str) -> TimelapseResult<f64> {
    if !is_decimal(value) {
        return Err(TimelapseError::invalid_rate(format!(
            "{label} must be a numeric value, got {value:?}"
        )));
    }
    value
        .parse()
        .map_err(|e| TimelapseError::invalid_rate(format!("{label} {value:?}: {e}")))
}

/// Resolve caller-supplied fps/duration strings into one frame timing
///
/// # Errors
///
/// `AmbiguousRate` when both are given; `InvalidRate` when the value is not
/// a positive decimal number.
pub fn parse_rate(
    fps: Option<&str>,
    duration: Option<&str>,
    default_fps: f64,
) -> TimelapseResult<FrameTiming> {
    let timing = match (fps, duration) {
        (Some(_), Some(_)) => return Err(TimelapseError::AmbiguousRate),
        (None, None) => FrameTiming::Fps(default_fps),
        (Some(fps), None) => FrameTiming::Fps(parse_decimal("FPS", fps)?),
        (None, Some(duration)) => FrameTiming::Duration(parse_decimal("Duration", duration)?),
    };
    timing.validate()
}

/// Snapshot name for `now`, e.g. `2026-10-17 08:30:00.123456`
#[must_use]
pub fn snapshot_name(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// Check that `path` is an allow-listed regular file
fn file_exists(guard: &PathGuard, path: &Path) -> bool {
    if !guard.is_allowed_path(path) {
        warn!(path = %path.display(), "path not allowed");
        return false;
    }
    if !path.is_file() {
        warn!(path = %path.display(), "not a file");
        return false;
    }
    true
}

fn is_gcode(name: &str) -> bool {
    name.to_lowercase().ends_with(".gcode")
}

/// Service facade over the registry and the timelapse core
#[derive(Debug)]
pub struct Services {
    config: TimelapseConfig,
    registry: DeviceRegistry,
    store: FrameStore,
    assembler: GifAssembler,
    events: broadcast::Sender<PrintEvent>,
}

impl Services {
    /// Create the facade with an explicit device registry
    #[must_use]
    pub fn new(config: TimelapseConfig, registry: DeviceRegistry) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store: FrameStore::new(&config),
            assembler: GifAssembler::new(&config),
            config,
            registry,
            events,
        }
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &TimelapseConfig {
        &self.config
    }

    /// Subscribe to print events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PrintEvent> {
        self.events.subscribe()
    }

    fn api(&self, device_id: &str) -> TimelapseResult<Arc<dyn PrinterApi>> {
        self.registry.api(device_id)
    }

    async fn session_name(
        &self,
        api: &Arc<dyn PrinterApi>,
        name: Option<&str>,
    ) -> TimelapseResult<String> {
        if let Some(name) = name {
            return Ok(name.to_string());
        }
        let api = Arc::clone(api);
        run_blocking("job_name", move || api.job_name()).await
    }

    async fn capture(&self, api: &Arc<dyn PrinterApi>) -> TimelapseResult<image::DynamicImage> {
        let api = Arc::clone(api);
        run_blocking("capture_snapshot", move || api.capture_snapshot()).await
    }

    /// Capture one frame and save it as `<output_dir>/<timestamp>.jpeg`
    pub async fn take_snapshot(&self, device_id: &str, output_dir: &str) -> TimelapseResult<PathBuf> {
        let api = self.api(device_id)?;
        let image = self.capture(&api).await?;

        let store = self.store.clone();
        let output_dir = output_dir.to_string();
        let name = snapshot_name(Local::now());
        let path = run_blocking("write_snapshot", move || {
            store.write_snapshot(&output_dir, &name, &image)
        })
        .await?;
        info!(device_id, path = %path.display(), "snapshot saved");
        Ok(path)
    }

    /// Capture one frame and append it to session `name` (default: job name)
    pub async fn add_snapshot_to_gif(
        &self,
        device_id: &str,
        name: Option<&str>,
    ) -> TimelapseResult<PathBuf> {
        let api = self.api(device_id)?;
        let image = self.capture(&api).await?;
        let session = self.session_name(&api, name).await?;

        let store = self.store.clone();
        let path = run_blocking("append_frame", move || store.append(&session, &image)).await?;
        debug!(device_id, path = %path.display(), "frame added");
        Ok(path)
    }

    /// Assemble session `name` (default: job name) into `<output_dir>/<name>.gif`
    ///
    /// Exactly one of `fps` and `duration` may be given; with neither the
    /// configured default frame rate applies.
    pub async fn make_gif(
        &self,
        device_id: &str,
        output_dir: &str,
        name: Option<&str>,
        fps: Option<&str>,
        duration: Option<&str>,
    ) -> TimelapseResult<AssembledGif> {
        let api = self.api(device_id)?;
        let session = self.session_name(&api, name).await?;
        let timing = parse_rate(fps, duration, self.config.default_fps)?;

        let assembler = self.assembler.clone();
        let output_dir = output_dir.to_string();
        run_blocking("assemble_gif", move || {
            assembler.assemble(&session, &output_dir, timing)
        })
        .await
    }

    /// Start a print from an allow-listed `.gcode` file or a `.gcode` URL
    ///
    /// The file wins when both are usable. Publishes
    /// [`PrintEvent::NewPrintStats`] on success.
    pub async fn print_job(
        &self,
        device_id: &str,
        filepath: Option<&str>,
        url: Option<&str>,
    ) -> TimelapseResult<PrintStats> {
        let api = self.api(device_id)?;
        let guard = self.store.guard().clone();
        let filepath = filepath.map(PathBuf::from);
        let url = url.map(str::to_string);

        let stats = run_blocking("start_print", move || {
            if let Some(path) = filepath
                .as_deref()
                .filter(|p| is_gcode(&p.to_string_lossy()) && file_exists(&guard, p))
            {
                return api.start_print_from_file(path);
            }
            if let Some(url) = url.as_deref().filter(|u| is_gcode(u)) {
                return api.start_print_from_url(url);
            }
            Err(TimelapseError::InvalidPrintSource {
                message: "expected an allowed .gcode file or a .gcode URL".to_string(),
            })
        })
        .await?;

        let event = PrintEvent::NewPrintStats {
            device_id: device_id.to_string(),
            stats: stats.clone(),
        };
        if self.events.send(event).is_err() {
            debug!(device_id, "no subscribers for print stats");
        }
        info!(device_id, "print started");
        Ok(stats)
    }

    /// Pause the running print
    pub async fn pause_job(&self, device_id: &str) -> TimelapseResult<()> {
        let api = self.api(device_id)?;
        run_blocking("pause_print", move || api.pause_print()).await
    }

    /// Resume the paused print
    pub async fn resume_job(&self, device_id: &str) -> TimelapseResult<()> {
        let api = self.api(device_id)?;
        run_blocking("resume_print", move || api.resume_print()).await
    }

    /// Cancel the running print
    pub async fn stop_job(&self, device_id: &str) -> TimelapseResult<()> {
        let api = self.api(device_id)?;
        run_blocking("stop_print", move || api.stop_print()).await
    }

    /// Route `call` and apply the service's error policy
    pub async fn dispatch(&self, call: ServiceCall) -> TimelapseResult<()> {
        let kind = call.kind();
        let result = match &call {
            ServiceCall::PrintJob {
                device_id,
                filepath,
                url,
            } => self
                .print_job(device_id, filepath.as_deref(), url.as_deref())
                .await
                .map(drop),
            ServiceCall::PauseJob { device_id } => self.pause_job(device_id).await,
            ServiceCall::ResumeJob { device_id } => self.resume_job(device_id).await,
            ServiceCall::StopJob { device_id } => self.stop_job(device_id).await,
            ServiceCall::TakeSnapshot {
                device_id,
                output_dir,
            } => self.take_snapshot(device_id, output_dir).await.map(drop),
            ServiceCall::AddSnapshotToGif { device_id, name } => self
                .add_snapshot_to_gif(device_id, name.as_deref())
                .await
                .map(drop),
            ServiceCall::MakeGif {
                device_id,
                output_dir,
                name,
                fps,
                duration,
            } => self
                .make_gif(
                    device_id,
                    output_dir,
                    name.as_deref(),
                    fps.as_deref(),
                    duration.as_deref(),
                )
                .await
                .map(drop),
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) => match self.config.policy_for(kind) {
                ErrorPolicy::Log => {
                    error!(service = kind.name(), error = %e, "service call failed");
                    Ok(())
                }
                ErrorPolicy::Propagate => Err(e),
            },
        }
    }
}
