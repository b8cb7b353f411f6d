//! Dremel Timelapse: snapshot and GIF timelapse toolkit for Dremel 3D printers
//!
//! Camera frames are collected into named sessions on disk and later
//! assembled into an animated GIF.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Services (facade)  ── DeviceRegistry ──► PrinterApi (external)  │
//! ├──────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌──────────────┐           │
//! │   │ FrameStore │───►│ Session    │───►│ GifAssembler │──► .gif   │
//! │   │ (append)   │    │ 0.jpeg ... │    │ (numeric     │           │
//! │   └────────────┘    └────────────┘    │  order)      │           │
//! │          │                            └──────────────┘           │
//! │          ▼                                                       │
//! │   PathGuard + FolderManager (every caller path)                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All blocking work is offloaded with [`run_blocking`].

#![warn(missing_docs)]

mod config;
mod folder;
mod frame_store;
pub mod media;
mod path_guard;
mod printer;
mod result;
mod services;
mod session;
mod worker;

pub use config::{TimelapseConfig, DEFAULT_FPS, FRAME_EXTENSION, SNAPSHOTS_MAIN_FOLDER};
pub use folder::{ensure_folder, remove_folder_best_effort};
pub use frame_store::{frame_index, list_frames, next_frame_index, write_jpeg, FrameStore, StoredFrame};
pub use media::{AssembledGif, FrameTiming, GifAssembler, GifConfig};
pub use path_guard::{validate_filename, validate_path, PathGuard};
pub use printer::{DeviceEntry, DeviceRegistry, MockPrinter, PrintStats, PrinterApi};
pub use result::{TimelapseError, TimelapseResult};
pub use services::{
    parse_rate, snapshot_name, ErrorPolicy, PrintEvent, ServiceCall, ServiceKind, Services,
    EVENT_NEW_PRINT_STATS,
};
pub use session::{SessionCatalog, SessionSummary};
pub use worker::{build_runtime, run_blocking};
