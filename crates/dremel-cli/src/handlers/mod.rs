//! Command handlers, one module per command family
//!
//! Disk and codec work goes through [`dremel_timelapse::run_blocking`] so the
//! handlers stay async and the blocking pool stays bounded.

pub mod config;
pub mod sessions;
pub mod timelapse;

pub use config::execute_config;
pub use sessions::{execute_sessions, render_sessions_text};
pub use timelapse::{execute_add_frame, execute_make_gif, execute_snapshot, load_image};
