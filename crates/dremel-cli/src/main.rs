//! Dremel CLI: snapshots and GIF timelapses for Dremel 3D printers
//!
//! ## Usage
//!
//! ```bash
//! dremel add-frame cam.jpg --name benchy           # Append a frame
//! dremel make-gif --name benchy --output-dir www   # Assemble benchy.gif
//! dremel snapshot cam.jpg --output-dir www/snaps   # One-off snapshot
//! dremel sessions --format json                    # List sessions
//! ```

use clap::Parser;
use dremel::{logging, run_command, Cli, CliConfig, CliResult};
use dremel_timelapse::build_runtime;
use std::process::ExitCode;
use tracing::debug;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = CliConfig::from_cli(&cli)?;
    logging::init_logging(&config);
    debug!(config_dir = %config.timelapse.config_dir.display(), "configuration loaded");

    let runtime = build_runtime(&config.timelapse)?;
    runtime.block_on(run_command(&config, &cli.command))
}
