//! Dremel CLI library
//!
//! Command-line front end for the `dremel-timelapse` toolkit: store snapshots,
//! grow timelapse sessions frame by frame, and assemble them into GIFs.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logging;
mod output;

pub use commands::{
    AddFrameArgs, Cli, ColorArg, Commands, ConfigArgs, MakeGifArgs, OutputFormat, SessionsArgs,
    SnapshotArgs,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::Reporter;

/// Dispatch a parsed command on the current runtime
pub async fn run_command(config: &CliConfig, command: &Commands) -> CliResult<()> {
    let mut reporter = Reporter::new(config.color.should_color(), config.verbosity.is_quiet());

    match command {
        Commands::Snapshot(args) => {
            handlers::execute_snapshot(config, args, &reporter).await?;
        }
        Commands::AddFrame(args) => {
            handlers::execute_add_frame(config, args, &reporter).await?;
        }
        Commands::MakeGif(args) => {
            handlers::execute_make_gif(config, args, &mut reporter).await?;
        }
        Commands::Sessions(args) => handlers::execute_sessions(config, args, &reporter).await?,
        Commands::Config(args) => handlers::execute_config(config, args, &reporter)?,
    }
    Ok(())
}
