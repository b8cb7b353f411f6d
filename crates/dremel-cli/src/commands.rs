//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Dremel: snapshot and GIF timelapse tool for Dremel 3D printers
#[derive(Parser, Debug)]
#[command(name = "dremel")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// YAML configuration file
    #[arg(long, env = "DREMEL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Base directory for relative paths and the session root
    #[arg(long, env = "DREMEL_CONFIG_DIR", global = true)]
    pub config_dir: Option<PathBuf>,

    /// Extra directory absolute paths may point into (repeatable)
    #[arg(long = "allow-dir", global = true)]
    pub allow_dirs: Vec<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Save an image as a one-off snapshot
    Snapshot(SnapshotArgs),

    /// Append an image to a timelapse session
    AddFrame(AddFrameArgs),

    /// Assemble a session into an animated GIF
    MakeGif(MakeGifArgs),

    /// List or discard timelapse sessions
    Sessions(SessionsArgs),

    /// Show the effective configuration
    Config(ConfigArgs),
}

/// Arguments for the snapshot command
#[derive(Parser, Debug)]
pub struct SnapshotArgs {
    /// Image file to store
    pub image: PathBuf,

    /// Output folder (relative to the config dir, or allow-listed absolute)
    #[arg(short, long)]
    pub output_dir: String,

    /// Snapshot name without extension (default: current timestamp)
    #[arg(short, long)]
    pub name: Option<String>,
}

/// Arguments for the add-frame command
#[derive(Parser, Debug)]
pub struct AddFrameArgs {
    /// Image file to append
    pub image: PathBuf,

    /// Session name
    #[arg(short, long)]
    pub name: String,
}

/// Arguments for the make-gif command
#[derive(Parser, Debug)]
pub struct MakeGifArgs {
    /// Session name
    #[arg(short, long)]
    pub name: String,

    /// Output folder (relative to the config dir, or allow-listed absolute)
    #[arg(short, long)]
    pub output_dir: String,

    /// Frames per second
    #[arg(long)]
    pub fps: Option<String>,

    /// Seconds per frame
    #[arg(long)]
    pub duration: Option<String>,
}

/// Arguments for the sessions command
#[derive(Parser, Debug)]
pub struct SessionsArgs {
    /// Delete this session instead of listing
    #[arg(long)]
    pub discard: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Print built-in defaults instead of the effective configuration
    #[arg(long)]
    pub defaults: bool,
}

/// Output format for listings
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON
    Json,
}

/// Color argument
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config::ColorChoice;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add_frame() {
        let cli = Cli::try_parse_from(["dremel", "add-frame", "frame.png", "--name", "job42"])
            .unwrap();
        match cli.command {
            Commands::AddFrame(args) => {
                assert_eq!(args.image, PathBuf::from("frame.png"));
                assert_eq!(args.name, "job42");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_make_gif_keeps_both_rates() {
        // Both rates parse; rejecting the pair is the library's job
        let cli = Cli::try_parse_from([
            "dremel", "make-gif", "-n", "job42", "-o", "www", "--fps", "5", "--duration", "2",
        ])
        .unwrap();
        match cli.command {
            Commands::MakeGif(args) => {
                assert_eq!(args.fps.as_deref(), Some("5"));
                assert_eq!(args.duration.as_deref(), Some("2"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "dremel",
            "sessions",
            "--config-dir",
            "/config",
            "--allow-dir",
            "/media",
            "--allow-dir",
            "/share",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.config_dir, Some(PathBuf::from("/config")));
        assert_eq!(cli.allow_dirs.len(), 2);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_make_gif_requires_output_dir() {
        assert!(Cli::try_parse_from(["dremel", "make-gif", "--name", "job42"]).is_err());
    }

    #[test]
    fn test_color_arg_conversion() {
        assert_eq!(ColorChoice::from(ColorArg::Never), ColorChoice::Never);
        assert_eq!(ColorChoice::from(ColorArg::Always), ColorChoice::Always);
        assert_eq!(ColorChoice::from(ColorArg::Auto), ColorChoice::Auto);
    }
}
