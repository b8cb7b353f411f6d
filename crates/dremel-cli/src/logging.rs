//! `tracing` subscriber setup
//!
//! Logs go to stderr. `RUST_LOG`, when set, overrides the level picked from
//! `-q` / `-v`.

use crate::config::CliConfig;
use tracing_subscriber::EnvFilter;

/// Build the filter for `config`
#[must_use]
pub fn env_filter(config: &CliConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.filter_directive()))
}

/// Install the global subscriber; a second call is a no-op
pub fn init_logging(config: &CliConfig) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_writer(std::io::stderr)
        .with_ansi(config.color.should_color())
        .with_target(config.verbosity.is_verbose())
        .try_init();
}
