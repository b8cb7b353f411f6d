//! Config command handler

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::Reporter;
use crate::ConfigArgs;
use dremel_timelapse::TimelapseConfig;

/// Execute the config command
pub fn execute_config(config: &CliConfig, args: &ConfigArgs, reporter: &Reporter) -> CliResult<()> {
    let yaml = render_config(config, args.defaults)?;
    reporter.line(yaml.trim_end());
    Ok(())
}

/// YAML for the effective (or built-in default) toolkit configuration
pub fn render_config(config: &CliConfig, defaults: bool) -> CliResult<String> {
    let yaml = if defaults {
        TimelapseConfig::default().to_yaml()?
    } else {
        config.timelapse.to_yaml()?
    };
    Ok(yaml)
}
