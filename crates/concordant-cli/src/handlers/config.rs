//! Config command handler

use crate::config::CliConfig;
use crate::{CliResult, ConfigArgs};
use concordant::EngineConfig;

/// YAML of the effective (or default) engine configuration
pub fn render_config(config: &CliConfig, args: &ConfigArgs) -> CliResult<String> {
    let yaml = if args.defaults {
        EngineConfig::default().to_yaml()?
    } else {
        config.engine.to_yaml()?
    };
    Ok(yaml)
}

/// Execute the config command
pub fn execute_config(config: &CliConfig, args: &ConfigArgs) -> CliResult<()> {
    print!("{}", render_config(config, args)?);
    Ok(())
}
