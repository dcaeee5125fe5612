//! `voxelspan init` command - Write a default configuration file.

use std::fs;
use std::path::Path;

use colored::Colorize;
use voxelspan::GridConfig;

use crate::error::{CliError, CliResult};

/// Execute the `init` command.
pub fn execute(path: &str, devices: usize, force: bool) -> CliResult<()> {
    let target = Path::new(path);
    if target.exists() && !force {
        return Err(CliError::ConfigExists(path.to_string()));
    }

    let config = GridConfig::multi_device(devices);
    config.validate()?;
    let content = toml::to_string_pretty(&config)?;
    fs::write(target, content)?;

    println!(
        "{} Wrote configuration to {}",
        "✓".bright_green(),
        path.bright_white()
    );
    Ok(())
}
