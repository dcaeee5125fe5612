//! CLI command implementations.

pub mod init;
pub mod inspect;
pub mod validate;

use std::path::Path;

use colored::Colorize;
use tracing::debug;
use voxelspan::prelude::*;

use crate::error::CliResult;
use crate::shape::Shape;

/// Grid options shared by the commands that build a grid.
#[derive(Debug, Clone, Default)]
pub struct GridArgs {
    /// TOML configuration file.
    pub config: Option<String>,
    /// Device count override.
    pub devices: Option<usize>,
    /// Make the decomposition periodic.
    pub periodic: bool,
}

/// Load the configuration and build a grid of the given shape.
pub fn build_span(args: &GridArgs, shape: Shape) -> CliResult<VoxelSpan> {
    let mut config = match &args.config {
        Some(path) => GridConfig::load(Path::new(path))?,
        None => GridConfig::default(),
    };
    if let Some(devices) = args.devices {
        config.device_count = devices;
    }
    if args.periodic {
        config.topology = Topology::Periodic;
    }

    println!(
        "  {} extent {} block {} devices {} shape {:?}",
        "•".dimmed(),
        config.extent().to_string().bright_yellow(),
        config.block_size.to_string().bright_yellow(),
        config.device_count.to_string().bright_yellow(),
        shape
    );

    debug!(
        "Grid configuration: stencil={:?} topology={:?} parallel_build={}",
        config.stencil, config.topology, config.parallel_build
    );

    let extent = config.extent();
    let span = shape.apply(VoxelSpan::builder().config(config), extent).build()?;
    Ok(span)
}
