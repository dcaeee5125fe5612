//! voxelspan CLI - Inspect and validate multi-device voxel grid decompositions.
//!
//! # Commands
//!
//! - `voxelspan init` - Write a default grid configuration
//! - `voxelspan inspect` - Print partitions, address ranges, launch views and halo plan
//! - `voxelspan validate` - Check the layout invariants of a grid
//!
//! # Examples
//!
//! ```bash
//! # Write a configuration for four devices
//! voxelspan init --devices 4
//!
//! # Show the layout of a sphere split across the configured devices
//! voxelspan inspect --config voxelspan.toml --shape sphere --views --halo
//!
//! # Validate a periodic channel on eight devices
//! voxelspan validate --shape channel --devices 8 --periodic
//! ```

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use voxelspan::logging::{init_logging, LoggingConfig};
use voxelspan::GridConfig;

mod commands;
mod error;
mod shape;

use commands::{init, inspect, validate, GridArgs};
use shape::Shape;

/// voxelspan - block grid decomposition tooling
#[derive(Parser)]
#[command(name = "voxelspan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options selecting the grid to build.
#[derive(Args)]
struct GridOptions {
    /// Grid configuration file (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Domain shape
    #[arg(short, long, value_enum, default_value = "dense")]
    shape: Shape,

    /// Override the configured device count
    #[arg(short, long)]
    devices: Option<usize>,

    /// Wrap the decomposition axis
    #[arg(long)]
    periodic: bool,
}

impl GridOptions {
    fn split(self) -> (GridArgs, Shape) {
        (
            GridArgs {
                config: self.config,
                devices: self.devices,
                periodic: self.periodic,
            },
            self.shape,
        )
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default grid configuration
    Init {
        /// Output path
        #[arg(short, long, default_value = "voxelspan.toml")]
        path: String,

        /// Number of devices
        #[arg(short, long, default_value = "1")]
        devices: usize,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the decomposition and address layout of a grid
    Inspect {
        #[command(flatten)]
        grid: GridOptions,

        /// Show launch parameters per data view
        #[arg(long)]
        views: bool,

        /// Show the halo exchange plan
        #[arg(long)]
        halo: bool,
    },

    /// Check the layout invariants of a grid
    Validate {
        #[command(flatten)]
        grid: GridOptions,

        /// List every failure
        #[arg(long)]
        detailed: bool,
    },
}

/// Logging settings: the `[logging]` table of the grid configuration when
/// one is given, overridden by `--verbose` and `--quiet`.
fn logging_config(verbose: bool, quiet: bool, config: Option<&str>) -> LoggingConfig {
    let mut logging = config
        .and_then(|path| GridConfig::load(path).ok())
        .map(|config| config.logging)
        .unwrap_or_else(|| LoggingConfig {
            level: "warn".to_string(),
            with_target: false,
            ..LoggingConfig::default()
        });
    if quiet {
        logging.level = "error".to_string();
    } else if verbose {
        logging.level = "debug".to_string();
    }
    logging
}

fn setup_logging(logging: &LoggingConfig) {
    if let Err(e) = init_logging(logging) {
        eprintln!("{} {}", "Warning:".yellow(), e);
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("warn"))
            .with_target(false)
            .without_time()
            .init();
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = match &cli.command {
        Commands::Inspect { grid, .. } | Commands::Validate { grid, .. } => grid.config.clone(),
        Commands::Init { .. } => None,
    };
    setup_logging(&logging_config(cli.verbose, cli.quiet, config_path.as_deref()));

    if !cli.quiet {
        println!(
            "{} {}\n",
            "voxelspan".bright_cyan().bold(),
            format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
        );
    }

    let result = match cli.command {
        Commands::Init {
            path,
            devices,
            force,
        } => init::execute(&path, devices, force),

        Commands::Inspect { grid, views, halo } => {
            let (args, shape) = grid.split();
            inspect::execute(&args, shape, views, halo)
        }

        Commands::Validate { grid, detailed } => {
            let (args, shape) = grid.split();
            validate::execute(&args, shape, detailed)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
