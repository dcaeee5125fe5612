//! Error types for the voxelspan CLI.

use thiserror::Error;
use voxelspan::VoxelSpanError;

/// CLI result type alias.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error type.
#[derive(Error, Debug)]
pub enum CliError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Grid construction or configuration error.
    #[error(transparent)]
    Grid(#[from] VoxelSpanError),

    /// Configuration could not be serialized.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file already exists.
    #[error("Configuration already exists at: {0} (use --force to overwrite)")]
    ConfigExists(String),

    /// A layout check failed.
    #[error("Validation failed: {0} check(s) failed")]
    Validation(usize),
}

impl From<toml::ser::Error> for CliError {
    fn from(e: toml::ser::Error) -> Self {
        CliError::Config(e.to_string())
    }
}
