//! Grid configuration.
//!
//! Configuration can be built in code with [`GridConfigBuilder`], or loaded
//! from a TOML file with environment overrides:
//!
//! ```toml
//! extent = [128, 128, 256]
//! block_size = 8
//! device_count = 4
//! stencil = "d3q19"
//! topology = "periodic"
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! Environment variables use the `VOXELSPAN` prefix and `__` as separator,
//! e.g. `VOXELSPAN__DEVICE_COUNT=2`.

use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, VoxelSpanError};
use crate::geometry::Int3;
use crate::logging::LoggingConfig;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "VOXELSPAN";

/// Built-in stencil shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StencilPreset {
    /// Center plus the 6 face neighbors.
    #[default]
    Laplace7,
    /// Center, 6 faces and 12 edges.
    D3q19,
    /// Full 3x3x3 neighborhood.
    D3q27,
}

/// How partitions relate along the decomposition axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// The first and last partitions have no neighbor past the domain ends.
    #[default]
    Open,
    /// Partitions form a ring and the domain wraps along the decomposition axis.
    Periodic,
}

/// Configuration of a block grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Domain extent in voxels.
    #[serde(default = "default_extent")]
    pub extent: [i32; 3],

    /// Block edge length in voxels.
    #[serde(default = "default_block_size")]
    pub block_size: i32,

    /// Voxel spacing stride.
    #[serde(default = "default_spacing")]
    pub spacing: i32,

    /// Number of devices the domain is split across.
    #[serde(default = "default_device_count")]
    pub device_count: usize,

    /// Stencil used by the kernels.
    #[serde(default)]
    pub stencil: StencilPreset,

    /// Partition topology.
    #[serde(default)]
    pub topology: Topology,

    /// Build per-partition phases with rayon.
    #[serde(default = "default_parallel_build")]
    pub parallel_build: bool,

    /// Memory budget per device in bytes (CPU backend).
    #[serde(default = "default_memory_per_device")]
    pub memory_per_device: usize,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_extent() -> [i32; 3] {
    [64, 64, 64]
}

fn default_block_size() -> i32 {
    8
}

fn default_spacing() -> i32 {
    1
}

fn default_device_count() -> usize {
    1
}

fn default_parallel_build() -> bool {
    true
}

fn default_memory_per_device() -> usize {
    1024 * 1024 * 1024 // 1GB
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            extent: default_extent(),
            block_size: default_block_size(),
            spacing: default_spacing(),
            device_count: default_device_count(),
            stencil: StencilPreset::default(),
            topology: Topology::default(),
            parallel_build: default_parallel_build(),
            memory_per_device: default_memory_per_device(),
            logging: LoggingConfig::default(),
        }
    }
}

impl GridConfig {
    /// Smallest useful grid: 8³ voxels in 4³ blocks on one device.
    pub fn minimal() -> Self {
        Self {
            extent: [8, 8, 8],
            block_size: 4,
            parallel_build: false,
            ..Default::default()
        }
    }

    /// Default grid split across `devices` devices.
    pub fn multi_device(devices: usize) -> Self {
        Self {
            device_count: devices,
            ..Default::default()
        }
    }

    /// Create a builder.
    pub fn builder() -> GridConfigBuilder {
        GridConfigBuilder::new()
    }

    /// Domain extent as a triple.
    pub fn extent(&self) -> Int3 {
        Int3::from(self.extent)
    }

    /// Load configuration from a file, with environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(env_source())
            .build()?
            .try_deserialize::<GridConfig>()?;
        config.validate()?;
        debug!("Loaded grid configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Load configuration from a TOML string, with environment overrides.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .add_source(env_source())
            .build()?
            .try_deserialize::<GridConfig>()?;
        config.validate()?;
        Ok(config)
    }

    /// Create from environment variables only.
    pub fn from_env() -> Result<Self> {
        let config = Config::builder()
            .add_source(env_source())
            .build()?
            .try_deserialize::<GridConfig>()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.device_count == 0 {
            return Err(VoxelSpanError::InvalidDeviceCount { count: 0 });
        }
        for (axis, value) in ['x', 'y', 'z'].into_iter().zip(self.extent) {
            if value <= 0 {
                return Err(VoxelSpanError::InvalidExtent { axis, value });
            }
        }
        if self.block_size <= 0 {
            return Err(VoxelSpanError::InvalidBlockSize {
                value: self.block_size,
            });
        }
        if self.spacing <= 0 {
            return Err(VoxelSpanError::InvalidSpacing {
                value: self.spacing,
            });
        }
        Ok(())
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

/// Builder for [`GridConfig`].
#[derive(Debug, Clone, Default)]
pub struct GridConfigBuilder {
    config: GridConfig,
}

impl GridConfigBuilder {
    /// Create a builder starting from the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the domain extent in voxels.
    #[must_use]
    pub fn with_extent(mut self, x: i32, y: i32, z: i32) -> Self {
        self.config.extent = [x, y, z];
        self
    }

    /// Set the block edge length.
    #[must_use]
    pub fn with_block_size(mut self, block_size: i32) -> Self {
        self.config.block_size = block_size;
        self
    }

    /// Set the voxel spacing.
    #[must_use]
    pub fn with_spacing(mut self, spacing: i32) -> Self {
        self.config.spacing = spacing;
        self
    }

    /// Set the device count.
    #[must_use]
    pub fn with_device_count(mut self, count: usize) -> Self {
        self.config.device_count = count;
        self
    }

    /// Set the stencil.
    #[must_use]
    pub fn with_stencil(mut self, stencil: StencilPreset) -> Self {
        self.config.stencil = stencil;
        self
    }

    /// Set the partition topology.
    #[must_use]
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.config.topology = topology;
        self
    }

    /// Enable or disable the parallel build.
    #[must_use]
    pub fn with_parallel_build(mut self, enabled: bool) -> Self {
        self.config.parallel_build = enabled;
        self
    }

    /// Set the per-device memory budget.
    #[must_use]
    pub fn with_memory_per_device(mut self, bytes: usize) -> Self {
        self.config.memory_per_device = bytes;
        self
    }

    /// Set logging options.
    #[must_use]
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<GridConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = GridConfig::default();
        assert_eq!(config.extent(), Int3::splat(64));
        assert_eq!(config.block_size, 8);
        assert_eq!(config.device_count, 1);
        assert_eq!(config.topology, Topology::Open);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        let minimal = GridConfig::minimal();
        assert_eq!(minimal.extent, [8, 8, 8]);
        assert_eq!(minimal.block_size, 4);
        assert!(!minimal.parallel_build);

        assert_eq!(GridConfig::multi_device(4).device_count, 4);
    }

    #[test]
    fn test_builder() {
        let config = GridConfig::builder()
            .with_extent(16, 16, 32)
            .with_block_size(4)
            .with_device_count(2)
            .with_stencil(StencilPreset::D3q27)
            .with_topology(Topology::Periodic)
            .build()
            .unwrap();
        assert_eq!(config.extent(), Int3::new(16, 16, 32));
        assert_eq!(config.stencil, StencilPreset::D3q27);
        assert_eq!(config.topology, Topology::Periodic);
    }

    #[test]
    fn test_validation_errors() {
        let err = GridConfig::builder().with_device_count(0).build().unwrap_err();
        assert!(matches!(err, VoxelSpanError::InvalidDeviceCount { count: 0 }));

        let err = GridConfig::builder()
            .with_extent(8, 0, 8)
            .build()
            .unwrap_err();
        assert!(matches!(err, VoxelSpanError::InvalidExtent { axis: 'y', value: 0 }));

        let err = GridConfig::builder()
            .with_extent(8, 8, -3)
            .build()
            .unwrap_err();
        assert!(matches!(err, VoxelSpanError::InvalidExtent { axis: 'z', value: -3 }));

        assert!(GridConfig::builder().with_block_size(0).build().is_err());
        assert!(GridConfig::builder().with_spacing(-1).build().is_err());
    }

    #[test]
    fn test_from_toml_str() {
        let config = GridConfig::from_toml_str(
            r#"
            extent = [32, 16, 8]
            block_size = 4
            device_count = 3
            stencil = "d3q19"
            topology = "periodic"

            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.extent(), Int3::new(32, 16, 8));
        assert_eq!(config.device_count, 3);
        assert_eq!(config.stencil, StencilPreset::D3q19);
        assert_eq!(config.topology, Topology::Periodic);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.spacing, 1);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "extent = [8, 8, 16]\nblock_size = 4\ndevice_count = 2").unwrap();

        let config = GridConfig::load(&path).unwrap();
        assert_eq!(config.extent(), Int3::new(8, 8, 16));
        assert_eq!(config.device_count, 2);
    }

    #[test]
    fn test_load_rejects_invalid() {
        let err = GridConfig::from_toml_str("device_count = 0").unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = GridConfig::minimal();
        let text = toml::to_string(&config).unwrap();
        let parsed: GridConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
