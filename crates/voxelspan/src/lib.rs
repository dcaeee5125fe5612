//! # VoxelSpan
//!
//! Multi-device block grid for stencil computations (lattice Boltzmann,
//! finite differences) over large, sparse 3D voxel domains.
//!
//! VoxelSpan answers the indexing questions a multi-device stencil solver
//! asks on every launch and every halo exchange:
//!
//! - which blocks of active voxels each device owns, balanced by count
//! - which of them talk to other devices, and across which face
//! - a dense, gap-free address for every owned block, per device
//! - where each block's 26 neighbors live, including across devices
//! - which voxels of a block are active, with one ghost layer
//!
//! ## Quick Start
//!
//! ```ignore
//! use voxelspan::prelude::*;
//!
//! let config = GridConfig::builder()
//!     .with_extent(128, 128, 256)
//!     .with_block_size(8)
//!     .with_device_count(4)
//!     .build()?;
//!
//! let span = VoxelSpan::builder()
//!     .config(config)
//!     .with_active(|v| (v - Int3::new(64, 64, 128)).max_abs() < 60)
//!     .build()?;
//!
//! let grid = span.grid();
//! for p in 0..grid.device_count() {
//!     let internal = grid.launch_params(SetIdx(p), DataView::Internal);
//!     println!("device {} internal blocks: {}", p, internal.block_count);
//! }
//! ```
//!
//! ## Address layout per device
//!
//! ```text
//! ┌──────────────┬──────────────┬────────────────┬──────────────┬────────────────┐
//! │ internal     │ boundary-up  │ boundary-down  │ ghost-up     │ ghost-down     │
//! │ bulk │ bc    │ bulk │ bc    │ bulk │ bc      │ (peer above) │ (peer below)   │
//! └──────────────┴──────────────┴────────────────┴──────────────┴────────────────┘
//!  0                                            own_count                  total_count
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use voxelspan_core::*;
pub use voxelspan_cpu::{CpuBackend, CpuMemory};
pub use voxelspan_domain as domain;
pub use voxelspan_domain::{BlockGrid, BlockGridBuilder};

use std::sync::Arc;

use tracing::info;

use voxelspan_domain::grid::DeviceTables;
use voxelspan_domain::stencil::Stencil;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{VoxelSpan, VoxelSpanBuilder};
    pub use voxelspan_cpu::CpuBackend;
    pub use voxelspan_domain::prelude::*;
}

type Predicate = Arc<dyn Fn(Int3) -> bool + Send + Sync>;

/// A block grid together with the backend it was built for.
pub struct VoxelSpan {
    backend: Box<dyn ComputeBackend>,
    grid: BlockGrid,
    config: GridConfig,
}

impl VoxelSpan {
    /// Create a new builder.
    pub fn builder() -> VoxelSpanBuilder {
        VoxelSpanBuilder::new()
    }

    /// Build a dense grid (every voxel active) from a configuration.
    pub fn dense(config: GridConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// The backend.
    pub fn backend(&self) -> &dyn ComputeBackend {
        self.backend.as_ref()
    }

    /// The grid.
    pub fn grid(&self) -> &BlockGrid {
        &self.grid
    }

    /// Configuration the grid was built from.
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Upload the grid tables to every device.
    pub fn mirror_to_devices(&self) -> Result<DataSet<DeviceTables>> {
        self.grid.mirror_to_devices(self.backend.as_ref())
    }
}

/// Builder for [`VoxelSpan`].
#[derive(Default)]
pub struct VoxelSpanBuilder {
    config: GridConfig,
    active: Option<Predicate>,
    bc: Option<Predicate>,
    stencil: Option<Stencil>,
    backend: Option<Box<dyn ComputeBackend>>,
}

impl VoxelSpanBuilder {
    /// Create a builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a configuration.
    #[must_use]
    pub fn config(mut self, config: GridConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the activity predicate.
    #[must_use]
    pub fn with_active(mut self, active: impl Fn(Int3) -> bool + Send + Sync + 'static) -> Self {
        self.active = Some(Arc::new(active));
        self
    }

    /// Set the boundary-condition predicate.
    #[must_use]
    pub fn with_bc(mut self, bc: impl Fn(Int3) -> bool + Send + Sync + 'static) -> Self {
        self.bc = Some(Arc::new(bc));
        self
    }

    /// Override the stencil preset of the configuration.
    #[must_use]
    pub fn with_stencil(mut self, stencil: Stencil) -> Self {
        self.stencil = Some(stencil);
        self
    }

    /// Use an existing backend instead of creating a CPU backend.
    #[must_use]
    pub fn with_backend(mut self, backend: Box<dyn ComputeBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Validate the configuration and build the grid.
    pub fn build(self) -> Result<VoxelSpan> {
        self.config.validate()?;

        let backend = match self.backend {
            Some(backend) => backend,
            None => Box::new(CpuBackend::from_config(&self.config)?),
        };
        info!(
            "Using {} backend with {} devices",
            backend.kind(),
            backend.device_count()
        );

        let mut builder = BlockGridBuilder::from_config(&self.config);
        if let Some(active) = self.active {
            builder = builder.with_active(move |v| active(v));
        }
        if let Some(bc) = self.bc {
            builder = builder.with_bc(move |v| bc(v));
        }
        if let Some(stencil) = self.stencil {
            builder = builder.with_stencil(stencil);
        }

        let grid = builder.build(backend.as_ref())?;
        Ok(VoxelSpan {
            backend,
            grid,
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_minimal() {
        let span = VoxelSpan::dense(GridConfig::minimal()).unwrap();
        assert_eq!(span.backend().device_count(), 1);
        assert_eq!(span.grid().spans(SetIdx(0)).own_count(), 8);
    }

    #[test]
    fn test_builder_with_backend() {
        let backend = CpuBackend::new(3).unwrap();
        let span = VoxelSpan::builder()
            .config(GridConfig::minimal())
            .with_backend(Box::new(backend))
            .build()
            .unwrap();
        assert_eq!(span.grid().device_count(), 3);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = GridConfig {
            device_count: 0,
            ..GridConfig::minimal()
        };
        assert!(VoxelSpan::dense(config).is_err());
    }
}
