//! # VoxelSpan Core
//!
//! Shared vocabulary for the voxelspan multi-device block grid.
//!
//! ## Core Abstractions
//!
//! - [`Int3`](geometry::Int3) - voxel, block and offset coordinates
//! - [`ComputeBackend`](backend::ComputeBackend) - a fixed set of devices
//! - [`DataSet`](data_set::DataSet) - one value per device
//! - [`MirroredTable`](memory::MirroredTable) - host table with a typed device copy
//! - [`GridConfig`](config::GridConfig) - grid configuration and loading

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod config;
pub mod data_set;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod memory;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::backend::{BackendKind, ComputeBackend, DeviceInfo, SetIdx};
    pub use crate::config::{GridConfig, GridConfigBuilder, StencilPreset, Topology};
    pub use crate::data_set::DataSet;
    pub use crate::error::{Result, VoxelSpanError};
    pub use crate::geometry::{Int3, NghOffset};
    pub use crate::logging::{init_logging, LogFormat, LoggingConfig};
    pub use crate::memory::{DeviceBuffer, DeviceMemory, HostOnly, Mirrored, MirroredTable};
}

pub use backend::{BackendKind, ComputeBackend, DeviceInfo, SetIdx};
pub use config::{GridConfig, StencilPreset, Topology};
pub use data_set::DataSet;
pub use error::{Result, VoxelSpanError};
pub use geometry::{Int3, NghOffset};
