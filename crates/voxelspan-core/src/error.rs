//! Error types for grid construction and device tables.

use thiserror::Error;

use crate::geometry::Int3;

/// Result type used across voxelspan crates.
pub type Result<T> = std::result::Result<T, VoxelSpanError>;

/// Errors raised while configuring or constructing a block grid.
///
/// Lookups that simply miss (a position outside the active domain) are not
/// errors; they are reported as `None` by the query APIs.
#[derive(Debug, Error)]
pub enum VoxelSpanError {
    /// Device count must be at least one.
    #[error("Invalid device count: {count} (must be >= 1)")]
    InvalidDeviceCount {
        /// Requested device count.
        count: i64,
    },

    /// Domain extent must be positive on every axis.
    #[error("Invalid domain extent on axis {axis}: {value} (must be > 0)")]
    InvalidExtent {
        /// Axis name.
        axis: char,
        /// Offending extent.
        value: i32,
    },

    /// Block size must be positive.
    #[error("Invalid block size: {value} (must be > 0)")]
    InvalidBlockSize {
        /// Offending block size.
        value: i32,
    },

    /// Voxel spacing must be positive.
    #[error("Invalid voxel spacing: {value} (must be > 0)")]
    InvalidSpacing {
        /// Offending spacing.
        value: i32,
    },

    /// A stencil point reaches further than one ghost block.
    #[error("Stencil offset {offset} exceeds one block of ghost depth (block size {block_size})")]
    StencilTooDeep {
        /// Offending stencil offset.
        offset: Int3,
        /// Configured block size.
        block_size: i32,
    },

    /// A neighbor block exists but could not be resolved locally or in an
    /// adjacent partition.
    #[error(
        "Neighbor of block {origin} at offset {offset} in partition {partition} is beyond the ghost layer"
    )]
    GhostDepthExceeded {
        /// Partition performing the lookup.
        partition: usize,
        /// Origin of the block whose neighbor is missing.
        origin: Int3,
        /// Block offset of the neighbor.
        offset: Int3,
    },

    /// A neighbor block is owned by a partition that is not adjacent.
    #[error(
        "Neighbor of block {origin} at offset {offset} in partition {partition} is owned by non-adjacent partition {owner}"
    )]
    NonAdjacentNeighbor {
        /// Partition performing the lookup.
        partition: usize,
        /// Partition owning the neighbor.
        owner: usize,
        /// Origin of the block whose neighbor is missing.
        origin: Int3,
        /// Block offset of the neighbor.
        offset: Int3,
    },

    /// Device index out of range.
    #[error("Device index {index} out of range (device count {count})")]
    DeviceIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of devices.
        count: usize,
    },

    /// Device allocation failed.
    #[error("Device allocation of {requested} bytes failed: {reason}")]
    AllocationFailed {
        /// Requested size in bytes.
        requested: usize,
        /// Failure reason.
        reason: String,
    },

    /// Host/device copy with mismatched sizes.
    #[error("Transfer size mismatch: expected {expected} bytes, got {actual}")]
    TransferSizeMismatch {
        /// Buffer size in bytes.
        expected: usize,
        /// Host slice size in bytes.
        actual: usize,
    },

    /// Configuration loading error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VoxelSpanError {
    /// Returns true for errors that abort grid construction because the
    /// configuration itself is inconsistent.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            VoxelSpanError::InvalidDeviceCount { .. }
                | VoxelSpanError::InvalidExtent { .. }
                | VoxelSpanError::InvalidBlockSize { .. }
                | VoxelSpanError::InvalidSpacing { .. }
                | VoxelSpanError::StencilTooDeep { .. }
                | VoxelSpanError::GhostDepthExceeded { .. }
                | VoxelSpanError::NonAdjacentNeighbor { .. }
                | VoxelSpanError::Config(_)
        )
    }

    /// Returns true for device memory errors.
    pub fn is_memory_error(&self) -> bool {
        matches!(
            self,
            VoxelSpanError::AllocationFailed { .. } | VoxelSpanError::TransferSizeMismatch { .. }
        )
    }
}

impl From<config::ConfigError> for VoxelSpanError {
    fn from(err: config::ConfigError) -> Self {
        VoxelSpanError::Config(err.to_string())
    }
}
