//! # VoxelSpan Domain
//!
//! Decomposition and addressing of sparse voxel domains across devices.
//!
//! Construction runs in strict phases, each producing an immutable value:
//!
//! 1. [`Decomposition`](decomposition::Decomposition) - per-device z-slabs
//!    balanced by active block count
//! 2. [`Classification`](classifier::Classification) - internal/boundary and
//!    bulk/bc tags per block
//! 3. [`SpanLayout`](layout::SpanLayout) - dense per-device addresses, ghost
//!    ranges and neighbor resolution
//! 4. [`ActiveMask`](mask::ActiveMask) and
//!    [`NeighborTable`](connectivity::NeighborTable) - per-block tables
//!    consumed by stencil kernels
//!
//! [`BlockGrid`](grid::BlockGrid) runs the whole pipeline.
//!
//! ## Example
//!
//! ```ignore
//! use voxelspan_cpu::CpuBackend;
//! use voxelspan_domain::prelude::*;
//!
//! let backend = CpuBackend::new(2)?;
//! let grid = BlockGrid::builder()
//!     .with_extent(Int3::new(64, 64, 128))
//!     .with_block_size(8)
//!     .with_active(|v| (v - Int3::splat(32)).max_abs() < 30)
//!     .build(&backend)?;
//! let internal = grid.launch_params(SetIdx(0), DataView::Internal);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classes;
pub mod classifier;
pub mod connectivity;
pub mod decomposition;
pub mod domain;
mod exec;
pub mod grid;
pub mod halo;
pub mod launch;
pub mod layout;
pub mod mask;
pub mod stencil;
pub mod topology;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::classes::{ByDirection, ByDomain, ByPartition, Category};
    pub use crate::classifier::Classification;
    pub use crate::connectivity::{NeighborTable, NEIGHBOR_COUNT, NEIGHBOR_OFFSETS, NO_NEIGHBOR};
    pub use crate::decomposition::{Decomposition, PartitionRange};
    pub use crate::domain::Domain;
    pub use crate::grid::{BlockGrid, BlockGridBuilder, DeviceTables, VoxelAddress};
    pub use crate::halo::{HaloPlan, HaloTransfer};
    pub use crate::launch::{DataView, LaunchParams};
    pub use crate::layout::{Bounds, GhostRange, GhostTarget, PartitionSpans, SpanLayout};
    pub use crate::mask::ActiveMask;
    pub use crate::stencil::Stencil;
    pub use voxelspan_core::prelude::*;
}

pub use grid::{BlockGrid, BlockGridBuilder};
pub use layout::{Bounds, SpanLayout};
