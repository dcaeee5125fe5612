//! # VoxelSpan CPU Backend
//!
//! Runs the grid on host threads. Each virtual device owns a slice of host
//! memory with its own budget, so multi-device decompositions can be
//! exercised and tested without accelerators.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod memory;
mod runtime;

pub use memory::{CpuBuffer, CpuMemory};
pub use runtime::CpuBackend;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{CpuBackend, CpuBuffer, CpuMemory};
}
