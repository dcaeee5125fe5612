//! Backend abstraction: a fixed set of compute devices.
//!
//! The grid only needs to know how many devices exist, what they are
//! called and where their memory lives. Concrete backends (CPU threads,
//! GPU accelerators) implement [`ComputeBackend`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VoxelSpanError};
use crate::memory::DeviceMemory;

/// Index of a device inside a backend's device set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SetIdx(pub usize);

impl SetIdx {
    /// Raw index.
    #[inline]
    pub const fn idx(self) -> usize {
        self.0
    }
}

impl fmt::Display for SetIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev{}", self.0)
    }
}

/// Kind of compute device behind a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Host threads.
    #[default]
    Cpu,
    /// NVIDIA CUDA.
    Cuda,
    /// WebGPU.
    Wgpu,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Cpu => write!(f, "CPU"),
            BackendKind::Cuda => write!(f, "CUDA"),
            BackendKind::Wgpu => write!(f, "WebGPU"),
        }
    }
}

/// Information about one device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Device index.
    pub index: SetIdx,
    /// Device name.
    pub name: String,
    /// Backend type.
    pub backend: BackendKind,
    /// Total memory in bytes.
    pub total_memory: u64,
    /// Maximum threads per launch block.
    pub max_threads_per_block: u32,
}

impl DeviceInfo {
    /// Create a new device info.
    pub fn new(index: SetIdx, name: String, backend: BackendKind) -> Self {
        Self {
            index,
            name,
            backend,
            total_memory: 0,
            max_threads_per_block: 1024,
        }
    }

    /// Set total memory.
    #[must_use]
    pub fn with_total_memory(mut self, bytes: u64) -> Self {
        self.total_memory = bytes;
        self
    }
}

/// A fixed set of devices that grid tables are distributed across.
pub trait ComputeBackend: Send + Sync {
    /// Backend type.
    fn kind(&self) -> BackendKind;

    /// Number of devices. Never zero for a constructed backend.
    fn device_count(&self) -> usize;

    /// Describe one device.
    fn device_info(&self, idx: SetIdx) -> Result<DeviceInfo>;

    /// Memory allocator of one device.
    fn memory(&self, idx: SetIdx) -> Result<&dyn DeviceMemory>;

    /// Visit every device in index order.
    fn for_each_device(&self, f: &mut dyn FnMut(SetIdx)) {
        for i in 0..self.device_count() {
            f(SetIdx(i));
        }
    }

    /// True for device 0.
    fn is_first_device(&self, idx: SetIdx) -> bool {
        idx.0 == 0
    }

    /// True for the highest device index.
    fn is_last_device(&self, idx: SetIdx) -> bool {
        idx.0 + 1 == self.device_count()
    }

    /// Fail with [`VoxelSpanError::DeviceIndexOutOfRange`] if `idx` is not a device.
    fn check_device(&self, idx: SetIdx) -> Result<()> {
        if idx.0 < self.device_count() {
            Ok(())
        } else {
            Err(VoxelSpanError::DeviceIndexOutOfRange {
                index: idx.0,
                count: self.device_count(),
            })
        }
    }
}
