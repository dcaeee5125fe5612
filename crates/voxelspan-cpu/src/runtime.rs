//! CPU backend implementation.

use tracing::info;

use voxelspan_core::backend::{BackendKind, ComputeBackend, DeviceInfo, SetIdx};
use voxelspan_core::config::GridConfig;
use voxelspan_core::error::{Result, VoxelSpanError};
use voxelspan_core::memory::DeviceMemory;

use crate::memory::CpuMemory;

/// Default memory budget per virtual device.
const DEFAULT_BUDGET: usize = 1024 * 1024 * 1024; // 1GB

/// CPU implementation of [`ComputeBackend`].
///
/// Exposes `device_count` virtual devices named `cpu:<i>`. Used for
/// testing and as a fallback when no accelerator is available.
pub struct CpuBackend {
    devices: Vec<CpuMemory>,
}

impl CpuBackend {
    /// Create a backend with `device_count` virtual devices.
    pub fn new(device_count: usize) -> Result<Self> {
        Self::with_memory_budget(device_count, DEFAULT_BUDGET)
    }

    /// Create a backend with an explicit per-device memory budget.
    pub fn with_memory_budget(device_count: usize, budget: usize) -> Result<Self> {
        if device_count == 0 {
            return Err(VoxelSpanError::InvalidDeviceCount { count: 0 });
        }
        info!(
            "Initializing CPU backend (devices={}, budget={} bytes)",
            device_count, budget
        );
        Ok(Self {
            devices: (0..device_count).map(|_| CpuMemory::new(budget)).collect(),
        })
    }

    /// Create a backend matching a grid configuration.
    pub fn from_config(config: &GridConfig) -> Result<Self> {
        Self::with_memory_budget(config.device_count, config.memory_per_device)
    }

    /// Concrete memory of one device.
    pub fn cpu_memory(&self, idx: SetIdx) -> Result<&CpuMemory> {
        self.devices
            .get(idx.idx())
            .ok_or(VoxelSpanError::DeviceIndexOutOfRange {
                index: idx.idx(),
                count: self.devices.len(),
            })
    }
}

impl ComputeBackend for CpuBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Cpu
    }

    fn device_count(&self) -> usize {
        self.devices.len()
    }

    fn device_info(&self, idx: SetIdx) -> Result<DeviceInfo> {
        let memory = self.cpu_memory(idx)?;
        Ok(
            DeviceInfo::new(idx, format!("cpu:{}", idx.idx()), BackendKind::Cpu)
                .with_total_memory(memory.total_memory() as u64),
        )
    }

    fn memory(&self, idx: SetIdx) -> Result<&dyn DeviceMemory> {
        let memory: &dyn DeviceMemory = self.cpu_memory(idx)?;
        Ok(memory)
    }
}
