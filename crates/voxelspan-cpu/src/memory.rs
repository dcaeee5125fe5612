//! Host-memory device buffers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use voxelspan_core::error::{Result, VoxelSpanError};
use voxelspan_core::memory::{DeviceBuffer, DeviceMemory};

/// Memory of one virtual CPU device.
///
/// Tracks how many bytes are live against a fixed budget. Freed when the
/// buffers are dropped.
pub struct CpuMemory {
    budget: usize,
    allocated: Arc<AtomicUsize>,
}

impl CpuMemory {
    /// Create a device memory with the given budget in bytes.
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            allocated: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Bytes currently allocated.
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Acquire)
    }
}

impl DeviceMemory for CpuMemory {
    fn allocate(&self, size: usize) -> Result<Box<dyn DeviceBuffer>> {
        let reserved = self
            .allocated
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_add(size).filter(|total| *total <= self.budget)
            });

        if reserved.is_err() {
            return Err(VoxelSpanError::AllocationFailed {
                requested: size,
                reason: format!("{} of {} bytes free", self.free_memory(), self.budget),
            });
        }

        trace!("CPU allocation of {} bytes", size);
        Ok(Box::new(CpuBuffer {
            data: RwLock::new(vec![0u8; size]),
            accounting: Arc::clone(&self.allocated),
        }))
    }

    fn total_memory(&self) -> usize {
        self.budget
    }

    fn free_memory(&self) -> usize {
        self.budget.saturating_sub(self.allocated())
    }
}

/// A device buffer living in host memory.
pub struct CpuBuffer {
    data: RwLock<Vec<u8>>,
    accounting: Arc<AtomicUsize>,
}

impl CpuBuffer {
    fn check_len(&self, actual: usize) -> Result<()> {
        let expected = self.size();
        if expected != actual {
            return Err(VoxelSpanError::TransferSizeMismatch { expected, actual });
        }
        Ok(())
    }
}

impl DeviceBuffer for CpuBuffer {
    fn size(&self) -> usize {
        self.data.read().len()
    }

    fn copy_from_host(&self, data: &[u8]) -> Result<()> {
        self.check_len(data.len())?;
        self.data.write().copy_from_slice(data);
        Ok(())
    }

    fn copy_to_host(&self, data: &mut [u8]) -> Result<()> {
        self.check_len(data.len())?;
        data.copy_from_slice(&self.data.read());
        Ok(())
    }
}

impl Drop for CpuBuffer {
    fn drop(&mut self) {
        self.accounting
            .fetch_sub(self.data.get_mut().len(), Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_copy() {
        let memory = CpuMemory::new(1024);
        let buffer = memory.allocate(4).unwrap();
        buffer.copy_from_host(&[1, 2, 3, 4]).unwrap();

        let mut out = [0u8; 4];
        buffer.copy_to_host(&mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4]);
        assert_eq!(memory.free_memory(), 1020);
    }

    #[test]
    fn test_budget_exceeded() {
        let memory = CpuMemory::new(16);
        let _a = memory.allocate(12).unwrap();
        let err = memory.allocate(8).err().unwrap();
        assert!(matches!(err, VoxelSpanError::AllocationFailed { requested: 8, .. }));
    }

    #[test]
    fn test_drop_releases_memory() {
        let memory = CpuMemory::new(64);
        {
            let _buffer = memory.allocate(64).unwrap();
            assert_eq!(memory.free_memory(), 0);
        }
        assert_eq!(memory.allocated(), 0);
    }

    #[test]
    fn test_size_mismatch() {
        let memory = CpuMemory::new(64);
        let buffer = memory.allocate(8).unwrap();
        let err = buffer.copy_from_host(&[0u8; 4]).unwrap_err();
        assert!(matches!(
            err,
            VoxelSpanError::TransferSizeMismatch {
                expected: 8,
                actual: 4
            }
        ));
    }
}
