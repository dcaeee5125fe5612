//! Device memory abstractions and host/device mirrored tables.
//!
//! A [`MirroredTable`] is one logical table with a host copy that is always
//! readable and, once synced, a device copy. Which copies are valid is
//! carried in the type: `MirroredTable<T, HostOnly>` has no device buffer,
//! `MirroredTable<T, Mirrored>` has one that matches the host data.

use std::marker::PhantomData;

use bytemuck::Pod;

use crate::error::{Result, VoxelSpanError};

/// A buffer resident on a device.
pub trait DeviceBuffer: Send + Sync {
    /// Buffer size in bytes.
    fn size(&self) -> usize;

    /// Copy data from host to device. `data.len()` must equal [`size`](Self::size).
    fn copy_from_host(&self, data: &[u8]) -> Result<()>;

    /// Copy data from device to host. `data.len()` must equal [`size`](Self::size).
    fn copy_to_host(&self, data: &mut [u8]) -> Result<()>;
}

/// Allocator for one device.
pub trait DeviceMemory: Send + Sync {
    /// Allocate `size` bytes of device memory.
    fn allocate(&self, size: usize) -> Result<Box<dyn DeviceBuffer>>;

    /// Total device memory in bytes.
    fn total_memory(&self) -> usize;

    /// Currently unallocated device memory in bytes.
    fn free_memory(&self) -> usize;
}

mod sealed {
    pub trait Sealed {}
}

/// Marker for which copies of a [`MirroredTable`] are valid.
pub trait Residency: sealed::Sealed {}

/// Only the host copy exists.
#[derive(Debug, Default)]
pub struct HostOnly;

/// Host and device copies exist and hold the same data.
pub struct Mirrored {
    buffer: Box<dyn DeviceBuffer>,
}

impl sealed::Sealed for HostOnly {}
impl sealed::Sealed for Mirrored {}
impl Residency for HostOnly {}
impl Residency for Mirrored {}

/// One logical table of plain-old-data values with an optional device copy.
pub struct MirroredTable<T: Pod, R: Residency = HostOnly> {
    host: Vec<T>,
    residency: R,
    _marker: PhantomData<T>,
}

impl<T: Pod, R: Residency> MirroredTable<T, R> {
    /// Host copy.
    pub fn host(&self) -> &[T] {
        &self.host
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.host.len()
    }

    /// True for a zero-length table.
    pub fn is_empty(&self) -> bool {
        self.host.is_empty()
    }

    /// Size of the table in bytes.
    pub fn size_bytes(&self) -> usize {
        std::mem::size_of_val(self.host.as_slice())
    }
}

impl<T: Pod> MirroredTable<T, HostOnly> {
    /// Create a host-only table.
    pub fn new(host: Vec<T>) -> Self {
        Self {
            host,
            residency: HostOnly,
            _marker: PhantomData,
        }
    }

    /// Mutable host copy. Only available before the table is mirrored.
    pub fn host_mut(&mut self) -> &mut [T] {
        &mut self.host
    }

    /// Allocate a device buffer and upload the host copy.
    pub fn sync_to_device(self, memory: &dyn DeviceMemory) -> Result<MirroredTable<T, Mirrored>> {
        let buffer = memory.allocate(self.size_bytes())?;
        buffer.copy_from_host(bytemuck::cast_slice(&self.host))?;
        Ok(MirroredTable {
            host: self.host,
            residency: Mirrored { buffer },
            _marker: PhantomData,
        })
    }
}

impl<T: Pod> MirroredTable<T, Mirrored> {
    /// Device copy.
    pub fn device_buffer(&self) -> &dyn DeviceBuffer {
        self.residency.buffer.as_ref()
    }

    /// Apply `f` to the host copy and upload the result again.
    pub fn update(&mut self, f: impl FnOnce(&mut [T])) -> Result<()> {
        f(&mut self.host);
        self.residency
            .buffer
            .copy_from_host(bytemuck::cast_slice(&self.host))
    }

    /// Download the device copy.
    pub fn read_back(&self) -> Result<Vec<T>> {
        let buffer = self.device_buffer();
        let mut bytes = vec![0u8; buffer.size()];
        buffer.copy_to_host(&mut bytes)?;
        if bytes.len() != self.size_bytes() {
            return Err(VoxelSpanError::TransferSizeMismatch {
                expected: self.size_bytes(),
                actual: bytes.len(),
            });
        }
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }

    /// Drop the device copy.
    pub fn into_host_only(self) -> MirroredTable<T, HostOnly> {
        MirroredTable::new(self.host)
    }
}

impl<T: Pod + std::fmt::Debug, R: Residency> std::fmt::Debug for MirroredTable<T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirroredTable")
            .field("len", &self.host.len())
            .field("residency", &std::any::type_name::<R>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct VecBuffer(Mutex<Vec<u8>>);

    impl DeviceBuffer for VecBuffer {
        fn size(&self) -> usize {
            self.0.lock().len()
        }

        fn copy_from_host(&self, data: &[u8]) -> Result<()> {
            let mut buf = self.0.lock();
            if buf.len() != data.len() {
                return Err(VoxelSpanError::TransferSizeMismatch {
                    expected: buf.len(),
                    actual: data.len(),
                });
            }
            buf.copy_from_slice(data);
            Ok(())
        }

        fn copy_to_host(&self, data: &mut [u8]) -> Result<()> {
            data.copy_from_slice(&self.0.lock());
            Ok(())
        }
    }

    struct VecMemory;

    impl DeviceMemory for VecMemory {
        fn allocate(&self, size: usize) -> Result<Box<dyn DeviceBuffer>> {
            Ok(Box::new(VecBuffer(Mutex::new(vec![0; size]))))
        }

        fn total_memory(&self) -> usize {
            usize::MAX
        }

        fn free_memory(&self) -> usize {
            usize::MAX
        }
    }

    #[test]
    fn test_sync_and_read_back() {
        let table = MirroredTable::new(vec![1u32, 2, 3, u32::MAX]);
        let mirrored = table.sync_to_device(&VecMemory).unwrap();
        assert_eq!(mirrored.device_buffer().size(), 16);
        assert_eq!(mirrored.read_back().unwrap(), vec![1, 2, 3, u32::MAX]);
    }

    #[test]
    fn test_read_back_struct_table() {
        use crate::geometry::Int3;

        let origins = vec![Int3::new(0, 4, 8), Int3::new(-4, 0, 12)];
        let mirrored = MirroredTable::new(origins.clone())
            .sync_to_device(&VecMemory)
            .unwrap();
        assert_eq!(mirrored.device_buffer().size(), 24);
        assert_eq!(mirrored.read_back().unwrap(), origins);
    }

    #[test]
    fn test_update_resyncs() {
        let mut mirrored = MirroredTable::new(vec![0u32; 4])
            .sync_to_device(&VecMemory)
            .unwrap();
        mirrored.update(|host| host[2] = 7).unwrap();
        assert_eq!(mirrored.host()[2], 7);
        assert_eq!(mirrored.read_back().unwrap()[2], 7);
    }

    #[test]
    fn test_empty_table() {
        let mirrored = MirroredTable::<u32>::new(Vec::new())
            .sync_to_device(&VecMemory)
            .unwrap();
        assert!(mirrored.is_empty());
        assert!(mirrored.read_back().unwrap().is_empty());
        let host_only = mirrored.into_host_only();
        assert_eq!(host_only.size_bytes(), 0);
    }
}
