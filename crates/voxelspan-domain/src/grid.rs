//! Block grid: the construction pipeline and its read-only result.
//!
//! ```text
//! Domain ─► Decomposition ─► Classification ─► SpanLayout ─► masks / neighbor tables
//! ```
//!
//! Each phase consumes the previous one by value and is never mutated
//! afterwards. Per-partition work inside a phase may run on the rayon
//! pool; a phase only starts once the previous one is complete for every
//! partition.

use std::sync::Arc;

use tracing::info;

use voxelspan_core::backend::{ComputeBackend, SetIdx};
use voxelspan_core::config::{GridConfig, Topology};
use voxelspan_core::data_set::DataSet;
use voxelspan_core::error::{Result, VoxelSpanError};
use voxelspan_core::geometry::{Int3, NghOffset};
use voxelspan_core::memory::{Mirrored, MirroredTable};

use crate::classifier::Classification;
use crate::connectivity::{build_neighbor_tables, NeighborTable};
use crate::decomposition::Decomposition;
use crate::domain::{Domain, VoxelPredicate};
use crate::halo::HaloPlan;
use crate::launch::{DataView, LaunchParams, LaunchTable};
use crate::layout::{Bounds, PartitionSpans, SpanLayout};
use crate::mask::{build_masks, local_bit, ActiveMask};
use crate::stencil::Stencil;

/// Where a voxel lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoxelAddress {
    /// Owning device.
    pub device: SetIdx,
    /// Block address on that device.
    pub block: u32,
    /// Bit of the voxel within the block mask.
    pub bit: u32,
}

/// Grid tables of one device, mirrored to device memory.
#[derive(Debug)]
pub struct DeviceTables {
    /// Active-voxel mask words, owned blocks then ghost windows.
    pub mask: MirroredTable<u32, Mirrored>,
    /// Neighbor table, 26 entries per owned block.
    pub neighbors: MirroredTable<u32, Mirrored>,
    /// Block origins by address, owned blocks then ghost windows.
    pub origins: MirroredTable<Int3, Mirrored>,
    /// Compact stencil offsets.
    pub stencil: MirroredTable<NghOffset, Mirrored>,
}

/// A decomposed, classified and addressed voxel domain.
#[derive(Debug, Clone)]
pub struct BlockGrid {
    layout: SpanLayout,
    masks: DataSet<ActiveMask>,
    neighbors: DataSet<NeighborTable>,
    origins: DataSet<Vec<Int3>>,
    stencil: Stencil,
    compact_stencil: Vec<NghOffset>,
    halo: HaloPlan,
    launch: LaunchTable,
}

impl BlockGrid {
    /// Create a builder with default settings.
    pub fn builder() -> BlockGridBuilder {
        BlockGridBuilder::new()
    }

    /// Number of devices.
    pub fn device_count(&self) -> usize {
        self.layout.partition_count()
    }

    /// The domain.
    pub fn domain(&self) -> &Domain {
        self.layout.domain()
    }

    /// Decomposition phase result.
    pub fn decomposition(&self) -> &Decomposition {
        self.layout.decomposition()
    }

    /// Classification phase result.
    pub fn classification(&self) -> &Classification {
        self.layout.classification()
    }

    /// Layout phase result.
    pub fn layout(&self) -> &SpanLayout {
        &self.layout
    }

    /// Address ranges of one device.
    pub fn spans(&self, p: SetIdx) -> &PartitionSpans {
        self.layout.spans(p)
    }

    /// Address of an owned block.
    pub fn address_of(&self, p: SetIdx, origin: Int3) -> Option<u32> {
        self.layout.address_of(p, origin)
    }

    /// Origin of the block at `address`, ghost windows included.
    pub fn origin_of(&self, p: SetIdx, address: u32) -> Option<Int3> {
        self.origins[p].get(address as usize).copied()
    }

    /// Address of a neighbor block; see [`SpanLayout::neighbor_address`].
    pub fn neighbor_address(&self, p: SetIdx, origin: Int3, offset: Int3) -> Option<u32> {
        self.layout.neighbor_address(p, origin, offset)
    }

    /// Address range of a data view.
    pub fn view_bounds(&self, p: SetIdx, view: DataView) -> Bounds {
        view.bounds(self.layout.spans(p))
    }

    /// Launch parameters of a data view.
    pub fn launch_params(&self, p: SetIdx, view: DataView) -> LaunchParams {
        self.launch.get(p, view)
    }

    /// Halo exchange plan.
    pub fn halo_plan(&self) -> &HaloPlan {
        &self.halo
    }

    /// Active-voxel masks of one device.
    pub fn mask(&self, p: SetIdx) -> &ActiveMask {
        &self.masks[p]
    }

    /// Neighbor table of one device.
    pub fn neighbor_table(&self, p: SetIdx) -> &NeighborTable {
        &self.neighbors[p]
    }

    /// Block origins of one device by address.
    pub fn origins(&self, p: SetIdx) -> &[Int3] {
        &self.origins[p]
    }

    /// Stencil the grid was built for.
    pub fn stencil(&self) -> &Stencil {
        &self.stencil
    }

    /// Stencil offsets in kernel representation.
    pub fn compact_stencil(&self) -> &[NghOffset] {
        &self.compact_stencil
    }

    /// True if the voxel is on the lattice, inside the extent, and active.
    pub fn is_inside_domain(&self, voxel: Int3) -> bool {
        let domain = self.domain();
        domain.is_on_lattice(voxel) && domain.is_voxel_active(voxel)
    }

    /// Device owning the block that contains `voxel`.
    pub fn owner_of_voxel(&self, voxel: Int3) -> Option<SetIdx> {
        let domain = self.domain();
        if !domain.is_on_lattice(voxel) {
            return None;
        }
        self.decomposition().owner_of_block(domain.block_of(voxel))
    }

    /// Device, block address and mask bit of an active voxel.
    pub fn voxel_address(&self, voxel: Int3) -> Option<VoxelAddress> {
        if !self.is_inside_domain(voxel) {
            return None;
        }
        let domain = self.domain();
        let device = self.owner_of_voxel(voxel)?;
        let origin = domain.block_origin(domain.block_of(voxel));
        let block = self.address_of(device, origin)?;
        let local = (voxel - origin).div_floor(domain.spacing());
        Some(VoxelAddress {
            device,
            block,
            bit: local_bit(local, domain.block_size()),
        })
    }

    /// Decode the mask of the block at `address` on device `p`.
    pub fn is_active_voxel(&self, p: SetIdx, address: u32, local: Int3) -> bool {
        let mask = &self.masks[p];
        (address as usize) < mask.block_count()
            && local.in_bounds(Int3::splat(self.domain().block_size()))
            && mask.is_active(address, local)
    }

    /// Upload every device's tables to its memory.
    pub fn mirror_to_devices(&self, backend: &dyn ComputeBackend) -> Result<DataSet<DeviceTables>> {
        let tables = (0..self.device_count())
            .map(|i| {
                let p = SetIdx(i);
                let memory = backend.memory(p)?;
                Ok(DeviceTables {
                    mask: MirroredTable::new(self.masks[p].words().to_vec()).sync_to_device(memory)?,
                    neighbors: MirroredTable::new(self.neighbors[p].entries().to_vec())
                        .sync_to_device(memory)?,
                    origins: MirroredTable::new(self.origins[p].clone()).sync_to_device(memory)?,
                    stencil: MirroredTable::new(self.compact_stencil.clone()).sync_to_device(memory)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        info!("Mirrored grid tables to {} devices", tables.len());
        Ok(DataSet::from_vec(tables))
    }
}

/// Builder for [`BlockGrid`].
#[derive(Clone)]
pub struct BlockGridBuilder {
    extent: Int3,
    block_size: i32,
    spacing: i32,
    active: Option<VoxelPredicate>,
    bc: Option<VoxelPredicate>,
    stencil: Stencil,
    topology: Topology,
    parallel: bool,
}

impl Default for BlockGridBuilder {
    fn default() -> Self {
        Self::from_config(&GridConfig::default())
    }
}

impl BlockGridBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder from a configuration. The device count comes from
    /// the backend passed to [`build`](Self::build).
    pub fn from_config(config: &GridConfig) -> Self {
        Self {
            extent: config.extent(),
            block_size: config.block_size,
            spacing: config.spacing,
            active: None,
            bc: None,
            stencil: Stencil::from(config.stencil),
            topology: config.topology,
            parallel: config.parallel_build,
        }
    }

    /// Set the domain extent.
    #[must_use]
    pub fn with_extent(mut self, extent: Int3) -> Self {
        self.extent = extent;
        self
    }

    /// Set the block size.
    #[must_use]
    pub fn with_block_size(mut self, block_size: i32) -> Self {
        self.block_size = block_size;
        self
    }

    /// Set the voxel spacing.
    #[must_use]
    pub fn with_spacing(mut self, spacing: i32) -> Self {
        self.spacing = spacing;
        self
    }

    /// Set the activity predicate. Defaults to every voxel active.
    #[must_use]
    pub fn with_active(mut self, active: impl Fn(Int3) -> bool + Send + Sync + 'static) -> Self {
        self.active = Some(Arc::new(active));
        self
    }

    /// Set the boundary-condition predicate. Defaults to never.
    #[must_use]
    pub fn with_bc(mut self, bc: impl Fn(Int3) -> bool + Send + Sync + 'static) -> Self {
        self.bc = Some(Arc::new(bc));
        self
    }

    /// Set the stencil.
    #[must_use]
    pub fn with_stencil(mut self, stencil: Stencil) -> Self {
        self.stencil = stencil;
        self
    }

    /// Set the partition topology.
    #[must_use]
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    /// Run per-partition work on the rayon pool.
    #[must_use]
    pub fn with_parallel_build(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run the construction pipeline over the devices of `backend`.
    pub fn build(self, backend: &dyn ComputeBackend) -> Result<BlockGrid> {
        let device_count = backend.device_count();
        if device_count == 0 {
            return Err(VoxelSpanError::InvalidDeviceCount { count: 0 });
        }

        let mut domain = Domain::new(self.extent, self.block_size, self.spacing, |_| true)?;
        if let Some(active) = self.active {
            domain = domain.with_active_predicate(active);
        }
        if let Some(bc) = self.bc {
            domain = domain.with_bc_predicate(bc);
        }

        self.stencil.validate(self.block_size)?;
        let compact_stencil = self.stencil.compact()?;

        info!(
            "Building block grid: extent={} block_size={} spacing={} devices={} topology={:?}",
            self.extent, self.block_size, self.spacing, device_count, self.topology
        );

        let decomposition = Decomposition::new(domain, device_count, self.topology, self.parallel)?;
        let classification = Classification::new(decomposition, self.parallel);
        let layout = SpanLayout::new(classification);

        let neighbors = build_neighbor_tables(&layout, self.parallel)?;
        let masks = build_masks(&layout, self.parallel);
        let origins = layout.all_spans().map(|p, spans| {
            (0..spans.total_count())
                .map(|address| layout.origin_of(p, address).unwrap_or_default())
                .collect::<Vec<_>>()
        });
        let halo = HaloPlan::new(&layout);
        let launch = LaunchTable::new(&layout);

        info!(
            "Block grid ready: {} active blocks, {} halo blocks per exchange",
            layout.decomposition().activity().total(),
            halo.total_blocks_exchanged()
        );

        Ok(BlockGrid {
            layout,
            masks,
            neighbors,
            origins,
            stencil: self.stencil,
            compact_stencil,
            halo,
            launch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::ByDirection;
    use voxelspan_cpu::CpuBackend;

    #[test]
    fn test_build_dense() {
        let backend = CpuBackend::new(2).unwrap();
        let grid = BlockGrid::builder()
            .with_extent(Int3::splat(8))
            .with_block_size(4)
            .build(&backend)
            .unwrap();
        assert_eq!(grid.device_count(), 2);
        let total: u32 = (0..2).map(|p| grid.spans(SetIdx(p)).own_count()).sum();
        assert_eq!(total, 8);
        assert_eq!(grid.compact_stencil().len(), 7);
    }

    #[test]
    fn test_voxel_address() {
        let backend = CpuBackend::new(2).unwrap();
        let grid = BlockGrid::builder()
            .with_extent(Int3::splat(8))
            .with_block_size(4)
            .with_active(|v| v.x != 7)
            .build(&backend)
            .unwrap();

        let voxel = Int3::new(5, 2, 6);
        let addr = grid.voxel_address(voxel).unwrap();
        assert_eq!(addr.device, SetIdx(1));
        assert_eq!(grid.origin_of(addr.device, addr.block), Some(Int3::new(4, 0, 4)));
        assert_eq!(addr.bit, 1 + 2 * 4 + 2 * 16);
        assert!(grid.is_active_voxel(addr.device, addr.block, Int3::new(1, 2, 2)));

        let inactive = Int3::new(7, 2, 6);
        assert!(!grid.is_inside_domain(inactive));
        assert_eq!(grid.voxel_address(inactive), None);
        assert_eq!(grid.owner_of_voxel(inactive), Some(SetIdx(1)));
        assert_eq!(grid.owner_of_voxel(Int3::new(8, 0, 0)), None);
    }

    #[test]
    fn test_spacing() {
        let backend = CpuBackend::new(1).unwrap();
        let grid = BlockGrid::builder()
            .with_extent(Int3::splat(16))
            .with_block_size(4)
            .with_spacing(2)
            .build(&backend)
            .unwrap();
        assert_eq!(grid.spans(SetIdx(0)).own_count(), 8);
        assert!(grid.is_inside_domain(Int3::new(2, 4, 14)));
        assert!(!grid.is_inside_domain(Int3::new(3, 4, 14)));
        let addr = grid.voxel_address(Int3::new(10, 0, 2)).unwrap();
        assert_eq!(addr.bit, 1 + 16);
    }

    #[test]
    fn test_stencil_too_deep() {
        let backend = CpuBackend::new(1).unwrap();
        let err = BlockGrid::builder()
            .with_extent(Int3::splat(8))
            .with_block_size(2)
            .with_stencil(Stencil::new(vec![Int3::new(0, 0, 3)]))
            .build(&backend)
            .unwrap_err();
        assert!(matches!(err, VoxelSpanError::StencilTooDeep { block_size: 2, .. }));
    }

    #[test]
    fn test_mirror_to_devices() {
        let backend = CpuBackend::new(2).unwrap();
        let grid = BlockGrid::builder()
            .with_extent(Int3::new(8, 8, 16))
            .with_block_size(4)
            .build(&backend)
            .unwrap();
        let tables = grid.mirror_to_devices(&backend).unwrap();
        assert_eq!(tables.len(), 2);
        for (p, t) in tables.iter() {
            assert_eq!(t.mask.read_back().unwrap(), grid.mask(p).words());
            assert_eq!(t.neighbors.read_back().unwrap(), grid.neighbor_table(p).entries());
            assert_eq!(t.origins.host(), grid.origins(p));
            assert_eq!(t.stencil.len(), 7);
        }
    }

    #[test]
    fn test_mirror_fails_when_out_of_memory() {
        let backend = CpuBackend::with_memory_budget(1, 16).unwrap();
        let grid = BlockGrid::builder()
            .with_extent(Int3::splat(8))
            .with_block_size(4)
            .build(&backend)
            .unwrap();
        let err = grid.mirror_to_devices(&backend).err().unwrap();
        assert!(err.is_memory_error());
    }

    #[test]
    fn test_from_config() {
        let config = GridConfig::builder()
            .with_extent(8, 8, 16)
            .with_block_size(4)
            .with_device_count(2)
            .with_topology(Topology::Periodic)
            .build()
            .unwrap();
        let backend = CpuBackend::from_config(&config).unwrap();
        let grid = BlockGridBuilder::from_config(&config).build(&backend).unwrap();
        let halo = grid.halo_plan();
        assert!(halo.transfer(SetIdx(0), ByDirection::Down).is_some());
        assert!(halo.transfer(SetIdx(1), ByDirection::Up).is_some());
    }
}
