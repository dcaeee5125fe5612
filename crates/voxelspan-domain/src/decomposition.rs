//! Domain decomposer: splits block space into per-device z-slabs.
//!
//! Active blocks are counted per z-slice. With `avg = ceil(total / N)`,
//! slices are handed to device 0 until its running count reaches `avg`,
//! then to device 1, and so on. The last device takes whatever is left up
//! to the end of the axis, so ranges are contiguous and exhaustive. When
//! the earlier devices already consume every slice, the remaining ranges
//! are empty and sit at the end of the axis.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use voxelspan_core::backend::SetIdx;
use voxelspan_core::config::Topology;
use voxelspan_core::data_set::DataSet;
use voxelspan_core::error::{Result, VoxelSpanError};
use voxelspan_core::geometry::Int3;

use crate::domain::Domain;
use crate::topology::PartitionTopology;

/// Per-block activity and boundary-condition flags, evaluated once.
#[derive(Debug, Clone)]
pub struct BlockActivity {
    span: Int3,
    active: Vec<bool>,
    bc: Vec<bool>,
    slice_counts: Vec<u64>,
}

impl BlockActivity {
    /// Evaluate both predicates for every block of the domain.
    pub fn evaluate(domain: &Domain, parallel: bool) -> Self {
        let span = domain.block_span();
        let slice = |z: i32| -> Vec<(bool, bool)> {
            let mut flags = Vec::with_capacity((span.x * span.y) as usize);
            for y in 0..span.y {
                for x in 0..span.x {
                    let block = Int3::new(x, y, z);
                    let active = domain.is_block_active(block);
                    flags.push((active, active && domain.is_block_bc(block)));
                }
            }
            flags
        };

        let slices: Vec<Vec<(bool, bool)>> = if parallel {
            (0..span.z).into_par_iter().map(slice).collect()
        } else {
            (0..span.z).map(slice).collect()
        };

        let slice_counts = slices
            .iter()
            .map(|s| s.iter().filter(|(a, _)| *a).count() as u64)
            .collect();
        let (active, bc) = slices.into_iter().flatten().unzip();

        Self {
            span,
            active,
            bc,
            slice_counts,
        }
    }

    /// Block span.
    pub fn span(&self) -> Int3 {
        self.span
    }

    /// True if the block exists and has an active voxel.
    #[inline]
    pub fn is_active(&self, block: Int3) -> bool {
        block.in_bounds(self.span) && self.active[block.pitch(self.span) as usize]
    }

    /// True if the block exists, is active and has a bc voxel.
    #[inline]
    pub fn is_bc(&self, block: Int3) -> bool {
        block.in_bounds(self.span) && self.bc[block.pitch(self.span) as usize]
    }

    /// Active blocks per z-slice.
    pub fn slice_counts(&self) -> &[u64] {
        &self.slice_counts
    }

    /// Total number of active blocks.
    pub fn total(&self) -> u64 {
        self.slice_counts.iter().sum()
    }
}

/// Half-open z range of block slices owned by one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartitionRange {
    /// First owned slice.
    pub z_first: i32,
    /// One past the last owned slice.
    pub z_last: i32,
    /// Active blocks in the range.
    pub block_count: u64,
}

impl PartitionRange {
    /// Number of slices.
    pub fn len(&self) -> i32 {
        self.z_last - self.z_first
    }

    /// True when the range holds no slice.
    pub fn is_empty(&self) -> bool {
        self.z_last == self.z_first
    }

    /// True if slice `z` belongs to this range.
    #[inline]
    pub fn contains_z(&self, z: i32) -> bool {
        self.z_first <= z && z < self.z_last
    }
}

/// Split slice counts into `devices` contiguous ranges.
pub fn split_slices(slice_counts: &[u64], devices: usize) -> Vec<PartitionRange> {
    let total: u64 = slice_counts.iter().sum();
    let avg = total.div_ceil(devices as u64);
    let extent = slice_counts.len() as i32;

    let mut ranges = Vec::with_capacity(devices);
    let mut z = 0i32;
    for device in 0..devices {
        let z_first = z;
        let mut block_count = 0u64;
        let is_last = device + 1 == devices;
        while z < extent && (is_last || block_count < avg) {
            block_count += slice_counts[z as usize];
            z += 1;
        }
        ranges.push(PartitionRange {
            z_first,
            z_last: z,
            block_count,
        });
    }
    ranges
}

/// Result of the first construction phase.
#[derive(Debug, Clone)]
pub struct Decomposition {
    domain: Domain,
    activity: BlockActivity,
    topology: PartitionTopology,
    partitions: DataSet<PartitionRange>,
}

impl Decomposition {
    /// Evaluate block activity and split the domain across `device_count` devices.
    pub fn new(domain: Domain, device_count: usize, topology: Topology, parallel: bool) -> Result<Self> {
        if device_count == 0 {
            return Err(VoxelSpanError::InvalidDeviceCount { count: 0 });
        }

        let activity = BlockActivity::evaluate(&domain, parallel);
        let ranges = split_slices(activity.slice_counts(), device_count);
        let span = activity.span();

        info!(
            "Decomposed {} active blocks (span {}) across {} devices",
            activity.total(),
            span,
            device_count
        );
        if activity.total() == 0 {
            warn!("Domain has no active blocks");
        }
        for (i, range) in ranges.iter().enumerate() {
            debug!(
                "Partition {}: z=[{}, {}) blocks={}",
                i, range.z_first, range.z_last, range.block_count
            );
            if range.block_count == 0 && activity.total() > 0 {
                warn!("Partition {} owns no active blocks", i);
            }
        }

        // Populated partitions form one contiguous index range.
        let ring_first = ranges.iter().position(|r| !r.is_empty()).unwrap_or(0);
        let ring_len = ranges.iter().filter(|r| !r.is_empty()).count();
        let topology = PartitionTopology::new(topology, device_count, span).with_ring(ring_first, ring_len);

        Ok(Self {
            domain,
            activity,
            topology,
            partitions: DataSet::from_vec(ranges),
        })
    }

    /// The domain.
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Per-block flags.
    pub fn activity(&self) -> &BlockActivity {
        &self.activity
    }

    /// Partition adjacency.
    pub fn topology(&self) -> &PartitionTopology {
        &self.topology
    }

    /// Per-device z ranges.
    pub fn partitions(&self) -> &DataSet<PartitionRange> {
        &self.partitions
    }

    /// Range of one device.
    pub fn partition(&self, p: SetIdx) -> &PartitionRange {
        &self.partitions[p]
    }

    /// Number of devices.
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Device owning block slice `z`.
    pub fn owner_of_z(&self, z: i32) -> Option<SetIdx> {
        self.partitions
            .iter()
            .find(|(_, range)| range.contains_z(z))
            .map(|(idx, _)| idx)
    }

    /// Device owning an active block.
    pub fn owner_of_block(&self, block: Int3) -> Option<SetIdx> {
        if self.activity.is_active(block) {
            self.owner_of_z(block.z)
        } else {
            None
        }
    }
}
