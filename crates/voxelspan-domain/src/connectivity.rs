//! Neighbor-block tables.
//!
//! Each owned block gets 26 entries, one per non-zero offset of its 3x3x3
//! neighborhood, holding the neighbor's address (owned slot or ghost
//! window) or [`NO_NEIGHBOR`].
//!
//! Direction `i` corresponds to [`NEIGHBOR_OFFSETS`]`[i]`, enumerated z, y,
//! x from -1 to 1 with the center skipped.

use tracing::info;

use voxelspan_core::backend::SetIdx;
use voxelspan_core::data_set::DataSet;
use voxelspan_core::error::Result;
use voxelspan_core::geometry::Int3;

use crate::exec::try_map_partitions;
use crate::layout::SpanLayout;

/// Number of neighbor directions.
pub const NEIGHBOR_COUNT: usize = 26;

/// Sentinel for a missing neighbor.
pub const NO_NEIGHBOR: u32 = u32::MAX;

/// The 26 block offsets in table order.
pub const NEIGHBOR_OFFSETS: [Int3; NEIGHBOR_COUNT] = build_offsets();

const fn build_offsets() -> [Int3; NEIGHBOR_COUNT] {
    let mut offsets = [Int3::ZERO; NEIGHBOR_COUNT];
    let mut i = 0;
    let mut z = -1;
    while z <= 1 {
        let mut y = -1;
        while y <= 1 {
            let mut x = -1;
            while x <= 1 {
                if !(x == 0 && y == 0 && z == 0) {
                    offsets[i] = Int3::new(x, y, z);
                    i += 1;
                }
                x += 1;
            }
            y += 1;
        }
        z += 1;
    }
    offsets
}

/// Table index of a block offset; `None` for the center or offsets
/// outside the 3x3x3 neighborhood.
pub fn direction_index(offset: Int3) -> Option<usize> {
    if offset == Int3::ZERO || offset.max_abs() > 1 {
        return None;
    }
    let idx = ((offset.x + 1) + (offset.y + 1) * 3 + (offset.z + 1) * 9) as usize;
    Some(if idx > 13 { idx - 1 } else { idx })
}

/// Neighbor addresses of every owned block of one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborTable {
    entries: Vec<u32>,
}

impl NeighborTable {
    /// Number of blocks covered.
    pub fn block_count(&self) -> usize {
        self.entries.len() / NEIGHBOR_COUNT
    }

    /// Neighbor of `address` in direction `direction`.
    #[inline]
    pub fn get(&self, address: u32, direction: usize) -> u32 {
        self.entries[address as usize * NEIGHBOR_COUNT + direction]
    }

    /// Neighbor of `address` at a block offset.
    pub fn neighbor(&self, address: u32, offset: Int3) -> Option<u32> {
        let entry = self.get(address, direction_index(offset)?);
        (entry != NO_NEIGHBOR).then_some(entry)
    }

    /// The 26 entries of one block.
    pub fn row(&self, address: u32) -> &[u32] {
        let start = address as usize * NEIGHBOR_COUNT;
        &self.entries[start..start + NEIGHBOR_COUNT]
    }

    /// Flat table, block-major.
    pub fn entries(&self) -> &[u32] {
        &self.entries
    }

    /// Consume into the flat table.
    pub fn into_entries(self) -> Vec<u32> {
        self.entries
    }
}

/// Build the neighbor table of one partition.
pub fn build_neighbor_table(layout: &SpanLayout, p: SetIdx) -> Result<NeighborTable> {
    let own = layout.spans(p).own_count();
    let mut entries = vec![NO_NEIGHBOR; own as usize * NEIGHBOR_COUNT];
    for address in 0..own {
        // Owned addresses always map back to an origin.
        let Some(origin) = layout.origin_of(p, address) else {
            continue;
        };
        let row = address as usize * NEIGHBOR_COUNT;
        for (dir, offset) in NEIGHBOR_OFFSETS.iter().enumerate() {
            if let Some(nb) = layout.resolve_neighbor(p, origin, *offset)? {
                entries[row + dir] = nb;
            }
        }
    }
    Ok(NeighborTable { entries })
}

/// Build the neighbor tables of every partition.
pub fn build_neighbor_tables(layout: &SpanLayout, parallel: bool) -> Result<DataSet<NeighborTable>> {
    let tables = try_map_partitions(layout.partition_count(), parallel, |p| {
        build_neighbor_table(layout, p)
    })?;
    info!(
        "Built neighbor tables for {} blocks",
        tables.iter().map(|(_, t)| t.block_count()).sum::<usize>()
    );
    Ok(tables)
}
