//! Block classifier.
//!
//! For each partition, every active block is tagged internal or boundary
//! (with the face it is exposed on) and bulk or bc. A block is boundary
//! when one of its 26 neighbors is active and owned by another partition;
//! inactive or out-of-domain neighbors never make a block boundary. A
//! block exposed on both faces is recorded in both boundary sets.
//!
//! Reverse indices are keyed by absolute block origin.

use std::collections::HashMap;

use tracing::{debug, info};

use voxelspan_core::backend::SetIdx;
use voxelspan_core::data_set::DataSet;
use voxelspan_core::geometry::Int3;

use crate::classes::{ByDirection, ByDomain, Category, CATEGORY_COUNT};
use crate::connectivity::NEIGHBOR_OFFSETS;
use crate::decomposition::Decomposition;
use crate::exec::map_partitions;

/// Blocks of one category, in insertion order, with a reverse index.
#[derive(Debug, Clone, Default)]
pub struct CategoryBlocks {
    origins: Vec<Int3>,
    ordinals: HashMap<Int3, u32>,
}

impl CategoryBlocks {
    fn push(&mut self, origin: Int3) {
        let ordinal = self.origins.len() as u32;
        self.origins.push(origin);
        self.ordinals.insert(origin, ordinal);
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.origins.len()
    }

    /// True if no block has this category.
    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    /// Block origins in insertion order.
    pub fn origins(&self) -> &[Int3] {
        &self.origins
    }

    /// Ordinal of a block within the category.
    #[inline]
    pub fn ordinal_of(&self, origin: Int3) -> Option<u32> {
        self.ordinals.get(&origin).copied()
    }

    /// Origin of the block at `ordinal`.
    #[inline]
    pub fn origin_at(&self, ordinal: u32) -> Option<Int3> {
        self.origins.get(ordinal as usize).copied()
    }
}

/// Classified blocks of one partition.
#[derive(Debug, Clone, Default)]
pub struct PartitionClasses {
    categories: [CategoryBlocks; CATEGORY_COUNT],
}

impl PartitionClasses {
    /// Blocks of one category.
    pub fn category(&self, category: Category) -> &CategoryBlocks {
        &self.categories[category.index()]
    }

    /// Number of blocks in one category.
    pub fn count(&self, category: Category) -> u32 {
        self.categories[category.index()].len() as u32
    }

    /// First category (in canonical order) containing the block.
    pub fn find(&self, origin: Int3) -> Option<(Category, u32)> {
        Category::ALL
            .iter()
            .find_map(|&cat| self.category(cat).ordinal_of(origin).map(|ord| (cat, ord)))
    }

    /// Number of address slots (dual-face blocks count twice).
    pub fn slot_count(&self) -> u32 {
        self.categories.iter().map(|c| c.len() as u32).sum()
    }
}

/// Result of the second construction phase.
#[derive(Debug, Clone)]
pub struct Classification {
    decomposition: Decomposition,
    partitions: DataSet<PartitionClasses>,
}

impl Classification {
    /// Classify every active block of every partition.
    pub fn new(decomposition: Decomposition, parallel: bool) -> Self {
        let partitions = map_partitions(decomposition.partition_count(), parallel, |p| {
            classify_partition(&decomposition, p)
        });

        let boundary: u32 = partitions
            .iter()
            .map(|(_, c)| c.slot_count() - c.count(Category::InternalBulk) - c.count(Category::InternalBc))
            .sum();
        info!(
            "Classified {} partitions ({} boundary slots)",
            partitions.len(),
            boundary
        );

        Self {
            decomposition,
            partitions,
        }
    }

    /// Phase 1 result.
    pub fn decomposition(&self) -> &Decomposition {
        &self.decomposition
    }

    /// Classes of one partition.
    pub fn partition(&self, p: SetIdx) -> &PartitionClasses {
        &self.partitions[p]
    }

    /// Classes of every partition.
    pub fn partitions(&self) -> &DataSet<PartitionClasses> {
        &self.partitions
    }
}

/// Faces on which an active block sees an active block of another partition.
pub(crate) fn exposed_faces(dec: &Decomposition, p: SetIdx, block: Int3) -> (bool, bool) {
    let topology = dec.topology();
    let activity = dec.activity();
    let mut up = false;
    let mut down = false;
    for offset in NEIGHBOR_OFFSETS {
        let Some(direction) = ByDirection::from_dz(offset.z) else {
            continue;
        };
        let Some(nb) = topology.neighbor_block(block, offset) else {
            continue;
        };
        if !activity.is_active(nb) || dec.partition(p).contains_z(nb.z) {
            continue;
        }
        match direction {
            ByDirection::Up => up = true,
            ByDirection::Down => down = true,
        }
    }
    (up, down)
}

fn classify_partition(dec: &Decomposition, p: SetIdx) -> PartitionClasses {
    let domain = dec.domain();
    let activity = dec.activity();
    let span = activity.span();
    let range = *dec.partition(p);
    let mut classes = PartitionClasses::default();

    for z in range.z_first..range.z_last {
        for y in 0..span.y {
            for x in 0..span.x {
                let block = Int3::new(x, y, z);
                if !activity.is_active(block) {
                    continue;
                }
                let origin = domain.block_origin(block);
                let by_domain = if activity.is_bc(block) {
                    ByDomain::Bc
                } else {
                    ByDomain::Bulk
                };

                let (up, down) = exposed_faces(dec, p, block);
                if !up && !down {
                    classes.categories[Category::internal(by_domain).index()].push(origin);
                }
                if up {
                    classes.categories[Category::boundary(ByDirection::Up, by_domain).index()]
                        .push(origin);
                }
                if down {
                    classes.categories[Category::boundary(ByDirection::Down, by_domain).index()]
                        .push(origin);
                }
            }
        }
    }

    debug!(
        "Partition {}: {}",
        p.idx(),
        Category::ALL
            .iter()
            .map(|c| format!("{}={}", c, classes.count(*c)))
            .collect::<Vec<_>>()
            .join(" ")
    );
    classes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use voxelspan_core::config::Topology;

    fn classify(extent: Int3, devices: usize, topology: Topology) -> Classification {
        let domain = Domain::dense(extent, 4).unwrap();
        let dec = Decomposition::new(domain, devices, topology, false).unwrap();
        Classification::new(dec, false)
    }

    #[test]
    fn test_single_device_all_internal() {
        let classes = classify(Int3::splat(8), 1, Topology::Open);
        let part = classes.partition(SetIdx(0));
        assert_eq!(part.count(Category::InternalBulk), 8);
        assert_eq!(part.slot_count(), 8);
    }

    #[test]
    fn test_two_devices_dense() {
        // 2x2x4 blocks split into z=[0,2) and z=[2,4).
        let classes = classify(Int3::new(8, 8, 16), 2, Topology::Open);
        let p0 = classes.partition(SetIdx(0));
        let p1 = classes.partition(SetIdx(1));

        assert_eq!(p0.count(Category::InternalBulk), 4);
        assert_eq!(p0.count(Category::BoundaryUpBulk), 4);
        assert_eq!(p0.count(Category::BoundaryDownBulk), 0);

        assert_eq!(p1.count(Category::BoundaryDownBulk), 4);
        assert_eq!(p1.count(Category::BoundaryUpBulk), 0);
        assert_eq!(p1.count(Category::InternalBulk), 4);

        assert!(p0
            .category(Category::BoundaryUpBulk)
            .origins()
            .iter()
            .all(|o| o.z == 4));
    }

    #[test]
    fn test_inactive_neighbor_does_not_force_boundary() {
        // Only the lower half of the domain is active; the upper partition
        // is empty of active voxels apart from a far corner.
        let domain = Domain::new(Int3::new(8, 8, 16), 4, 1, |v| v.z < 8 || (v.x >= 4 && v.y >= 4 && v.z >= 12))
            .unwrap();
        let dec = Decomposition::new(domain, 2, Topology::Open, false).unwrap();
        let classes = Classification::new(dec, false);
        let p0 = classes.partition(SetIdx(0));
        // Block (0,0,1) has no active neighbor above it.
        let origin = Int3::new(0, 0, 4);
        assert_eq!(p0.find(origin).map(|(c, _)| c), Some(Category::InternalBulk));
    }

    #[test]
    fn test_bc_tag() {
        let domain = Domain::dense(Int3::splat(8), 4).unwrap().with_bc(|v| v.x == 0);
        let dec = Decomposition::new(domain, 1, Topology::Open, false).unwrap();
        let classes = Classification::new(dec, false);
        let part = classes.partition(SetIdx(0));
        assert_eq!(part.count(Category::InternalBc), 4);
        assert_eq!(part.count(Category::InternalBulk), 4);
        assert!(part
            .category(Category::InternalBc)
            .origins()
            .iter()
            .all(|o| o.x == 0));
    }

    #[test]
    fn test_dual_face_block() {
        // Three slabs of one block each: the middle one touches both faces.
        let classes = classify(Int3::new(4, 4, 12), 3, Topology::Open);
        let mid = classes.partition(SetIdx(1));
        let origin = Int3::new(0, 0, 4);
        assert_eq!(mid.category(Category::BoundaryUpBulk).ordinal_of(origin), Some(0));
        assert_eq!(mid.category(Category::BoundaryDownBulk).ordinal_of(origin), Some(0));
        assert_eq!(mid.count(Category::InternalBulk), 0);
    }

    #[test]
    fn test_periodic_wrap_creates_boundary() {
        let open = classify(Int3::new(4, 4, 16), 2, Topology::Open);
        let periodic = classify(Int3::new(4, 4, 16), 2, Topology::Periodic);
        assert_eq!(open.partition(SetIdx(0)).count(Category::BoundaryDownBulk), 0);
        assert_eq!(periodic.partition(SetIdx(0)).count(Category::BoundaryDownBulk), 1);
        assert_eq!(periodic.partition(SetIdx(1)).count(Category::BoundaryUpBulk), 1);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let domain = Domain::new(Int3::new(16, 16, 32), 4, 1, |v| (v.x * v.y + v.z) % 7 != 0).unwrap();
        let dec = Decomposition::new(domain, 3, Topology::Open, false).unwrap();
        let seq = Classification::new(dec.clone(), false);
        let par = Classification::new(dec, true);
        for p in 0..3 {
            for cat in Category::ALL {
                assert_eq!(
                    seq.partition(SetIdx(p)).category(cat).origins(),
                    par.partition(SetIdx(p)).category(cat).origins()
                );
            }
        }
    }
}
