//! Span layout and address resolver.
//!
//! Each partition's blocks get dense addresses `[0, own_count)`, with the
//! six categories concatenated in canonical order. Ghost ranges are then
//! resolved against the adjacent partitions: a ghost range's alias bounds
//! equal the neighbor's opposite boundary bounds, and the blocks themselves
//! are staged in a local window appended after the owned blocks:
//!
//! ```text
//! [ internal | boundary-up | boundary-down | ghost-up window | ghost-down window ]
//!   0                                     own_count                        total_count
//! ```
//!
//! A block reached through a ghost range gets the address
//! `window.first + (neighbor_address - alias.first)`.

use serde::Serialize;
use tracing::{debug, info};

use voxelspan_core::backend::SetIdx;
use voxelspan_core::data_set::DataSet;
use voxelspan_core::error::{Result, VoxelSpanError};
use voxelspan_core::geometry::Int3;

use crate::classes::{ByDirection, ByDomain, Category, CATEGORY_COUNT};
use crate::classifier::{Classification, PartitionClasses};
use crate::decomposition::Decomposition;
use crate::domain::Domain;

/// A contiguous `(first, count)` address range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Bounds {
    /// First address.
    pub first: u32,
    /// Number of addresses.
    pub count: u32,
}

impl Bounds {
    /// The empty range at 0.
    pub const EMPTY: Bounds = Bounds { first: 0, count: 0 };

    /// Create a range.
    pub const fn new(first: u32, count: u32) -> Self {
        Self { first, count }
    }

    /// One past the last address.
    #[inline]
    pub fn end(&self) -> u32 {
        self.first + self.count
    }

    /// True if `address` lies in the range.
    #[inline]
    pub fn contains(&self, address: u32) -> bool {
        self.first <= address && address < self.end()
    }

    /// True for an empty range.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Range covering two adjacent ranges.
    pub fn join(self, next: Bounds) -> Bounds {
        debug_assert_eq!(self.end(), next.first, "joined ranges must be adjacent");
        Bounds::new(self.first, self.count + next.count)
    }
}

/// Partition and face a ghost range reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GhostTarget {
    /// Neighbor partition.
    pub partition: SetIdx,
    /// Boundary face of the neighbor that is mirrored.
    pub direction: ByDirection,
}

/// Ghost range of one partition face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GhostRange {
    target: Option<GhostTarget>,
    alias: [Bounds; 2],
    window: [Bounds; 2],
}

impl GhostRange {
    /// Neighbor this range mirrors; `None` at an open end.
    pub fn target(&self) -> Option<GhostTarget> {
        self.target
    }

    /// Bounds of the mirrored range in the neighbor's address space.
    pub fn alias(&self, domain: ByDomain) -> Bounds {
        self.alias[domain.index()]
    }

    /// Both domains of the alias.
    pub fn alias_total(&self) -> Bounds {
        self.alias[0].join(self.alias[1])
    }

    /// Local storage window for the mirrored blocks.
    pub fn window(&self, domain: ByDomain) -> Bounds {
        self.window[domain.index()]
    }

    /// Both domains of the window.
    pub fn window_total(&self) -> Bounds {
        self.window[0].join(self.window[1])
    }
}

/// Address ranges of one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartitionSpans {
    categories: [Bounds; CATEGORY_COUNT],
    ghost: [GhostRange; 2],
    own_count: u32,
    total_count: u32,
}

impl PartitionSpans {
    fn from_classes(classes: &PartitionClasses) -> Self {
        let mut categories = [Bounds::EMPTY; CATEGORY_COUNT];
        let mut counter = 0u32;
        for cat in Category::ALL {
            let count = classes.count(cat);
            categories[cat.index()] = Bounds::new(counter, count);
            counter += count;
        }
        Self {
            categories,
            ghost: [GhostRange::default(); 2],
            own_count: counter,
            total_count: counter,
        }
    }

    /// Range of one category.
    pub fn bounds(&self, category: Category) -> Bounds {
        self.categories[category.index()]
    }

    /// Both internal categories.
    pub fn internal(&self) -> Bounds {
        self.bounds(Category::InternalBulk)
            .join(self.bounds(Category::InternalBc))
    }

    /// Both domains of one boundary face.
    pub fn boundary(&self, direction: ByDirection) -> Bounds {
        self.bounds(Category::boundary(direction, ByDomain::Bulk))
            .join(self.bounds(Category::boundary(direction, ByDomain::Bc)))
    }

    /// Both boundary faces.
    pub fn boundary_total(&self) -> Bounds {
        self.boundary(ByDirection::Up)
            .join(self.boundary(ByDirection::Down))
    }

    /// Ghost range of one face.
    pub fn ghost(&self, direction: ByDirection) -> &GhostRange {
        &self.ghost[direction.index()]
    }

    /// Number of owned address slots.
    pub fn own_count(&self) -> u32 {
        self.own_count
    }

    /// Owned slots plus ghost windows.
    pub fn total_count(&self) -> u32 {
        self.total_count
    }
}

/// Result of the third construction phase.
#[derive(Debug, Clone)]
pub struct SpanLayout {
    classification: Classification,
    spans: DataSet<PartitionSpans>,
}

impl SpanLayout {
    /// Assign owned ranges, then resolve ghost ranges once every partition
    /// has its owned ranges.
    pub fn new(classification: Classification) -> Self {
        let owned = classification
            .partitions()
            .map(|_, classes| PartitionSpans::from_classes(classes));

        let topology = *classification.decomposition().topology();
        let spans = owned.map(|p, own| {
            let mut spans = *own;
            let mut counter = own.own_count;
            for direction in ByDirection::ALL {
                let target = topology.adjacent(p, direction).map(|q| GhostTarget {
                    partition: q,
                    direction: direction.opposite(),
                });
                let mut ghost = GhostRange {
                    target,
                    ..Default::default()
                };
                for domain in ByDomain::ALL {
                    let alias = target
                        .map(|t| owned[t.partition].bounds(Category::boundary(t.direction, domain)))
                        .unwrap_or(Bounds::EMPTY);
                    ghost.alias[domain.index()] = alias;
                    ghost.window[domain.index()] = Bounds::new(counter, alias.count);
                    counter += alias.count;
                }
                spans.ghost[direction.index()] = ghost;
            }
            spans.total_count = counter;
            debug!(
                "Partition {}: own={} internal={:?} up={:?} down={:?} ghost-up={:?} ghost-down={:?}",
                p.idx(),
                spans.own_count,
                spans.internal(),
                spans.boundary(ByDirection::Up),
                spans.boundary(ByDirection::Down),
                spans.ghost(ByDirection::Up).window_total(),
                spans.ghost(ByDirection::Down).window_total()
            );
            spans
        });

        info!(
            "Span layout: {} owned slots, {} ghost slots",
            spans.iter().map(|(_, s)| s.own_count as u64).sum::<u64>(),
            spans
                .iter()
                .map(|(_, s)| (s.total_count - s.own_count) as u64)
                .sum::<u64>()
        );

        Self {
            classification,
            spans,
        }
    }

    /// Phase 2 result.
    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    /// Phase 1 result.
    pub fn decomposition(&self) -> &Decomposition {
        self.classification.decomposition()
    }

    /// The domain.
    pub fn domain(&self) -> &Domain {
        self.decomposition().domain()
    }

    /// Number of partitions.
    pub fn partition_count(&self) -> usize {
        self.spans.len()
    }

    /// Ranges of one partition.
    pub fn spans(&self, p: SetIdx) -> &PartitionSpans {
        &self.spans[p]
    }

    /// Ranges of every partition.
    pub fn all_spans(&self) -> &DataSet<PartitionSpans> {
        &self.spans
    }

    /// Address of a block owned by `p`, by absolute origin.
    ///
    /// A block exposed on both faces resolves to its boundary-up slot.
    pub fn address_of(&self, p: SetIdx, origin: Int3) -> Option<u32> {
        let (cat, ordinal) = self.classification.partition(p).find(origin)?;
        Some(self.spans[p].bounds(cat).first + ordinal)
    }

    /// Origin of the block stored at `address` of partition `p`, including
    /// ghost windows.
    pub fn origin_of(&self, p: SetIdx, address: u32) -> Option<Int3> {
        let spans = &self.spans[p];
        if address < spans.own_count {
            let classes = self.classification.partition(p);
            return Category::ALL.iter().find_map(|&cat| {
                let bounds = spans.bounds(cat);
                if bounds.contains(address) {
                    classes.category(cat).origin_at(address - bounds.first)
                } else {
                    None
                }
            });
        }

        ByDirection::ALL.iter().find_map(|&direction| {
            let ghost = spans.ghost(direction);
            let target = ghost.target?;
            ByDomain::ALL.iter().find_map(|&domain| {
                let window = ghost.window(domain);
                if !window.contains(address) {
                    return None;
                }
                self.classification
                    .partition(target.partition)
                    .category(Category::boundary(target.direction, domain))
                    .origin_at(address - window.first)
            })
        })
    }

    /// Address in partition `p` of the block at block offset `offset` from
    /// the block at `origin`.
    ///
    /// Looks in `p` first, then in the ghost range of the face the offset
    /// crosses. `None` means the neighbor is outside the domain, inactive,
    /// or not reachable through one ghost layer.
    pub fn neighbor_address(&self, p: SetIdx, origin: Int3, offset: Int3) -> Option<u32> {
        let domain = self.domain();
        let block = domain.block_of(origin);
        let nb = self.decomposition().topology().neighbor_block(block, offset)?;
        let nb_origin = domain.block_origin(nb);

        if let Some(address) = self.address_of(p, nb_origin) {
            return Some(address);
        }

        let direction = ByDirection::from_dz(offset.z)?;
        let ghost = self.spans[p].ghost(direction);
        let target = ghost.target?;
        let neighbor = self.classification.partition(target.partition);
        ByDomain::ALL.iter().find_map(|&by_domain| {
            neighbor
                .category(Category::boundary(target.direction, by_domain))
                .ordinal_of(nb_origin)
                .map(|ordinal| ghost.window(by_domain).first + ordinal)
        })
    }

    /// Like [`neighbor_address`](Self::neighbor_address), but a neighbor
    /// that is active yet unreachable is a configuration error.
    pub fn resolve_neighbor(&self, p: SetIdx, origin: Int3, offset: Int3) -> Result<Option<u32>> {
        if let Some(address) = self.neighbor_address(p, origin, offset) {
            return Ok(Some(address));
        }

        let dec = self.decomposition();
        let block = self.domain().block_of(origin);
        let Some(owner) = dec
            .topology()
            .neighbor_block(block, offset)
            .and_then(|nb| dec.owner_of_block(nb))
        else {
            return Ok(None);
        };

        let adjacent = ByDirection::from_dz(offset.z).and_then(|d| dec.topology().adjacent(p, d));
        if owner != p && adjacent != Some(owner) {
            return Err(VoxelSpanError::NonAdjacentNeighbor {
                partition: p.idx(),
                owner: owner.idx(),
                origin,
                offset,
            });
        }
        Err(VoxelSpanError::GhostDepthExceeded {
            partition: p.idx(),
            origin,
            offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxelspan_core::config::Topology;

    fn layout(domain: Domain, devices: usize, topology: Topology) -> SpanLayout {
        let dec = Decomposition::new(domain, devices, topology, false).unwrap();
        SpanLayout::new(Classification::new(dec, false))
    }

    fn dense(extent: Int3, devices: usize, topology: Topology) -> SpanLayout {
        layout(Domain::dense(extent, 4).unwrap(), devices, topology)
    }

    #[test]
    fn test_bounds() {
        let b = Bounds::new(4, 3);
        assert_eq!(b.end(), 7);
        assert!(b.contains(4) && b.contains(6));
        assert!(!b.contains(7));
        assert_eq!(b.join(Bounds::new(7, 2)), Bounds::new(4, 5));
        assert!(Bounds::EMPTY.is_empty());
    }

    #[test]
    fn test_ranges_are_dense() {
        let layout = dense(Int3::new(8, 8, 24), 3, Topology::Open);
        for (p, spans) in layout.all_spans().iter() {
            let mut next = 0;
            for cat in Category::ALL {
                assert_eq!(spans.bounds(cat).first, next, "partition {}", p);
                next = spans.bounds(cat).end();
            }
            assert_eq!(next, spans.own_count());
        }
    }

    #[test]
    fn test_ghost_alias_open() {
        let layout = dense(Int3::new(8, 8, 24), 3, Topology::Open);
        let first = layout.spans(SetIdx(0));
        let middle = layout.spans(SetIdx(1));
        let last = layout.spans(SetIdx(2));

        assert_eq!(first.ghost(ByDirection::Down).target(), None);
        assert_eq!(first.ghost(ByDirection::Down).window_total().count, 0);
        assert_eq!(last.ghost(ByDirection::Up).target(), None);

        assert_eq!(
            first.ghost(ByDirection::Up).alias_total(),
            middle.boundary(ByDirection::Down)
        );
        assert_eq!(
            middle.ghost(ByDirection::Down).alias_total(),
            first.boundary(ByDirection::Up)
        );
        assert_eq!(
            middle.ghost(ByDirection::Up).alias_total(),
            last.boundary(ByDirection::Down)
        );
    }

    #[test]
    fn test_windows_follow_owned_blocks() {
        let layout = dense(Int3::new(8, 8, 24), 3, Topology::Open);
        let middle = layout.spans(SetIdx(1));
        let up = middle.ghost(ByDirection::Up).window_total();
        let down = middle.ghost(ByDirection::Down).window_total();
        assert_eq!(up.first, middle.own_count());
        assert_eq!(down.first, up.end());
        assert_eq!(middle.total_count(), down.end());
    }

    #[test]
    fn test_address_round_trip() {
        let layout = dense(Int3::new(8, 8, 16), 2, Topology::Periodic);
        for (p, spans) in layout.all_spans().iter() {
            for address in 0..spans.total_count() {
                assert!(layout.origin_of(p, address).is_some(), "{} @ {}", p, address);
            }
            for address in 0..spans.own_count() {
                let origin = layout.origin_of(p, address).unwrap();
                let back = layout.address_of(p, origin).unwrap();
                assert_eq!(layout.origin_of(p, back), Some(origin));
            }
            assert_eq!(layout.origin_of(p, spans.total_count()), None);
        }
    }

    #[test]
    fn test_cross_partition_neighbor() {
        let layout = dense(Int3::new(8, 8, 16), 2, Topology::Open);
        let p0 = SetIdx(0);
        // Block (0,0,1) in partition 0 looks up at (0,0,2) in partition 1.
        let origin = Int3::new(0, 0, 4);
        let address = layout.neighbor_address(p0, origin, Int3::new(0, 0, 1)).unwrap();
        let window = layout.spans(p0).ghost(ByDirection::Up).window_total();
        assert!(window.contains(address));
        assert_eq!(layout.origin_of(p0, address), Some(Int3::new(0, 0, 8)));
    }

    #[test]
    fn test_neighbor_outside_domain() {
        let layout = dense(Int3::splat(8), 1, Topology::Open);
        let corner = Int3::ZERO;
        assert_eq!(layout.neighbor_address(SetIdx(0), corner, Int3::new(-1, 0, 0)), None);
        assert_eq!(layout.resolve_neighbor(SetIdx(0), corner, Int3::new(-1, -1, -1)).unwrap(), None);
        assert!(layout.neighbor_address(SetIdx(0), corner, Int3::new(1, 1, 1)).is_some());
    }

    #[test]
    fn test_address_of_missing_block() {
        let layout = layout(
            Domain::new(Int3::splat(8), 4, 1, |v| v.x < 4).unwrap(),
            1,
            Topology::Open,
        );
        assert_eq!(layout.address_of(SetIdx(0), Int3::new(4, 0, 0)), None);
        assert!(layout.address_of(SetIdx(0), Int3::new(0, 0, 0)).is_some());
    }

    #[test]
    fn test_two_block_reach_is_fatal() {
        // One block per slab: a two-block jump in z skips the adjacent partition.
        let layout = dense(Int3::new(4, 4, 12), 3, Topology::Open);
        let err = layout
            .resolve_neighbor(SetIdx(0), Int3::ZERO, Int3::new(0, 0, 2))
            .unwrap_err();
        assert!(matches!(
            err,
            VoxelSpanError::NonAdjacentNeighbor { partition: 0, owner: 2, .. }
        ));
        assert!(err.is_config_error());
    }

    #[test]
    fn test_two_block_reach_into_adjacent_partition() {
        // Partition 1 spans two slices; the second one is not in its boundary set.
        let layout = dense(Int3::new(4, 4, 16), 2, Topology::Open);
        let err = layout
            .resolve_neighbor(SetIdx(0), Int3::new(0, 0, 4), Int3::new(0, 0, 2))
            .unwrap_err();
        assert!(matches!(err, VoxelSpanError::GhostDepthExceeded { partition: 0, .. }));
    }

    #[test]
    fn test_periodic_wrap_neighbor() {
        let layout = dense(Int3::new(4, 4, 16), 2, Topology::Periodic);
        let p0 = SetIdx(0);
        let address = layout
            .neighbor_address(p0, Int3::ZERO, Int3::new(0, 0, -1))
            .unwrap();
        assert!(layout
            .spans(p0)
            .ghost(ByDirection::Down)
            .window_total()
            .contains(address));
        assert_eq!(layout.origin_of(p0, address), Some(Int3::new(0, 0, 12)));
    }
}
