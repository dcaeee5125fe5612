//! Partition adjacency along the decomposition axis.
//!
//! The domain is cut into z-slabs. With [`Topology::Open`] the first slab
//! has no down neighbor and the last no up neighbor. With
//! [`Topology::Periodic`] the slabs form a ring and block neighbors wrap
//! around in z. Only populated slabs (at least one slice) join the ring.

use voxelspan_core::backend::SetIdx;
use voxelspan_core::config::Topology;
use voxelspan_core::geometry::Int3;

use crate::classes::ByDirection;

/// Adjacency rules for a fixed partition count and block span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionTopology {
    kind: Topology,
    partition_count: usize,
    span: Int3,
    ring_first: usize,
    ring_len: usize,
}

impl PartitionTopology {
    /// Create the adjacency rules.
    pub fn new(kind: Topology, partition_count: usize, span: Int3) -> Self {
        Self {
            kind,
            partition_count,
            span,
            ring_first: 0,
            ring_len: partition_count,
        }
    }

    /// Restrict the periodic ring to the populated partitions
    /// `first..first + len`. Partitions outside it have no periodic neighbor.
    #[must_use]
    pub fn with_ring(mut self, first: usize, len: usize) -> Self {
        self.ring_first = first.min(self.partition_count);
        self.ring_len = len.min(self.partition_count - self.ring_first);
        self
    }

    /// Topology kind.
    pub fn kind(&self) -> Topology {
        self.kind
    }

    /// Number of partitions.
    pub fn partition_count(&self) -> usize {
        self.partition_count
    }

    /// Partition adjacent to `p` across its `direction` face, if any.
    ///
    /// A single partition never has a neighbor, even when periodic.
    pub fn adjacent(&self, p: SetIdx, direction: ByDirection) -> Option<SetIdx> {
        let n = self.partition_count;
        if n <= 1 {
            return None;
        }
        match (self.kind, direction) {
            (Topology::Open, ByDirection::Up) => (p.idx() + 1 < n).then(|| SetIdx(p.idx() + 1)),
            (Topology::Open, ByDirection::Down) => p.idx().checked_sub(1).map(SetIdx),
            (Topology::Periodic, _) => self.ring_neighbor(p, direction),
        }
    }

    fn ring_neighbor(&self, p: SetIdx, direction: ByDirection) -> Option<SetIdx> {
        let len = self.ring_len;
        let i = p.idx().checked_sub(self.ring_first).filter(|i| *i < len)?;
        if len <= 1 {
            return None;
        }
        let j = match direction {
            ByDirection::Up => (i + 1) % len,
            ByDirection::Down => (i + len - 1) % len,
        };
        Some(SetIdx(self.ring_first + j))
    }

    /// Block coordinate reached from `block` by `offset`, or `None` past
    /// the domain. Periodic topologies wrap z.
    pub fn neighbor_block(&self, block: Int3, offset: Int3) -> Option<Int3> {
        let mut nb = block + offset;
        if self.kind == Topology::Periodic {
            nb.z = nb.z.rem_euclid(self.span.z);
        }
        nb.in_bounds(self.span).then_some(nb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_adjacency() {
        let topo = PartitionTopology::new(Topology::Open, 3, Int3::splat(4));
        assert_eq!(topo.adjacent(SetIdx(0), ByDirection::Down), None);
        assert_eq!(topo.adjacent(SetIdx(0), ByDirection::Up), Some(SetIdx(1)));
        assert_eq!(topo.adjacent(SetIdx(2), ByDirection::Up), None);
        assert_eq!(topo.adjacent(SetIdx(2), ByDirection::Down), Some(SetIdx(1)));
    }

    #[test]
    fn test_periodic_adjacency() {
        let topo = PartitionTopology::new(Topology::Periodic, 3, Int3::splat(4));
        assert_eq!(topo.adjacent(SetIdx(0), ByDirection::Down), Some(SetIdx(2)));
        assert_eq!(topo.adjacent(SetIdx(2), ByDirection::Up), Some(SetIdx(0)));
    }

    #[test]
    fn test_periodic_ring_skips_empty_partitions() {
        // Partitions 2 and 3 own no slices.
        let topo = PartitionTopology::new(Topology::Periodic, 4, Int3::splat(4)).with_ring(0, 2);
        assert_eq!(topo.adjacent(SetIdx(1), ByDirection::Up), Some(SetIdx(0)));
        assert_eq!(topo.adjacent(SetIdx(0), ByDirection::Down), Some(SetIdx(1)));
        assert_eq!(topo.adjacent(SetIdx(2), ByDirection::Up), None);
        assert_eq!(topo.adjacent(SetIdx(3), ByDirection::Down), None);

        let lone = PartitionTopology::new(Topology::Periodic, 3, Int3::splat(4)).with_ring(2, 1);
        for p in 0..3 {
            assert_eq!(lone.adjacent(SetIdx(p), ByDirection::Up), None);
        }
    }

    #[test]
    fn test_single_partition_has_no_neighbors() {
        for kind in [Topology::Open, Topology::Periodic] {
            let topo = PartitionTopology::new(kind, 1, Int3::splat(4));
            assert_eq!(topo.adjacent(SetIdx(0), ByDirection::Up), None);
            assert_eq!(topo.adjacent(SetIdx(0), ByDirection::Down), None);
        }
    }

    #[test]
    fn test_neighbor_block_wrap() {
        let span = Int3::new(2, 2, 4);
        let open = PartitionTopology::new(Topology::Open, 2, span);
        let periodic = PartitionTopology::new(Topology::Periodic, 2, span);

        let corner = Int3::new(0, 0, 3);
        assert_eq!(open.neighbor_block(corner, Int3::new(0, 0, 1)), None);
        assert_eq!(
            periodic.neighbor_block(corner, Int3::new(0, 0, 1)),
            Some(Int3::new(0, 0, 0))
        );
        // x and y never wrap.
        assert_eq!(periodic.neighbor_block(corner, Int3::new(-1, 0, 0)), None);
    }
}
