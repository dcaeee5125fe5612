//! Halo exchange plan.
//!
//! For each device and face: which owned range to send, and where the
//! peer's matching range lands locally. Moving the bytes is up to the
//! transport layer.

use voxelspan_core::backend::SetIdx;
use voxelspan_core::data_set::DataSet;

use crate::classes::ByDirection;
use crate::layout::{Bounds, SpanLayout};

/// One face of one device's halo exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HaloTransfer {
    /// Face of this device.
    pub direction: ByDirection,
    /// Device across that face.
    pub peer: SetIdx,
    /// Owned boundary blocks sent to the peer.
    pub send: Bounds,
    /// Local ghost window receiving the peer's boundary blocks.
    pub recv_window: Bounds,
    /// The peer's boundary blocks, in the peer's address space.
    pub recv_alias: Bounds,
}

/// Halo transfers of every device.
#[derive(Debug, Clone)]
pub struct HaloPlan {
    transfers: DataSet<[Option<HaloTransfer>; 2]>,
}

impl HaloPlan {
    /// Derive the plan from a finished layout.
    pub fn new(layout: &SpanLayout) -> Self {
        let transfers = layout.all_spans().map(|_, spans| {
            ByDirection::ALL.map(|direction| {
                let ghost = spans.ghost(direction);
                ghost.target().map(|target| HaloTransfer {
                    direction,
                    peer: target.partition,
                    send: spans.boundary(direction),
                    recv_window: ghost.window_total(),
                    recv_alias: ghost.alias_total(),
                })
            })
        });
        Self { transfers }
    }

    /// Transfer of one device across one face.
    pub fn transfer(&self, p: SetIdx, direction: ByDirection) -> Option<&HaloTransfer> {
        self.transfers[p][direction.index()].as_ref()
    }

    /// All transfers of one device.
    pub fn transfers(&self, p: SetIdx) -> impl Iterator<Item = &HaloTransfer> {
        self.transfers[p].iter().flatten()
    }

    /// Number of devices.
    pub fn device_count(&self) -> usize {
        self.transfers.len()
    }

    /// Blocks received across all devices per exchange.
    pub fn total_blocks_exchanged(&self) -> u64 {
        self.transfers
            .iter()
            .flat_map(|(_, t)| t.iter().flatten())
            .map(|t| t.recv_window.count as u64)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classification;
    use crate::decomposition::Decomposition;
    use crate::domain::Domain;
    use voxelspan_core::config::Topology;
    use voxelspan_core::geometry::Int3;

    fn plan(devices: usize, topology: Topology) -> (SpanLayout, HaloPlan) {
        let domain = Domain::dense(Int3::new(8, 8, 32), 4).unwrap();
        let dec = Decomposition::new(domain, devices, topology, false).unwrap();
        let layout = SpanLayout::new(Classification::new(dec, false));
        let plan = HaloPlan::new(&layout);
        (layout, plan)
    }

    #[test]
    fn test_send_matches_peer_receive() {
        for topology in [Topology::Open, Topology::Periodic] {
            let (_, plan) = plan(4, topology);
            for p in 0..plan.device_count() {
                for transfer in plan.transfers(SetIdx(p)) {
                    let back = plan
                        .transfer(transfer.peer, transfer.direction.opposite())
                        .unwrap();
                    assert_eq!(back.peer, SetIdx(p));
                    assert_eq!(transfer.send, back.recv_alias);
                    assert_eq!(transfer.send.count, back.recv_window.count);
                }
            }
        }
    }

    #[test]
    fn test_open_ends_have_no_transfer() {
        let (_, plan) = plan(3, Topology::Open);
        assert!(plan.transfer(SetIdx(0), ByDirection::Down).is_none());
        assert!(plan.transfer(SetIdx(2), ByDirection::Up).is_none());
        assert_eq!(plan.transfers(SetIdx(1)).count(), 2);
    }

    #[test]
    fn test_single_device_exchanges_nothing() {
        let (_, plan) = plan(1, Topology::Periodic);
        assert_eq!(plan.transfers(SetIdx(0)).count(), 0);
        assert_eq!(plan.total_blocks_exchanged(), 0);
    }

    #[test]
    fn test_total_blocks() {
        // 2x2 blocks per slice; two interior faces, each exchanged both ways.
        let (_, plan) = plan(3, Topology::Open);
        assert_eq!(plan.total_blocks_exchanged(), 4 * 4);
    }
}
