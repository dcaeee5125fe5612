//! Data views and kernel launch parameters.

use serde::{Deserialize, Serialize};

use voxelspan_core::backend::SetIdx;
use voxelspan_core::data_set::DataSet;

use crate::layout::{Bounds, PartitionSpans, SpanLayout};

/// Address subset a kernel is launched over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataView {
    /// Every owned block.
    Standard,
    /// Internal blocks only; can run while halos are in flight.
    Internal,
    /// Boundary blocks of both faces.
    Boundary,
}

impl DataView {
    /// All views.
    pub const ALL: [DataView; 3] = [DataView::Standard, DataView::Internal, DataView::Boundary];

    /// Address range of this view in a partition.
    pub fn bounds(self, spans: &PartitionSpans) -> Bounds {
        match self {
            DataView::Standard => Bounds::new(0, spans.own_count()),
            DataView::Internal => spans.internal(),
            DataView::Boundary => spans.boundary_total(),
        }
    }
}

/// Launch extent of one view on one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LaunchParams {
    /// First block address.
    pub first: u32,
    /// Number of blocks.
    pub block_count: u32,
    /// Threads per launched block (one per voxel).
    pub threads_per_block: u32,
}

impl LaunchParams {
    /// Total number of threads.
    pub fn total_threads(&self) -> u64 {
        self.block_count as u64 * self.threads_per_block as u64
    }
}

/// Launch parameters of every view on every device.
#[derive(Debug, Clone)]
pub struct LaunchTable {
    params: DataSet<[LaunchParams; 3]>,
}

impl LaunchTable {
    /// Derive launch parameters from a layout.
    pub fn new(layout: &SpanLayout) -> Self {
        let threads_per_block = layout.domain().voxels_per_block() as u32;
        let params = layout.all_spans().map(|_, spans| {
            DataView::ALL.map(|view| {
                let bounds = view.bounds(spans);
                LaunchParams {
                    first: bounds.first,
                    block_count: bounds.count,
                    threads_per_block,
                }
            })
        });
        Self { params }
    }

    /// Launch parameters of one view on one device.
    pub fn get(&self, p: SetIdx, view: DataView) -> LaunchParams {
        self.params[p][view as usize]
    }
}
