//! Per-block active-voxel bitmasks.
//!
//! Bit `x + y * bs + z * bs²` of a block's mask is set when the local
//! voxel `(x, y, z)` is active. Each block takes `ceil(bs³ / 32)` words.
//!
//! Owned blocks are evaluated first for every partition. Ghost windows are
//! then filled by copying the words of the mirrored boundary blocks from
//! the adjacent partitions, so each partition holds one ghost layer.

use tracing::info;

use voxelspan_core::backend::SetIdx;
use voxelspan_core::data_set::DataSet;
use voxelspan_core::geometry::Int3;

use crate::classes::{ByDirection, ByDomain};
use crate::exec::map_partitions;
use crate::layout::SpanLayout;

/// Bit index of a block-local voxel.
#[inline]
pub fn local_bit(local: Int3, block_size: i32) -> u32 {
    (local.x + local.y * block_size + local.z * block_size * block_size) as u32
}

/// Mask words needed per block.
#[inline]
pub fn words_per_block(block_size: i32) -> usize {
    (block_size as usize).pow(3).div_ceil(32)
}

/// Active-voxel masks of one partition, owned blocks and ghost windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveMask {
    block_size: i32,
    words_per_block: usize,
    words: Vec<u32>,
}

impl ActiveMask {
    /// Words of one block.
    pub fn block_words(&self, address: u32) -> &[u32] {
        let start = address as usize * self.words_per_block;
        &self.words[start..start + self.words_per_block]
    }

    /// True if local voxel `local` of the block at `address` is active.
    pub fn is_active(&self, address: u32, local: Int3) -> bool {
        let bit = local_bit(local, self.block_size) as usize;
        let word = self.block_words(address)[bit / 32];
        word & (1 << (bit % 32)) != 0
    }

    /// Number of active voxels in a block.
    pub fn active_count(&self, address: u32) -> u32 {
        self.block_words(address).iter().map(|w| w.count_ones()).sum()
    }

    /// Number of blocks covered.
    pub fn block_count(&self) -> usize {
        self.words.len() / self.words_per_block
    }

    /// Words per block.
    pub fn words_per_block(&self) -> usize {
        self.words_per_block
    }

    /// Flat mask words, block-major.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Consume into the flat mask words.
    pub fn into_words(self) -> Vec<u32> {
        self.words
    }
}

fn owned_words(layout: &SpanLayout, p: SetIdx) -> Vec<u32> {
    let domain = layout.domain();
    let bs = domain.block_size();
    let wpb = words_per_block(bs);
    let own = layout.spans(p).own_count();
    let mut words = vec![0u32; own as usize * wpb];

    for address in 0..own {
        let Some(origin) = layout.origin_of(p, address) else {
            continue;
        };
        let block = &mut words[address as usize * wpb..(address as usize + 1) * wpb];
        for local in domain.local_voxels() {
            if domain.is_voxel_active(domain.voxel(origin, local)) {
                let bit = local_bit(local, bs) as usize;
                block[bit / 32] |= 1 << (bit % 32);
            }
        }
    }
    words
}

/// Build the masks of every partition, ghost windows included.
pub fn build_masks(layout: &SpanLayout, parallel: bool) -> DataSet<ActiveMask> {
    let bs = layout.domain().block_size();
    let wpb = words_per_block(bs);
    let owned = map_partitions(layout.partition_count(), parallel, |p| owned_words(layout, p));

    let masks = map_partitions(layout.partition_count(), parallel, |p| {
        let spans = layout.spans(p);
        let mut words = owned[p].clone();
        words.resize(spans.total_count() as usize * wpb, 0);

        for direction in ByDirection::ALL {
            let ghost = spans.ghost(direction);
            let Some(target) = ghost.target() else {
                continue;
            };
            let source = &owned[target.partition];
            for domain in ByDomain::ALL {
                let alias = ghost.alias(domain);
                let window = ghost.window(domain);
                let src = &source[alias.first as usize * wpb..alias.end() as usize * wpb];
                words[window.first as usize * wpb..window.end() as usize * wpb].copy_from_slice(src);
            }
        }

        ActiveMask {
            block_size: bs,
            words_per_block: wpb,
            words,
        }
    });

    info!(
        "Built active masks ({} words per block, {} blocks incl. ghosts)",
        wpb,
        masks.iter().map(|(_, m)| m.block_count()).sum::<usize>()
    );
    masks
}
