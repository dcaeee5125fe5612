//! Voxel domain description.
//!
//! A [`Domain`] is a box of voxels plus two predicates: which voxels are
//! active, and which carry a boundary condition. Voxels sit on a lattice
//! with stride `spacing`; a block covers `block_size` lattice points per
//! axis, i.e. `block_size * spacing` domain units.

use std::fmt;
use std::sync::Arc;

use voxelspan_core::error::{Result, VoxelSpanError};
use voxelspan_core::geometry::Int3;

/// Predicate over absolute voxel coordinates.
pub type VoxelPredicate = Arc<dyn Fn(Int3) -> bool + Send + Sync>;

/// Rectangular voxel domain with activity and boundary-condition predicates.
#[derive(Clone)]
pub struct Domain {
    extent: Int3,
    block_size: i32,
    spacing: i32,
    active: VoxelPredicate,
    bc: VoxelPredicate,
}

impl Domain {
    /// Create a domain. The boundary-condition predicate defaults to
    /// always false.
    pub fn new(
        extent: Int3,
        block_size: i32,
        spacing: i32,
        active: impl Fn(Int3) -> bool + Send + Sync + 'static,
    ) -> Result<Self> {
        for (axis, value) in ['x', 'y', 'z'].into_iter().zip(extent.to_array()) {
            if value <= 0 {
                return Err(VoxelSpanError::InvalidExtent { axis, value });
            }
        }
        if block_size <= 0 {
            return Err(VoxelSpanError::InvalidBlockSize { value: block_size });
        }
        if spacing <= 0 {
            return Err(VoxelSpanError::InvalidSpacing { value: spacing });
        }
        Ok(Self {
            extent,
            block_size,
            spacing,
            active: Arc::new(active),
            bc: Arc::new(|_| false),
        })
    }

    /// Domain where every voxel is active.
    pub fn dense(extent: Int3, block_size: i32) -> Result<Self> {
        Self::new(extent, block_size, 1, |_| true)
    }

    /// Replace the boundary-condition predicate.
    #[must_use]
    pub fn with_bc(mut self, bc: impl Fn(Int3) -> bool + Send + Sync + 'static) -> Self {
        self.bc = Arc::new(bc);
        self
    }

    /// Replace the boundary-condition predicate with a shared one.
    #[must_use]
    pub fn with_bc_predicate(mut self, bc: VoxelPredicate) -> Self {
        self.bc = bc;
        self
    }

    /// Replace the activity predicate with a shared one.
    #[must_use]
    pub fn with_active_predicate(mut self, active: VoxelPredicate) -> Self {
        self.active = active;
        self
    }

    /// Domain extent in voxels.
    pub fn extent(&self) -> Int3 {
        self.extent
    }

    /// Block edge length in lattice points.
    pub fn block_size(&self) -> i32 {
        self.block_size
    }

    /// Lattice stride.
    pub fn spacing(&self) -> i32 {
        self.spacing
    }

    /// Block edge length in domain units.
    pub fn block_extent(&self) -> i32 {
        self.block_size * self.spacing
    }

    /// Number of lattice points per block.
    pub fn voxels_per_block(&self) -> usize {
        (self.block_size as usize).pow(3)
    }

    /// Number of blocks along each axis.
    pub fn block_span(&self) -> Int3 {
        self.extent.divide_up(Int3::splat(self.block_extent()))
    }

    /// Absolute origin of the block at block coordinate `block`.
    pub fn block_origin(&self, block: Int3) -> Int3 {
        block * self.block_extent()
    }

    /// Block coordinate containing an absolute position.
    pub fn block_of(&self, position: Int3) -> Int3 {
        position.div_floor(self.block_extent())
    }

    /// Absolute coordinate of a block-local lattice point.
    #[inline]
    pub fn voxel(&self, origin: Int3, local: Int3) -> Int3 {
        origin + local * self.spacing
    }

    /// True if `voxel` is inside the extent and on the lattice.
    pub fn is_on_lattice(&self, voxel: Int3) -> bool {
        voxel.in_bounds(self.extent)
            && voxel.x % self.spacing == 0
            && voxel.y % self.spacing == 0
            && voxel.z % self.spacing == 0
    }

    /// Activity predicate; voxels outside the extent are inactive.
    #[inline]
    pub fn is_voxel_active(&self, voxel: Int3) -> bool {
        voxel.in_bounds(self.extent) && (self.active)(voxel)
    }

    /// Boundary-condition predicate; voxels outside the extent are never bc.
    #[inline]
    pub fn is_voxel_bc(&self, voxel: Int3) -> bool {
        voxel.in_bounds(self.extent) && (self.bc)(voxel)
    }

    /// Block-local lattice coordinates in bit order (x fastest).
    pub fn local_voxels(&self) -> impl Iterator<Item = Int3> {
        let bs = self.block_size;
        (0..bs).flat_map(move |z| (0..bs).flat_map(move |y| (0..bs).map(move |x| Int3::new(x, y, z))))
    }

    /// True if any voxel of the block is active.
    pub fn is_block_active(&self, block: Int3) -> bool {
        let origin = self.block_origin(block);
        self.local_voxels()
            .any(|local| self.is_voxel_active(self.voxel(origin, local)))
    }

    /// True if any voxel of the block carries a boundary condition.
    pub fn is_block_bc(&self, block: Int3) -> bool {
        let origin = self.block_origin(block);
        self.local_voxels()
            .any(|local| self.is_voxel_bc(self.voxel(origin, local)))
    }
}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Domain")
            .field("extent", &self.extent)
            .field("block_size", &self.block_size)
            .field("spacing", &self.spacing)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_span() {
        let domain = Domain::dense(Int3::new(8, 9, 16), 4).unwrap();
        assert_eq!(domain.block_span(), Int3::new(2, 3, 4));
        assert_eq!(domain.voxels_per_block(), 64);
    }

    #[test]
    fn test_spacing_scales_blocks() {
        let domain = Domain::new(Int3::splat(16), 4, 2, |_| true).unwrap();
        assert_eq!(domain.block_extent(), 8);
        assert_eq!(domain.block_span(), Int3::splat(2));
        assert_eq!(domain.block_origin(Int3::new(1, 0, 1)), Int3::new(8, 0, 8));
        assert_eq!(domain.voxel(Int3::new(8, 0, 0), Int3::new(1, 2, 3)), Int3::new(10, 4, 6));
        assert!(domain.is_on_lattice(Int3::new(2, 4, 6)));
        assert!(!domain.is_on_lattice(Int3::new(1, 4, 6)));
    }

    #[test]
    fn test_invalid_domain() {
        assert!(matches!(
            Domain::dense(Int3::new(8, 0, 8), 4),
            Err(VoxelSpanError::InvalidExtent { axis: 'y', value: 0 })
        ));
        assert!(Domain::dense(Int3::splat(8), 0).is_err());
        assert!(Domain::new(Int3::splat(8), 4, 0, |_| true).is_err());
    }

    #[test]
    fn test_block_activity() {
        let domain = Domain::new(Int3::splat(8), 4, 1, |v| v == Int3::new(5, 1, 6)).unwrap();
        assert!(domain.is_block_active(Int3::new(1, 0, 1)));
        assert!(!domain.is_block_active(Int3::new(0, 0, 0)));
    }

    #[test]
    fn test_partial_block_outside_extent() {
        let domain = Domain::dense(Int3::new(6, 6, 6), 4).unwrap();
        // Voxels past the extent are inactive even if the predicate says yes.
        assert!(!domain.is_voxel_active(Int3::new(6, 0, 0)));
        assert!(domain.is_block_active(Int3::new(1, 1, 1)));
    }

    #[test]
    fn test_bc_predicate() {
        let domain = Domain::dense(Int3::splat(8), 4)
            .unwrap()
            .with_bc(|v| v.z == 0);
        assert!(domain.is_block_bc(Int3::new(1, 1, 0)));
        assert!(!domain.is_block_bc(Int3::new(1, 1, 1)));
    }

    #[test]
    fn test_local_voxel_order() {
        let domain = Domain::dense(Int3::splat(4), 2).unwrap();
        let locals: Vec<_> = domain.local_voxels().collect();
        assert_eq!(locals.len(), 8);
        assert_eq!(locals[1], Int3::new(1, 0, 0));
        assert_eq!(locals[2], Int3::new(0, 1, 0));
        assert_eq!(locals[4], Int3::new(0, 0, 1));
    }
}
