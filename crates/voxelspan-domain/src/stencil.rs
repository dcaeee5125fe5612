//! Stencil shapes and their compact kernel representation.

use voxelspan_core::config::StencilPreset;
use voxelspan_core::error::{Result, VoxelSpanError};
use voxelspan_core::geometry::{Int3, NghOffset};

/// A set of voxel offsets read by a kernel around each voxel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stencil {
    points: Vec<Int3>,
}

impl Stencil {
    /// Create a stencil from explicit offsets (lattice units).
    pub fn new(points: Vec<Int3>) -> Self {
        Self { points }
    }

    /// Center plus the 6 face neighbors.
    pub fn laplace_7() -> Self {
        Self::cube_filtered(1)
    }

    /// Center, 6 faces and 12 edges.
    pub fn d3q19() -> Self {
        Self::cube_filtered(2)
    }

    /// Full 3x3x3 neighborhood.
    pub fn d3q27() -> Self {
        Self::cube_filtered(3)
    }

    /// All offsets of the 3x3x3 cube with at most `max_nonzero` nonzero components.
    fn cube_filtered(max_nonzero: usize) -> Self {
        let mut points = Vec::new();
        for z in -1..=1 {
            for y in -1..=1 {
                for x in -1..=1 {
                    let nonzero = [x, y, z].iter().filter(|c| **c != 0).count();
                    if nonzero <= max_nonzero {
                        points.push(Int3::new(x, y, z));
                    }
                }
            }
        }
        Self { points }
    }

    /// Offsets of the stencil.
    pub fn points(&self) -> &[Int3] {
        &self.points
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True for an empty stencil.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Largest reach along any axis.
    pub fn radius(&self) -> i32 {
        self.points.iter().map(|p| p.max_abs()).max().unwrap_or(0)
    }

    /// Check that every offset stays within one block of ghost depth and
    /// fits the compact representation.
    pub fn validate(&self, block_size: i32) -> Result<()> {
        for &offset in &self.points {
            if offset.max_abs() > block_size || NghOffset::try_from_int3(offset).is_none() {
                return Err(VoxelSpanError::StencilTooDeep { offset, block_size });
            }
        }
        Ok(())
    }

    /// Offsets narrowed to the kernel representation.
    pub fn compact(&self) -> Result<Vec<NghOffset>> {
        self.points
            .iter()
            .map(|&offset| {
                NghOffset::try_from_int3(offset).ok_or(VoxelSpanError::StencilTooDeep {
                    offset,
                    block_size: i8::MAX as i32,
                })
            })
            .collect()
    }
}

impl From<StencilPreset> for Stencil {
    fn from(preset: StencilPreset) -> Self {
        match preset {
            StencilPreset::Laplace7 => Stencil::laplace_7(),
            StencilPreset::D3q19 => Stencil::d3q19(),
            StencilPreset::D3q27 => Stencil::d3q27(),
        }
    }
}
