//! Built-in domain shapes.

use clap::ValueEnum;
use voxelspan::prelude::*;

/// Activity shape of the inspected domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shape {
    /// Every voxel active.
    Dense,
    /// Ball inscribed in the domain.
    Sphere,
    /// Cylinder along z, with its wall as boundary condition.
    Channel,
}

impl Shape {
    /// Apply the shape's predicates to a builder.
    pub fn apply(self, builder: VoxelSpanBuilder, extent: Int3) -> VoxelSpanBuilder {
        let center = Int3::new(extent.x / 2, extent.y / 2, extent.z / 2);
        match self {
            Shape::Dense => builder,
            Shape::Sphere => {
                let radius = extent.x.min(extent.y).min(extent.z) / 2;
                builder.with_active(move |v| distance_sq(v, center, true) <= radius * radius)
            }
            Shape::Channel => {
                let radius = extent.x.min(extent.y) / 2 - 1;
                builder
                    .with_active(move |v| distance_sq(v, center, false) <= radius * radius)
                    .with_bc(move |v| distance_sq(v, center, false) >= (radius - 1) * (radius - 1))
            }
        }
    }
}

fn distance_sq(v: Int3, center: Int3, with_z: bool) -> i32 {
    let d = v - center;
    let dz = if with_z { d.z * d.z } else { 0 };
    d.x * d.x + d.y * d.y + dz
}
