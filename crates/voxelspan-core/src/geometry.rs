//! Integer triples used for voxel, block and offset coordinates.
//!
//! All coordinates are absolute domain coordinates unless a function says
//! otherwise. Linearisation is x-fastest:
//! `index = z * (dim.x * dim.y) + y * dim.x + x`.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// A 3D integer coordinate or extent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Pod, Zeroable, Serialize, Deserialize,
)]
#[repr(C)]
pub struct Int3 {
    /// X component.
    pub x: i32,
    /// Y component.
    pub y: i32,
    /// Z component.
    pub z: i32,
}

impl Int3 {
    /// The origin.
    pub const ZERO: Int3 = Int3 { x: 0, y: 0, z: 0 };

    /// Create a new triple.
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Triple with all components set to `v`.
    #[inline]
    pub const fn splat(v: i32) -> Self {
        Self { x: v, y: v, z: v }
    }

    /// Component-wise product.
    #[inline]
    pub fn mul_components(self, other: Int3) -> Int3 {
        Int3::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }

    /// Component-wise ceiling division. `d` must be positive on every axis.
    #[inline]
    pub fn divide_up(self, d: Int3) -> Int3 {
        let up = |a: i32, b: i32| (a + b - 1).div_euclid(b);
        Int3::new(up(self.x, d.x), up(self.y, d.y), up(self.z, d.z))
    }

    /// Component-wise floor division. `d` must be positive on every axis.
    #[inline]
    pub fn div_floor(self, d: i32) -> Int3 {
        Int3::new(self.x.div_euclid(d), self.y.div_euclid(d), self.z.div_euclid(d))
    }

    /// Number of cells in a box of this extent.
    #[inline]
    pub fn volume(self) -> i64 {
        self.x as i64 * self.y as i64 * self.z as i64
    }

    /// True if `0 <= self < extent` on every axis.
    #[inline]
    pub fn in_bounds(self, extent: Int3) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.z >= 0
            && self.x < extent.x
            && self.y < extent.y
            && self.z < extent.z
    }

    /// Largest absolute component.
    #[inline]
    pub fn max_abs(self) -> i32 {
        self.x.abs().max(self.y.abs()).max(self.z.abs())
    }

    /// Linear index inside a box of extent `dim`.
    #[inline]
    pub fn pitch(self, dim: Int3) -> i64 {
        self.x as i64 + self.y as i64 * dim.x as i64 + self.z as i64 * dim.x as i64 * dim.y as i64
    }

    /// Inverse of [`Int3::pitch`].
    #[inline]
    pub fn from_pitch(idx: i64, dim: Int3) -> Int3 {
        let slice = dim.x as i64 * dim.y as i64;
        let z = idx / slice;
        let rem = idx % slice;
        Int3::new((rem % dim.x as i64) as i32, (rem / dim.x as i64) as i32, z as i32)
    }

    /// Components as an array.
    #[inline]
    pub fn to_array(self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[i32; 3]> for Int3 {
    fn from(a: [i32; 3]) -> Self {
        Int3::new(a[0], a[1], a[2])
    }
}

impl Add for Int3 {
    type Output = Int3;

    fn add(self, rhs: Int3) -> Int3 {
        Int3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Int3 {
    fn add_assign(&mut self, rhs: Int3) {
        *self = *self + rhs;
    }
}

impl Sub for Int3 {
    type Output = Int3;

    fn sub(self, rhs: Int3) -> Int3 {
        Int3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<i32> for Int3 {
    type Output = Int3;

    fn mul(self, rhs: i32) -> Int3 {
        Int3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Int3 {
    type Output = Int3;

    fn neg(self) -> Int3 {
        Int3::new(-self.x, -self.y, -self.z)
    }
}

impl fmt::Display for Int3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Compact stencil offset, as read by kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
#[repr(C)]
pub struct NghOffset {
    /// X offset.
    pub x: i8,
    /// Y offset.
    pub y: i8,
    /// Z offset.
    pub z: i8,
}

impl NghOffset {
    /// Create a new offset.
    pub const fn new(x: i8, y: i8, z: i8) -> Self {
        Self { x, y, z }
    }

    /// Narrow an [`Int3`]; `None` if any component does not fit in `i8`.
    pub fn try_from_int3(v: Int3) -> Option<Self> {
        Some(Self {
            x: i8::try_from(v.x).ok()?,
            y: i8::try_from(v.y).ok()?,
            z: i8::try_from(v.z).ok()?,
        })
    }

    /// Widen back to an [`Int3`].
    pub fn to_int3(self) -> Int3 {
        Int3::new(self.x as i32, self.y as i32, self.z as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divide_up() {
        let extent = Int3::new(8, 9, 1);
        assert_eq!(extent.divide_up(Int3::splat(4)), Int3::new(2, 3, 1));
        assert_eq!(Int3::ZERO.divide_up(Int3::splat(4)), Int3::ZERO);
    }

    #[test]
    fn test_pitch_inverse() {
        let dim = Int3::new(3, 4, 5);
        for idx in 0..dim.volume() {
            let p = Int3::from_pitch(idx, dim);
            assert!(p.in_bounds(dim));
            assert_eq!(p.pitch(dim), idx);
        }
    }

    #[test]
    fn test_in_bounds() {
        let extent = Int3::splat(2);
        assert!(Int3::new(1, 1, 1).in_bounds(extent));
        assert!(!Int3::new(2, 0, 0).in_bounds(extent));
        assert!(!Int3::new(0, -1, 0).in_bounds(extent));
    }

    #[test]
    fn test_div_floor_negative() {
        assert_eq!(Int3::new(-1, 4, 7).div_floor(4), Int3::new(-1, 1, 1));
    }

    #[test]
    fn test_ngh_offset_narrowing() {
        let off = NghOffset::try_from_int3(Int3::new(-1, 0, 1)).unwrap();
        assert_eq!(off, NghOffset::new(-1, 0, 1));
        assert_eq!(off.to_int3(), Int3::new(-1, 0, 1));
        assert!(NghOffset::try_from_int3(Int3::new(200, 0, 0)).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(Int3::new(1, -2, 3).to_string(), "(1, -2, 3)");
    }
}
