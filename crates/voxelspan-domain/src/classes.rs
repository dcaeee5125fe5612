//! Classification tags and the canonical category order.
//!
//! Every active block of a partition lands in one of six categories:
//!
//! | index | category             |
//! |-------|----------------------|
//! | 0     | internal-bulk        |
//! | 1     | internal-bc          |
//! | 2     | boundary-up-bulk     |
//! | 3     | boundary-up-bc       |
//! | 4     | boundary-down-bulk   |
//! | 5     | boundary-down-bc     |
//!
//! Address ranges are laid out in exactly this order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Communication role of a block within its partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ByPartition {
    /// All active neighbors are owned by the same partition.
    Internal,
    /// At least one active neighbor is owned by another partition.
    Boundary,
}

/// Face of a partition along the decomposition axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ByDirection {
    /// Towards higher z.
    Up = 0,
    /// Towards lower z.
    Down = 1,
}

impl ByDirection {
    /// Both directions, in layout order.
    pub const ALL: [ByDirection; 2] = [ByDirection::Up, ByDirection::Down];

    /// The other face.
    pub fn opposite(self) -> ByDirection {
        match self {
            ByDirection::Up => ByDirection::Down,
            ByDirection::Down => ByDirection::Up,
        }
    }

    /// Direction of a z offset; `None` for offsets inside the slab.
    pub fn from_dz(dz: i32) -> Option<ByDirection> {
        match dz.signum() {
            1 => Some(ByDirection::Up),
            -1 => Some(ByDirection::Down),
            _ => None,
        }
    }

    /// Array index.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ByDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByDirection::Up => write!(f, "up"),
            ByDirection::Down => write!(f, "down"),
        }
    }
}

/// Boundary-condition domain of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ByDomain {
    /// Ordinary block.
    Bulk = 0,
    /// Block with at least one boundary-condition voxel.
    Bc = 1,
}

impl ByDomain {
    /// Both domains, in layout order.
    pub const ALL: [ByDomain; 2] = [ByDomain::Bulk, ByDomain::Bc];

    /// Array index.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ByDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByDomain::Bulk => write!(f, "bulk"),
            ByDomain::Bc => write!(f, "bc"),
        }
    }
}

/// One of the six owned address ranges of a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Internal block, bulk domain.
    InternalBulk = 0,
    /// Internal block, bc domain.
    InternalBc = 1,
    /// Boundary block on the up face, bulk domain.
    BoundaryUpBulk = 2,
    /// Boundary block on the up face, bc domain.
    BoundaryUpBc = 3,
    /// Boundary block on the down face, bulk domain.
    BoundaryDownBulk = 4,
    /// Boundary block on the down face, bc domain.
    BoundaryDownBc = 5,
}

/// Number of owned categories.
pub const CATEGORY_COUNT: usize = 6;

impl Category {
    /// All categories in canonical layout order.
    pub const ALL: [Category; CATEGORY_COUNT] = [
        Category::InternalBulk,
        Category::InternalBc,
        Category::BoundaryUpBulk,
        Category::BoundaryUpBc,
        Category::BoundaryDownBulk,
        Category::BoundaryDownBc,
    ];

    /// Internal category of a domain.
    pub fn internal(domain: ByDomain) -> Category {
        match domain {
            ByDomain::Bulk => Category::InternalBulk,
            ByDomain::Bc => Category::InternalBc,
        }
    }

    /// Boundary category of a direction and domain.
    pub fn boundary(direction: ByDirection, domain: ByDomain) -> Category {
        match (direction, domain) {
            (ByDirection::Up, ByDomain::Bulk) => Category::BoundaryUpBulk,
            (ByDirection::Up, ByDomain::Bc) => Category::BoundaryUpBc,
            (ByDirection::Down, ByDomain::Bulk) => Category::BoundaryDownBulk,
            (ByDirection::Down, ByDomain::Bc) => Category::BoundaryDownBc,
        }
    }

    /// Position in the canonical order.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Internal or boundary.
    pub fn by_partition(self) -> ByPartition {
        match self {
            Category::InternalBulk | Category::InternalBc => ByPartition::Internal,
            _ => ByPartition::Boundary,
        }
    }

    /// Face of a boundary category.
    pub fn direction(self) -> Option<ByDirection> {
        match self {
            Category::InternalBulk | Category::InternalBc => None,
            Category::BoundaryUpBulk | Category::BoundaryUpBc => Some(ByDirection::Up),
            Category::BoundaryDownBulk | Category::BoundaryDownBc => Some(ByDirection::Down),
        }
    }

    /// Bulk or bc.
    pub fn domain(self) -> ByDomain {
        match self {
            Category::InternalBulk | Category::BoundaryUpBulk | Category::BoundaryDownBulk => {
                ByDomain::Bulk
            }
            _ => ByDomain::Bc,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction() {
            None => write!(f, "internal-{}", self.domain()),
            Some(dir) => write!(f, "boundary-{}-{}", dir, self.domain()),
        }
    }
}
