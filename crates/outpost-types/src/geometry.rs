//! World map coordinates.
//!
//! The game addresses map tiles two ways: planar `(x|y)` coordinates shown
//! to the player, and a linear tile id used in URLs
//! (`village3.php?id=N`). For a square map of `width` tiles centred on the
//! origin with `offset = width / 2`:
//!
//! ```text
//! id = (offset + y) * width + (offset + x) + 1
//! ```
//!
//! Map dimensions differ between game servers, so they live in
//! [`MapGeometry`] rather than in constants.

use serde::{Deserialize, Serialize};

use crate::ids::PositionId;

/// A planar map coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    /// Horizontal axis, growing east.
    pub x: i32,
    /// Vertical axis.
    pub y: i32,
}

impl Coordinate {
    /// Create a coordinate.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chebyshev (ring) distance between two coordinates.
    pub const fn chebyshev(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        if dx > dy { dx } else { dy }
    }
}

impl core::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}|{})", self.x, self.y)
    }
}

/// Dimensions of a square world map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapGeometry {
    /// Number of tiles along one side.
    #[serde(default = "default_width")]
    pub width: u32,
    /// Distance from the map edge to the origin column/row.
    #[serde(default = "default_offset")]
    pub offset: i32,
}

const fn default_width() -> u32 {
    401
}

const fn default_offset() -> i32 {
    200
}

impl Default for MapGeometry {
    fn default() -> Self {
        Self {
            width: default_width(),
            offset: default_offset(),
        }
    }
}

impl MapGeometry {
    /// Whether `coordinate` lies on the map.
    pub fn contains(&self, coordinate: Coordinate) -> bool {
        let min = i64::from(self.offset).saturating_neg();
        let max = i64::from(self.width)
            .saturating_sub(1)
            .saturating_sub(i64::from(self.offset));
        let x = i64::from(coordinate.x);
        let y = i64::from(coordinate.y);
        (min..=max).contains(&x) && (min..=max).contains(&y)
    }

    /// Whether `id` addresses a tile on the map.
    pub fn contains_id(&self, id: PositionId) -> bool {
        let tiles = u64::from(self.width).saturating_mul(u64::from(self.width));
        (1..=tiles).contains(&u64::from(id.get()))
    }

    /// Convert a tile id to its planar coordinate.
    ///
    /// Precondition: `self.contains_id(id)`, checked in debug builds. Ids
    /// outside the map produce an unspecified coordinate.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::arithmetic_side_effects,
        clippy::integer_division
    )]
    pub fn to_coordinate(&self, id: PositionId) -> Coordinate {
        debug_assert!(self.contains_id(id), "tile id {id} is off the map");
        let width = i64::from(self.width.max(1));
        let index = i64::from(id.get()) - 1;
        let x = index.rem_euclid(width) - i64::from(self.offset);
        let y = index.div_euclid(width) - i64::from(self.offset);
        Coordinate {
            x: x as i32,
            y: y as i32,
        }
    }

    /// Convert a planar coordinate to its tile id.
    ///
    /// Precondition: `self.contains(coordinate)`, checked in debug builds.
    /// Coordinates outside the map produce an unspecified id.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::arithmetic_side_effects
    )]
    pub fn from_coordinate(&self, coordinate: Coordinate) -> PositionId {
        debug_assert!(self.contains(coordinate), "{coordinate} is off the map");
        let offset = i64::from(self.offset);
        let row = offset + i64::from(coordinate.y);
        let column = offset + i64::from(coordinate.x);
        let id = row * i64::from(self.width) + column + 1;
        PositionId(id as u32)
    }
}
