//! Spiral enumeration of map candidates.
//!
//! Candidates are produced ring by ring around a center: the center
//! itself, then every ring of Chebyshev radius `1..=max_radius`. Ring `r`
//! holds `8r` cells walked in a fixed order:
//!
//! ```text
//! top edge     y = +r, x = -r ..= r
//! right edge   x = +r, y = r-1 down to -r
//! bottom edge  y = -r, x = r-1 down to -r
//! left edge    x = -r, y = -r+1 ..= r-1
//! ```
//!
//! The iterator is lazy and `Clone`, so a search can be paused and resumed
//! without recomputing earlier rings.

use std::iter::FusedIterator;

use outpost_types::{Coordinate, MapGeometry};

/// Lazy ring-ordered candidate generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spiral {
    center: Coordinate,
    max_radius: u32,
    max_count: usize,
    bounds: Option<MapGeometry>,
    radius: u32,
    index: u64,
    emitted: usize,
}

/// Enumerate candidates around `center` up to `max_radius`, stopping after
/// `max_count` coordinates.
pub const fn spiral(center: Coordinate, max_radius: u32, max_count: usize) -> Spiral {
    Spiral::new(center, max_radius, max_count)
}

impl Spiral {
    /// Create a generator. Use `usize::MAX` for an uncapped count.
    pub const fn new(center: Coordinate, max_radius: u32, max_count: usize) -> Self {
        Self {
            center,
            max_radius,
            max_count,
            bounds: None,
            radius: 0,
            index: 0,
            emitted: 0,
        }
    }

    /// Skip cells that fall outside `geometry`.
    ///
    /// Skipped cells do not count towards `max_count`.
    pub const fn within(mut self, geometry: MapGeometry) -> Self {
        self.bounds = Some(geometry);
        self
    }

    /// Continue a search that already consumed `emitted` candidates.
    #[must_use]
    pub fn resume(mut self, emitted: usize) -> Self {
        if let Some(skip) = emitted.checked_sub(1) {
            let _ = self.nth(skip);
        }
        self
    }

    /// Number of candidates produced so far.
    pub const fn emitted(&self) -> usize {
        self.emitted
    }

    fn ring_len(radius: u32) -> u64 {
        if radius == 0 {
            1
        } else {
            u64::from(radius).saturating_mul(8)
        }
    }

    /// Offset of cell `index` within ring `radius`, relative to the center.
    #[allow(clippy::arithmetic_side_effects)]
    fn ring_offset(radius: u32, index: u64) -> (i64, i64) {
        let r = i64::from(radius);
        let k = i64::try_from(index).unwrap_or(i64::MAX);
        let top = 2 * r + 1;
        if k < top {
            (-r + k, r)
        } else if k < top + 2 * r {
            let j = k - top;
            (r, r - 1 - j)
        } else if k < top + 4 * r {
            let j = k - top - 2 * r;
            (r - 1 - j, -r)
        } else {
            let j = k - top - 4 * r;
            (-r, -r + 1 + j)
        }
    }

    fn place(&self, (dx, dy): (i64, i64)) -> Option<Coordinate> {
        let x = i32::try_from(i64::from(self.center.x).checked_add(dx)?).ok()?;
        let y = i32::try_from(i64::from(self.center.y).checked_add(dy)?).ok()?;
        let coordinate = Coordinate::new(x, y);
        match self.bounds {
            Some(geometry) if !geometry.contains(coordinate) => None,
            _ => Some(coordinate),
        }
    }
}

impl Iterator for Spiral {
    type Item = Coordinate;

    fn next(&mut self) -> Option<Coordinate> {
        while self.emitted < self.max_count && self.radius <= self.max_radius {
            let offset = Self::ring_offset(self.radius, self.index);
            self.index = self.index.saturating_add(1);
            if self.index >= Self::ring_len(self.radius) {
                self.index = 0;
                match self.radius.checked_add(1) {
                    Some(next) => self.radius = next,
                    None => self.max_count = self.emitted,
                }
            }
            if let Some(coordinate) = self.place(offset) {
                self.emitted = self.emitted.saturating_add(1);
                return Some(coordinate);
            }
        }
        None
    }
}

impl FusedIterator for Spiral {}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    const ORIGIN: Coordinate = Coordinate::new(0, 0);

    #[test]
    fn radius_zero_is_center_only() {
        let cells: Vec<_> = spiral(Coordinate::new(7, -3), 0, usize::MAX).collect();
        assert_eq!(cells, vec![Coordinate::new(7, -3)]);
    }

    #[test]
    fn first_ring_order() {
        let cells: Vec<_> = spiral(ORIGIN, 1, usize::MAX).collect();
        let expected: Vec<_> = [
            (0, 0),
            (-1, 1),
            (0, 1),
            (1, 1),
            (1, 0),
            (1, -1),
            (0, -1),
            (-1, -1),
            (-1, 0),
        ]
        .into_iter()
        .map(|(x, y)| Coordinate::new(x, y))
        .collect();
        assert_eq!(cells, expected);
    }

    #[test]
    fn rings_have_eight_r_distinct_cells() {
        let cells: Vec<_> = spiral(Coordinate::new(10, 10), 6, usize::MAX).collect();
        assert_eq!(cells.len(), 1 + 8 * (1 + 2 + 3 + 4 + 5 + 6));
        let unique: HashSet<_> = cells.iter().copied().collect();
        assert_eq!(unique.len(), cells.len());
        for r in 1..=6_u32 {
            let in_ring = cells
                .iter()
                .filter(|c| c.chebyshev(Coordinate::new(10, 10)) == r)
                .count();
            assert_eq!(in_ring, usize::try_from(8 * r).unwrap());
        }
    }

    #[test]
    fn distance_never_decreases() {
        let center = Coordinate::new(-40, 25);
        let distances: Vec<u32> = spiral(center, 12, usize::MAX)
            .map(|c| c.chebyshev(center))
            .collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn truncated_at_max_count() {
        let cells: Vec<_> = spiral(ORIGIN, 10, 5).collect();
        assert_eq!(cells.len(), 5);
        assert_eq!(cells[0], ORIGIN);
    }

    #[test]
    fn out_of_bounds_cells_are_skipped_without_counting() {
        let geometry = MapGeometry {
            width: 11,
            offset: 5,
        };
        let corner = Coordinate::new(5, 5);
        let cells: Vec<_> = spiral(corner, 2, 6).within(geometry).collect();
        assert_eq!(cells.len(), 6);
        assert!(cells.iter().all(|c| geometry.contains(*c)));
        assert_eq!(cells[0], corner);
        assert_eq!(cells[1], Coordinate::new(5, 4));
    }

    #[test]
    fn bounded_spiral_exhausts_at_map_edge() {
        let geometry = MapGeometry {
            width: 3,
            offset: 1,
        };
        let cells: Vec<_> = spiral(ORIGIN, 5, usize::MAX).within(geometry).collect();
        assert_eq!(cells.len(), 9);
    }

    #[test]
    fn clone_restarts_and_resume_continues() {
        let full: Vec<_> = spiral(ORIGIN, 3, usize::MAX).collect();

        let mut partial = spiral(ORIGIN, 3, usize::MAX);
        let head: Vec<_> = partial.by_ref().take(10).collect();
        let snapshot = partial.clone();
        let tail: Vec<_> = partial.collect();
        assert_eq!([head, tail.clone()].concat(), full);
        assert_eq!(snapshot.collect::<Vec<_>>(), tail);

        let resumed: Vec<_> = spiral(ORIGIN, 3, usize::MAX).resume(10).collect();
        assert_eq!(resumed, full[10..].to_vec());
    }

    #[test]
    fn fused_after_exhaustion() {
        let mut cells = spiral(ORIGIN, 0, usize::MAX);
        assert!(cells.next().is_some());
        assert!(cells.next().is_none());
        assert!(cells.next().is_none());
        assert_eq!(cells.emitted(), 1);
    }
}
