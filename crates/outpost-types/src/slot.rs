//! Slot snapshots.
//!
//! A [`SlotMap`] is a point-in-time picture of one village's construction
//! positions. It is rebuilt by every scan and never persisted: the game
//! server is the only source of truth and its state changes outside the
//! tool's control.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::ids::SlotPosition;

/// Opaque, single-use upgrade link captured from a slot page.
///
/// Tokens embed a per-page CSRF value, so a token is only valid against the
/// page state it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpgradeToken(pub String);

impl UpgradeToken {
    /// The link target relative to the server root.
    pub fn href(&self) -> &str {
        &self.0
    }
}

/// What currently stands on a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Occupancy {
    /// Nothing built; the slot offers new construction.
    Empty,
    /// A structure (possibly still under construction) stands here.
    Occupied,
    /// The slot could not be read (rate limit, transport error, unexpected
    /// page layout).
    Unknown,
}

/// One construction position as observed during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Position index within the village.
    pub position: SlotPosition,
    /// Occupancy classification.
    pub occupancy: Occupancy,
    /// Structure name when occupied, without the level suffix.
    pub name: Option<String>,
    /// Current level; 0 for empty and unknown slots.
    pub level: u32,
    /// Upgrade link, absent when capped, queued out, or unaffordable.
    pub upgrade: Option<UpgradeToken>,
}

impl Slot {
    /// An empty slot.
    pub const fn empty(position: SlotPosition) -> Self {
        Self {
            position,
            occupancy: Occupancy::Empty,
            name: None,
            level: 0,
            upgrade: None,
        }
    }

    /// A slot that could not be classified.
    pub const fn unknown(position: SlotPosition) -> Self {
        Self {
            position,
            occupancy: Occupancy::Unknown,
            name: None,
            level: 0,
            upgrade: None,
        }
    }

    /// An occupied slot.
    pub fn occupied(
        position: SlotPosition,
        name: impl Into<String>,
        level: u32,
        upgrade: Option<UpgradeToken>,
    ) -> Self {
        Self {
            position,
            occupancy: Occupancy::Occupied,
            name: Some(name.into()),
            level,
            upgrade,
        }
    }

    /// Whether the structure name contains `needle`, ignoring case.
    pub fn name_matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name
            .as_deref()
            .is_some_and(|name| name.to_lowercase().contains(&needle))
    }
}

/// All slots of one village at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotMap {
    slots: BTreeMap<SlotPosition, Slot>,
}

impl SlotMap {
    /// Create a map covering `positions`, every slot initially
    /// [`Occupancy::Unknown`].
    pub fn new(positions: RangeInclusive<u32>) -> Self {
        let slots = positions
            .map(|raw| {
                let position = SlotPosition(raw);
                (position, Slot::unknown(position))
            })
            .collect();
        Self { slots }
    }

    /// Record an observed slot.
    ///
    /// Observations for positions outside the map's range are ignored so
    /// that the covered range never changes after construction. Returns
    /// whether the slot was recorded.
    pub fn record(&mut self, slot: Slot) -> bool {
        match self.slots.get_mut(&slot.position) {
            Some(existing) => {
                *existing = slot;
                true
            }
            None => false,
        }
    }

    /// Look up one position.
    pub fn get(&self, position: SlotPosition) -> Option<&Slot> {
        self.slots.get(&position)
    }

    /// Number of positions covered.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the map covers no positions.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterate slots in ascending position order.
    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots.values()
    }

    /// Positions currently classified as empty, ascending.
    pub fn empty_positions(&self) -> Vec<SlotPosition> {
        self.iter()
            .filter(|slot| slot.occupancy == Occupancy::Empty)
            .map(|slot| slot.position)
            .collect()
    }

    /// Lowest-positioned occupied slot whose name contains `name`.
    pub fn find_named(&self, name: &str) -> Option<&Slot> {
        self.iter()
            .filter(|slot| slot.occupancy == Occupancy::Occupied)
            .find(|slot| slot.name_matches(name))
    }

    /// Count of slots in each occupancy state: `(empty, occupied, unknown)`.
    pub fn tally(&self) -> (usize, usize, usize) {
        self.iter().fold((0, 0, 0), |(e, o, u), slot| match slot.occupancy {
            Occupancy::Empty => (e.saturating_add(1), o, u),
            Occupancy::Occupied => (e, o.saturating_add(1), u),
            Occupancy::Unknown => (e, o, u.saturating_add(1)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_map_covers_range_once() {
        let map = SlotMap::new(19..=40);
        assert_eq!(map.len(), 22);
        assert_eq!(map.tally(), (0, 0, 22));
        assert!(map.get(SlotPosition(18)).is_none());
        assert!(map.get(SlotPosition(40)).is_some());
    }

    #[test]
    fn record_outside_range_is_ignored() {
        let mut map = SlotMap::new(19..=40);
        assert!(!map.record(Slot::empty(SlotPosition(41))));
        assert_eq!(map.len(), 22);
        assert!(map.record(Slot::empty(SlotPosition(19))));
        assert_eq!(map.empty_positions(), vec![SlotPosition(19)]);
    }

    #[test]
    fn find_named_is_case_insensitive_substring_lowest_first() {
        let mut map = SlotMap::new(19..=40);
        map.record(Slot::occupied(SlotPosition(30), "Warehouse", 5, None));
        map.record(Slot::occupied(SlotPosition(22), "Great Warehouse", 1, None));
        let found = map.find_named("warehouse");
        assert_eq!(found.map(|s| s.position), Some(SlotPosition(22)));
        assert!(map.find_named("granary").is_none());
    }
}
