//! Preset reconciliation.
//!
//! Matches a preset's requirements against a scanned [`SlotMap`] and
//! produces an ordered plan. Pure: no I/O, and the same inputs always give
//! the same plan.

use std::collections::BTreeSet;

use outpost_types::{
    Occupancy, PlanAction, SlotMap, SlotPosition, StructureRequirement, StructureType,
};

/// Plan the structure requirements of a preset against `slots`.
///
/// For each requirement, `count` times in order:
///
/// 1. the lowest unclaimed occupied slot whose name contains the structure
///    name (case-insensitive) is reused;
/// 2. otherwise the lowest unclaimed empty slot is claimed for
///    construction;
/// 3. otherwise the requirement is infeasible and planning continues.
///
/// No slot is claimed by more than one action.
pub fn plan(requirements: &[StructureRequirement], slots: &SlotMap) -> Vec<PlanAction> {
    let mut claimed: BTreeSet<SlotPosition> = BTreeSet::new();
    let mut actions = Vec::new();

    for requirement in requirements {
        for _ in 0..requirement.count {
            actions.push(place(requirement, slots, &mut claimed));
        }
    }
    actions
}

fn place(
    requirement: &StructureRequirement,
    slots: &SlotMap,
    claimed: &mut BTreeSet<SlotPosition>,
) -> PlanAction {
    let structure = requirement.structure.clone();
    let target_level = requirement.level;

    let existing = slots.iter().find(|slot| {
        slot.occupancy == Occupancy::Occupied
            && !claimed.contains(&slot.position)
            && slot.name_matches(structure.name())
    });
    if let Some(slot) = existing {
        claimed.insert(slot.position);
        return PlanAction::Reuse {
            position: slot.position,
            structure,
            target_level,
        };
    }

    let empty = slots
        .iter()
        .find(|slot| slot.occupancy == Occupancy::Empty && !claimed.contains(&slot.position));
    if let Some(slot) = empty {
        claimed.insert(slot.position);
        return PlanAction::Construct {
            position: slot.position,
            structure,
            target_level,
        };
    }

    let reason = format!("no empty slot for {structure}");
    PlanAction::Infeasible { structure, reason }
}

/// Plan a uniform upgrade of every occupied slot to `target`.
///
/// Used for resource fields and for bulk upgrades of a building range.
/// Each occupied slot below `target` yields a reuse action named after
/// what stands there. Slots already at or above `target`, empty slots and
/// unreadable slots are left out.
pub fn plan_upgrades(target: u32, slots: &SlotMap) -> Vec<PlanAction> {
    slots
        .iter()
        .filter(|slot| slot.occupancy == Occupancy::Occupied && slot.level < target)
        .map(|slot| PlanAction::Reuse {
            position: slot.position,
            structure: StructureType::new(slot.name.clone().unwrap_or_default()),
            target_level: target,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use outpost_types::Slot;

    use super::*;

    fn empty_village() -> SlotMap {
        let mut slots = SlotMap::new(19..=40);
        for raw in 19..=40 {
            slots.record(Slot::empty(SlotPosition(raw)));
        }
        slots
    }

    fn position(action: &PlanAction) -> Option<u32> {
        action.position().map(SlotPosition::get)
    }

    #[test]
    fn fresh_village_constructs_in_lowest_slots() {
        let requirements = vec![
            StructureRequirement::new("Main Building", 1),
            StructureRequirement::new("Residence", 1),
        ];
        let actions = plan(&requirements, &empty_village());
        assert_eq!(
            actions,
            vec![
                PlanAction::Construct {
                    position: SlotPosition(19),
                    structure: StructureType::new("Main Building"),
                    target_level: 1,
                },
                PlanAction::Construct {
                    position: SlotPosition(20),
                    structure: StructureType::new("Residence"),
                    target_level: 1,
                },
            ]
        );
    }

    #[test]
    fn existing_structures_are_reused_first() {
        let mut slots = empty_village();
        slots.record(Slot::occupied(SlotPosition(26), "Main Building", 7, None));
        slots.record(Slot::occupied(SlotPosition(33), "City Wall", 2, None));

        let requirements = vec![
            StructureRequirement::new("main building", 20),
            StructureRequirement::new("Wall", 10),
            StructureRequirement::new("Granary", 5),
        ];
        let actions = plan(&requirements, &slots);
        assert!(matches!(
            &actions[0],
            PlanAction::Reuse { position: SlotPosition(26), target_level: 20, .. }
        ));
        assert!(matches!(
            &actions[1],
            PlanAction::Reuse { position: SlotPosition(33), target_level: 10, .. }
        ));
        assert!(matches!(
            &actions[2],
            PlanAction::Construct { position: SlotPosition(19), .. }
        ));
    }

    #[test]
    fn repeated_requirement_claims_distinct_slots() {
        let mut slots = empty_village();
        slots.record(Slot::occupied(SlotPosition(30), "Warehouse", 12, None));

        let actions = plan(&[StructureRequirement::new("Warehouse", 20).times(3)], &slots);
        let positions: Vec<_> = actions.iter().map(position).collect();
        assert_eq!(positions, vec![Some(30), Some(19), Some(20)]);
        assert!(matches!(actions[0], PlanAction::Reuse { .. }));
        assert!(matches!(actions[1], PlanAction::Construct { .. }));
    }

    #[test]
    fn oversubscribed_preset_is_infeasible_without_double_claims() {
        let mut slots = SlotMap::new(19..=22);
        slots.record(Slot::empty(SlotPosition(19)));
        slots.record(Slot::empty(SlotPosition(20)));
        slots.record(Slot::occupied(SlotPosition(21), "Granary", 3, None));
        slots.record(Slot::occupied(SlotPosition(22), "Barracks", 1, None));

        let requirements = vec![
            StructureRequirement::new("Warehouse", 20).times(3),
            StructureRequirement::new("Granary", 20).times(2),
        ];
        let actions = plan(&requirements, &slots);
        assert_eq!(actions.len(), 5);

        let infeasible: Vec<_> = actions
            .iter()
            .filter(|a| matches!(a, PlanAction::Infeasible { .. }))
            .collect();
        assert_eq!(infeasible.len(), 2);
        assert!(infeasible[0].to_string().contains("no empty slot for Warehouse"));

        let claimed: Vec<_> = actions.iter().filter_map(PlanAction::position).collect();
        let unique: BTreeSet<_> = claimed.iter().copied().collect();
        assert_eq!(unique.len(), claimed.len());
        assert!(!claimed.contains(&SlotPosition(22)));
    }

    #[test]
    fn unknown_slots_are_never_claimed() {
        let slots = SlotMap::new(19..=21);
        let actions = plan(&[StructureRequirement::new("Academy", 1)], &slots);
        assert!(matches!(actions[0], PlanAction::Infeasible { .. }));
    }

    #[test]
    fn planning_is_deterministic() {
        let mut slots = empty_village();
        slots.record(Slot::occupied(SlotPosition(25), "Stable", 4, None));
        slots.record(Slot::occupied(SlotPosition(19), "Warehouse", 4, None));
        let requirements = vec![
            StructureRequirement::new("Warehouse", 20).times(2),
            StructureRequirement::new("Stable", 10),
            StructureRequirement::new("Smithy", 10),
        ];
        let first = plan(&requirements, &slots);
        for _ in 0..10 {
            assert_eq!(plan(&requirements, &slots), first);
        }
    }

    #[test]
    fn uniform_upgrade_skips_fields_at_target() {
        let mut slots = SlotMap::new(1..=4);
        slots.record(Slot::occupied(SlotPosition(1), "Woodcutter", 10, None));
        slots.record(Slot::occupied(SlotPosition(2), "Clay Pit", 3, None));
        slots.record(Slot::occupied(SlotPosition(3), "Iron Mine", 12, None));

        let actions = plan_upgrades(10, &slots);
        assert_eq!(
            actions,
            vec![PlanAction::Reuse {
                position: SlotPosition(2),
                structure: StructureType::new("Clay Pit"),
                target_level: 10,
            }]
        );
    }
}
