//! Plan actions and execution results.

use serde::{Deserialize, Serialize};

use crate::ids::SlotPosition;
use crate::preset::StructureType;

/// One step of a construction plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanAction {
    /// Upgrade a structure that already stands on `position`.
    Reuse {
        /// Claimed slot.
        position: SlotPosition,
        /// Structure expected on the slot.
        structure: StructureType,
        /// Level to reach.
        target_level: u32,
    },
    /// Build a new structure on the empty slot `position`.
    Construct {
        /// Claimed empty slot.
        position: SlotPosition,
        /// Structure to build.
        structure: StructureType,
        /// Level to reach once built.
        target_level: u32,
    },
    /// The requirement cannot be satisfied against the current slots.
    Infeasible {
        /// Structure that could not be placed.
        structure: StructureType,
        /// Human-readable explanation.
        reason: String,
    },
}

impl PlanAction {
    /// The slot this action claims, if any.
    pub const fn position(&self) -> Option<SlotPosition> {
        match self {
            Self::Reuse { position, .. } | Self::Construct { position, .. } => Some(*position),
            Self::Infeasible { .. } => None,
        }
    }

    /// The structure this action concerns.
    pub const fn structure(&self) -> &StructureType {
        match self {
            Self::Reuse { structure, .. }
            | Self::Construct { structure, .. }
            | Self::Infeasible { structure, .. } => structure,
        }
    }
}

impl core::fmt::Display for PlanAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Reuse {
                position,
                structure,
                target_level,
            } => write!(f, "upgrade {structure} at slot {position} to level {target_level}"),
            Self::Construct {
                position,
                structure,
                target_level,
            } => write!(f, "construct {structure} at slot {position} (target level {target_level})"),
            Self::Infeasible { structure, reason } => {
                write!(f, "cannot place {structure}: {reason}")
            }
        }
    }
}

/// How far an executed action got.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionOutcome {
    /// Target level reached (or construction queued for a level-1 target).
    Complete,
    /// Progress stopped short of the target; try again later.
    Partial {
        /// Why the loop stopped.
        reason: String,
    },
    /// The game rejected the request; retrying is unsafe.
    Failed {
        /// Why the request failed.
        reason: String,
    },
    /// The action was infeasible and nothing was sent.
    Skipped {
        /// Infeasibility reason carried over from planning.
        reason: String,
    },
}

impl ExecutionOutcome {
    /// Whether the action fully succeeded.
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Result of executing one [`PlanAction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// The executed action.
    pub action: PlanAction,
    /// Last level observed on the slot.
    pub final_level: u32,
    /// Number of upgrade steps issued.
    pub steps: u32,
    /// Outcome classification.
    pub outcome: ExecutionOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_accessors() {
        let action = PlanAction::Construct {
            position: SlotPosition(19),
            structure: StructureType::new("Residence"),
            target_level: 1,
        };
        assert_eq!(action.position(), Some(SlotPosition(19)));
        assert_eq!(action.structure().name(), "Residence");
        assert_eq!(
            action.to_string(),
            "construct Residence at slot 19 (target level 1)"
        );

        let infeasible = PlanAction::Infeasible {
            structure: StructureType::new("Granary"),
            reason: String::from("no empty slot for Granary"),
        };
        assert_eq!(infeasible.position(), None);
    }
}
