//! Settlement workflow state.

use serde::{Deserialize, Serialize};

use crate::geometry::Coordinate;
use crate::ids::RunId;

/// Culture point accumulation as read from the account pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CulturePointState {
    /// Points accumulated so far.
    pub current: u64,
    /// Settlements the account already owns.
    pub owned: u32,
}

/// A village listed on the account profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VillageSummary {
    /// Village name.
    pub name: String,
    /// Game-assigned village id (used to switch the active village).
    pub village_id: u32,
    /// Map coordinate of the village.
    pub coordinate: Coordinate,
}

/// Progress marker of one settlement workflow run.
///
/// Never persisted: a new run always starts from
/// [`WorkflowState::CheckingCulturePoints`] and re-reads everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowState {
    /// Comparing accumulated culture points with the next requirement.
    CheckingCulturePoints,
    /// Starting a celebration to accumulate culture points faster.
    Celebrating,
    /// Looking for a residence-equivalent structure.
    CheckingResidence,
    /// Constructing a residence in the next empty slot.
    BuildingResidence,
    /// Counting trained settlers.
    CheckingSettlers,
    /// Queueing training for missing settlers.
    TrainingSettlers,
    /// Probing map tiles around the home village.
    SearchingPlot,
    /// Sending settlers to the chosen plot.
    Settling,
    /// A new settlement was founded.
    Done,
    /// The run cannot continue until something happens in game time.
    Blocked(String),
}

impl WorkflowState {
    /// Whether the run ends in this state.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Blocked(_))
    }

    /// The blocking reason, if blocked.
    pub fn blocked_reason(&self) -> Option<&str> {
        match self {
            Self::Blocked(reason) => Some(reason),
            _ => None,
        }
    }
}

impl core::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::CheckingCulturePoints => f.write_str("checking culture points"),
            Self::Celebrating => f.write_str("celebrating"),
            Self::CheckingResidence => f.write_str("checking residence"),
            Self::BuildingResidence => f.write_str("building residence"),
            Self::CheckingSettlers => f.write_str("checking settlers"),
            Self::TrainingSettlers => f.write_str("training settlers"),
            Self::SearchingPlot => f.write_str("searching plot"),
            Self::Settling => f.write_str("settling"),
            Self::Done => f.write_str("done"),
            Self::Blocked(reason) => write!(f, "blocked: {reason}"),
        }
    }
}

/// Summary of a finished workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowOutcome {
    /// Run identifier.
    pub run_id: RunId,
    /// Every state entered, in order, ending with the terminal state.
    pub trail: Vec<WorkflowState>,
    /// Plot the new settlement was founded on, when the run reached
    /// [`WorkflowState::Done`].
    pub settled_at: Option<Coordinate>,
}

impl WorkflowOutcome {
    /// The terminal state of the run.
    pub fn final_state(&self) -> Option<&WorkflowState> {
        self.trail.last()
    }

    /// Whether the run passed through `state`.
    pub fn visited(&self, state: &WorkflowState) -> bool {
        self.trail.contains(state)
    }
}
