//! Shared type definitions for the Outpost settlement-growth orchestrator.
//!
//! Everything in this crate is a plain value: snapshots of remote game state
//! (slots, culture points), static configuration shapes (presets) and the
//! outputs of planning and workflow steps. Nothing here performs I/O.
//!
//! # Modules
//!
//! - [`ids`] -- Run identifiers plus numeric newtypes for slots and map tiles
//! - [`geometry`] -- Map coordinates and the `PositionId` bijection
//! - [`slot`] -- Slot occupancy snapshots and the per-village [`SlotMap`]
//! - [`preset`] -- Declarative structure requirements
//! - [`plan`] -- Plan actions and execution results
//! - [`workflow`] -- Settlement workflow states and culture point state

pub mod geometry;
pub mod ids;
pub mod plan;
pub mod preset;
pub mod slot;
pub mod workflow;

// Re-export all public types at crate root for convenience.
pub use geometry::{Coordinate, MapGeometry};
pub use ids::{PositionId, RunId, SlotPosition};
pub use plan::{ExecutionOutcome, ExecutionResult, PlanAction};
pub use preset::{Preset, StructureRequirement, StructureType};
pub use slot::{Occupancy, Slot, SlotMap, UpgradeToken};
pub use workflow::{CulturePointState, VillageSummary, WorkflowOutcome, WorkflowState};
