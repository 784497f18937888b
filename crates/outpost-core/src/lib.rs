//! Slot scanning, preset planning, construction and settlement
//! orchestration for Outpost.
//!
//! The crate talks to the game only through the [`PageFetcher`] trait and
//! interprets pages only in [`document`]. Everything above that works on
//! typed values from `outpost-types`.
//!
//! # Modules
//!
//! - [`config`] -- `outpost.yaml` loading with environment overrides.
//! - [`error`] -- [`CoreError`] and fatal-error classification.
//! - [`fetch`] -- The [`PageFetcher`] seam and logical page requests.
//! - [`document`] -- HTML parsing into typed pages.
//! - [`client`] -- [`GameClient`]: pacing, retries, typed page reads.
//! - [`scanner`] -- Slot scans producing a `SlotMap`.
//! - [`spiral`] -- Ring-ordered map candidate generation.
//! - [`planner`] -- Pure preset reconciliation.
//! - [`executor`] -- Construct and upgrade execution, preset application.
//! - [`culture`] -- Culture point requirements and current state.
//! - [`plots`] -- Empty plot discovery.
//! - [`orchestrator`] -- The settlement workflow state machine.
//! - [`progress`] -- [`ProgressSink`] and its implementations.
//! - [`record`] -- [`TaskRecorder`] bookkeeping seam.
//!
//! [`PageFetcher`]: fetch::PageFetcher
//! [`CoreError`]: error::CoreError
//! [`GameClient`]: client::GameClient
//! [`ProgressSink`]: progress::ProgressSink
//! [`TaskRecorder`]: record::TaskRecorder

pub mod client;
pub mod config;
pub mod culture;
pub mod document;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod orchestrator;
pub mod planner;
pub mod plots;
pub mod progress;
pub mod record;
pub mod scanner;
pub mod spiral;
