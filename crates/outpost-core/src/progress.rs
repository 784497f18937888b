//! Progress reporting.
//!
//! Long-running operations report what they are doing through a
//! [`ProgressSink`]. Events from one run arrive in the order they happened.

use outpost_types::{Coordinate, ExecutionResult, PlanAction, Slot, SlotPosition, WorkflowState};
use tokio::sync::mpsc;
use tracing::debug;

/// Something worth telling the operator about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A slot scan started.
    ScanStarted {
        /// First position scanned.
        first: u32,
        /// Last position scanned.
        last: u32,
    },
    /// One slot was read (or degraded to unknown).
    SlotScanned(Slot),
    /// A slot scan finished.
    ScanFinished {
        /// Empty slots found.
        empty: usize,
        /// Occupied slots found.
        occupied: usize,
        /// Slots that could not be read.
        unknown: usize,
    },
    /// A plan action is about to run.
    ActionStarted(PlanAction),
    /// One upgrade was queued on a slot.
    UpgradeStep {
        /// Slot upgraded.
        position: SlotPosition,
        /// Level observed before the step.
        from_level: u32,
    },
    /// A plan action finished.
    ActionFinished(ExecutionResult),
    /// Periodic plot search status.
    PlotSearch {
        /// Tiles probed so far.
        probed: usize,
        /// Empty plots found so far.
        found: usize,
    },
    /// An empty plot was found.
    PlotFound(Coordinate),
    /// The settlement workflow entered a state.
    StateEntered(WorkflowState),
}

/// Receiver of progress events.
pub trait ProgressSink: Send {
    /// Called once per event, in order.
    fn emit(&mut self, event: ProgressEvent);
}

/// Discards every event.
pub struct NoOpSink;

impl ProgressSink for NoOpSink {
    fn emit(&mut self, _event: ProgressEvent) {}
}

/// Forwards events to an unbounded tokio channel.
///
/// Sending never blocks; events are dropped once the receiver is gone.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver that drains it.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&mut self, event: ProgressEvent) {
        if self.tx.send(event).is_err() {
            debug!("progress receiver dropped");
        }
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct VecSink {
    /// Events received so far.
    pub events: Vec<ProgressEvent>,
}

impl ProgressSink for VecSink {
    fn emit(&mut self, event: ProgressEvent) {
        self.events.push(event);
    }
}
