//! Task bookkeeping.
//!
//! Workflows report what they asked the game to do and how much of it
//! completed. Recording is fire-and-forget: nothing reads it back, and a
//! recorder failure never affects a run.

use serde::Serialize;
use tracing::info;

/// Kind of work recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Slot scan.
    Scan,
    /// New structure construction.
    Construct,
    /// Upgrade of an existing structure.
    Upgrade,
    /// Full preset application.
    Preset,
    /// Settler training order.
    TrainSettlers,
    /// Town hall celebration.
    Celebrate,
    /// Plot search.
    PlotSearch,
    /// Settle request.
    Settle,
}

impl core::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Scan => "scan",
            Self::Construct => "construct",
            Self::Upgrade => "upgrade",
            Self::Preset => "preset",
            Self::TrainSettlers => "train_settlers",
            Self::Celebrate => "celebrate",
            Self::PlotSearch => "plot_search",
            Self::Settle => "settle",
        };
        f.write_str(name)
    }
}

/// Sink for task bookkeeping.
pub trait TaskRecorder: Send {
    /// A task of `kind` covering `count` units was started.
    fn record_task(&mut self, kind: TaskKind, count: u32);

    /// A task of `kind` finished with `completed` of `requested` units done.
    fn record_outcome(&mut self, kind: TaskKind, requested: u32, completed: u32);
}

/// Discards all records.
pub struct NoOpRecorder;

impl TaskRecorder for NoOpRecorder {
    fn record_task(&mut self, _kind: TaskKind, _count: u32) {}

    fn record_outcome(&mut self, _kind: TaskKind, _requested: u32, _completed: u32) {}
}

/// Writes records to the tracing log.
pub struct LogRecorder;

impl TaskRecorder for LogRecorder {
    fn record_task(&mut self, kind: TaskKind, count: u32) {
        info!(task = %kind, count, "task started");
    }

    fn record_outcome(&mut self, kind: TaskKind, requested: u32, completed: u32) {
        info!(task = %kind, requested, completed, "task finished");
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    /// `(kind, count)` per started task.
    pub tasks: Vec<(TaskKind, u32)>,
    /// `(kind, requested, completed)` per finished task.
    pub outcomes: Vec<(TaskKind, u32, u32)>,
}

impl TaskRecorder for MemoryRecorder {
    fn record_task(&mut self, kind: TaskKind, count: u32) {
        self.tasks.push((kind, count));
    }

    fn record_outcome(&mut self, kind: TaskKind, requested: u32, completed: u32) {
        self.outcomes.push((kind, requested, completed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_recorder_keeps_order() {
        let mut recorder = MemoryRecorder::default();
        recorder.record_task(TaskKind::Preset, 12);
        recorder.record_outcome(TaskKind::Preset, 12, 9);
        assert_eq!(recorder.tasks, vec![(TaskKind::Preset, 12)]);
        assert_eq!(recorder.outcomes, vec![(TaskKind::Preset, 12, 9)]);
    }

    #[test]
    fn kinds_serialize_in_snake_case() {
        assert_eq!(TaskKind::TrainSettlers.to_string(), "train_settlers");
        let json = serde_json::to_string(&TaskKind::PlotSearch).ok();
        assert_eq!(json.as_deref(), Some("\"plot_search\""));
    }
}
