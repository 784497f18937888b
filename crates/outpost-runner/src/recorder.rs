//! Task records as JSON lines.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use outpost_core::record::{TaskKind, TaskRecorder};
use serde::Serialize;
use tracing::warn;

/// One line of the record file.
#[derive(Debug, Serialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
enum Entry {
    Task {
        at: DateTime<Utc>,
        kind: TaskKind,
        count: u32,
    },
    Outcome {
        at: DateTime<Utc>,
        kind: TaskKind,
        requested: u32,
        completed: u32,
    },
}

/// Appends every record to a file, one JSON object per line.
///
/// Write failures are logged and dropped.
pub struct JsonLinesRecorder {
    file: File,
}

impl JsonLinesRecorder {
    /// Open `path` for appending, creating it if missing.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }

    fn write(&mut self, entry: &Entry) {
        let line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "failed to encode task record");
                return;
            }
        };
        if let Err(e) = writeln!(self.file, "{line}") {
            warn!(error = %e, "failed to write task record");
        }
    }
}

impl TaskRecorder for JsonLinesRecorder {
    fn record_task(&mut self, kind: TaskKind, count: u32) {
        self.write(&Entry::Task {
            at: Utc::now(),
            kind,
            count,
        });
    }

    fn record_outcome(&mut self, kind: TaskKind, requested: u32, completed: u32) {
        self.write(&Entry::Outcome {
            at: Utc::now(),
            kind,
            requested,
            completed,
        });
    }
}
