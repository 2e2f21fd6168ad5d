//! Run report - aggregate outcome of one orchestrator invocation

use crate::{ErrorKind, TaskError, TaskState};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Final outcome of a single document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentOutcome {
    /// Input file
    pub path: PathBuf,

    /// Terminal state
    pub state: TaskState,

    /// Failure detail for `Failed`/`TimedOut`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,

    /// Written text artifact for `Succeeded`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    /// Object store key, when the document was staged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_key: Option<String>,

    /// OCR job id, when the document was submitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,

    /// Submission retries consumed
    #[serde(default)]
    pub attempts: u32,
}

/// Aggregate report for one run
///
/// Created empty at run start, appended to as tasks finish, then finalized
/// once every discovered document has an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Identifier of this run
    pub run_id: Uuid,

    /// Documents handed to workers
    pub total_discovered: usize,

    /// Documents that ended `Succeeded`
    pub succeeded: usize,

    /// Documents that ended `Failed`
    pub failed: usize,

    /// Documents that ended `TimedOut`
    pub timed_out: usize,

    /// Per-document outcomes, sorted by path once finalized
    pub outcomes: Vec<DocumentOutcome>,
}

impl RunReport {
    /// Create an empty report
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            total_discovered: 0,
            succeeded: 0,
            failed: 0,
            timed_out: 0,
            outcomes: Vec::new(),
        }
    }

    /// Count one discovered document
    pub fn record_discovered(&mut self) {
        self.total_discovered += 1;
    }

    /// Append a finished document
    pub fn record(&mut self, outcome: DocumentOutcome) {
        match outcome.state {
            TaskState::Succeeded => self.succeeded += 1,
            TaskState::TimedOut => self.timed_out += 1,
            _ => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    /// Sort outcomes by source path for reproducible output
    pub fn finalize(&mut self) {
        self.outcomes.sort_by(|a, b| a.path.cmp(&b.path));
    }

    /// Whether every document succeeded
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.timed_out == 0
    }

    /// Whether every document failed for a reason other than interruption
    ///
    /// An empty run is never a total failure.
    pub fn is_total_failure(&self) -> bool {
        !self.outcomes.is_empty()
            && self.outcomes.iter().all(|o| {
                o.state == TaskState::Failed
                    && o.error.as_ref().map(|e| e.kind) != Some(ErrorKind::Interrupted)
            })
    }

    /// Number of outcomes with the given error kind
    pub fn count_kind(&self, kind: ErrorKind) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.error.as_ref().map(|e| e.kind) == Some(kind))
            .count()
    }

    /// One-line summary of counts per terminal state
    pub fn summary_line(&self) -> String {
        format!(
            "Processed {} document(s): {} succeeded, {} failed, {} timed out",
            self.total_discovered, self.succeeded, self.failed, self.timed_out
        )
    }
}
