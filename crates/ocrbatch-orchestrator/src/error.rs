//! Error types for orchestrator runs
//!
//! Only run-level failures live here. Per-document failures are recorded on
//! the task as `TaskError` and never surface through this type.

use ocrbatch_domain::RunReport;
use thiserror::Error;

/// Errors that abort or condemn a whole run
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Input path missing or unreadable
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Invalid run configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The walk broke after some documents were already processed
    #[error("Discovery error: {reason}")]
    DiscoveryAborted {
        /// What stopped the walk
        reason: String,
        /// Report of the documents processed before the walk broke
        report: Box<RunReport>,
    },

    /// Every document failed, which points at a systemic problem
    #[error("All {} document(s) failed", report.outcomes.len())]
    AllDocumentsFailed {
        /// The finalized report, still useful for display
        report: Box<RunReport>,
    },

    /// Worker error (tokio runtime issues)
    #[error("Worker error: {0}")]
    Worker(String),
}

impl OrchestratorError {
    /// The report attached to the error, if any
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            OrchestratorError::AllDocumentsFailed { report }
            | OrchestratorError::DiscoveryAborted { report, .. } => Some(report),
            _ => None,
        }
    }
}
