//! Error types shared across the workspace
//!
//! `TaskError` is the per-document failure record stored on a task. The
//! collaborator errors (`StoreError`, `ServiceError`) are what the object store
//! and OCR service adapters return.

use crate::TaskState;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of a per-document failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Upload or post-upload verification failed
    #[serde(rename = "stage_error")]
    Stage,

    /// The service throttled a submission (retried; only terminal if recorded by a caller)
    SubmissionThrottled,

    /// The service refused the job (malformed input, unsupported format, quota)
    SubmissionRejected,

    /// Throttled on every allowed submission attempt
    SubmissionExhausted,

    /// The remote job reported failure, or its status/results could not be read
    PollFailure,

    /// Deadline reached before a terminal remote status
    TimeoutExceeded,

    /// Writing the text artifact failed
    #[serde(rename = "io_error")]
    Io,

    /// Run-level cancellation
    Interrupted,

    /// Orchestrator bug (invalid transition, panicked worker)
    Internal,
}

impl ErrorKind {
    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Stage => "stage_error",
            ErrorKind::SubmissionThrottled => "submission_throttled",
            ErrorKind::SubmissionRejected => "submission_rejected",
            ErrorKind::SubmissionExhausted => "submission_exhausted",
            ErrorKind::PollFailure => "poll_failure",
            ErrorKind::TimeoutExceeded => "timeout_exceeded",
            ErrorKind::Io => "io_error",
            ErrorKind::Interrupted => "interrupted",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure detail recorded on a task in `Failed` or `TimedOut`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    /// What went wrong
    pub kind: ErrorKind,

    /// Human-readable detail
    pub message: String,
}

impl TaskError {
    /// Create a new task error
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for an `Interrupted` error
    pub fn interrupted() -> Self {
        Self::new(ErrorKind::Interrupted, "run interrupted")
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for TaskError {}

/// Illegal state change on a `DocumentTask`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid task transition: {from} -> {to}")]
pub struct TransitionError {
    /// State the task was in
    pub from: TaskState,
    /// State that was requested
    pub to: TaskState,
}

impl From<TransitionError> for TaskError {
    fn from(e: TransitionError) -> Self {
        TaskError::new(ErrorKind::Internal, e.to_string())
    }
}

/// Errors returned by object store adapters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Network or transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Credentials or bucket policy refused the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Object does not exist
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Anything else reported by the store
    #[error("Store error: {0}")]
    Other(String),
}

/// Errors returned by OCR service adapters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Transient: rate limited, overloaded, or the call did not complete
    #[error("Throttled: {0}")]
    Throttled(String),

    /// Permanent: the service refused the request
    #[error("Rejected: {0}")]
    Rejected(String),
}

impl ServiceError {
    /// Whether retrying the same request later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceError::Throttled(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_error_display() {
        let err = TaskError::new(ErrorKind::Stage, "access denied");
        assert_eq!(err.to_string(), "stage_error: access denied");
    }

    #[test]
    fn test_transition_error_becomes_internal() {
        let err: TaskError = TransitionError {
            from: TaskState::Succeeded,
            to: TaskState::Failed,
        }
        .into();
        assert_eq!(err.kind, ErrorKind::Internal);
        assert!(err.message.contains("succeeded -> failed"));
    }

    #[test]
    fn test_service_error_transience() {
        assert!(ServiceError::Throttled("slow down".into()).is_transient());
        assert!(!ServiceError::Rejected("bad pdf".into()).is_transient());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::SubmissionExhausted).unwrap();
        assert_eq!(json, "\"submission_exhausted\"");
    }
}
