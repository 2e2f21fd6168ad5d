//! Task state module - lifecycle stages for document tasks

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a document task
///
/// Tasks only move forward through these stages:
/// - Pending: discovered, nothing done remotely yet
/// - Staged: uploaded to the object store
/// - Submitted: an OCR job was started
/// - Polling: waiting for the OCR job to reach a terminal status
/// - Succeeded / Failed / TimedOut: terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Discovered but not yet staged
    Pending,

    /// Uploaded to the object store
    Staged,

    /// OCR job accepted by the service
    Submitted,

    /// Waiting on the remote job
    Polling,

    /// Text extracted and written to disk
    Succeeded,

    /// Terminal failure (see the task error for the kind)
    Failed,

    /// Deadline elapsed before the remote job finished
    TimedOut,
}

impl TaskState {
    /// Get the state name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Staged => "staged",
            TaskState::Submitted => "submitted",
            TaskState::Polling => "polling",
            TaskState::Succeeded => "succeeded",
            TaskState::Failed => "failed",
            TaskState::TimedOut => "timed_out",
        }
    }

    /// Parse a state from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(TaskState::Pending),
            "staged" => Some(TaskState::Staged),
            "submitted" => Some(TaskState::Submitted),
            "polling" => Some(TaskState::Polling),
            "succeeded" => Some(TaskState::Succeeded),
            "failed" => Some(TaskState::Failed),
            "timed_out" | "timedout" => Some(TaskState::TimedOut),
            _ => None,
        }
    }

    /// Whether no further automatic transition can occur from this state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed | TaskState::TimedOut
        )
    }

    /// Whether `next` is a legal successor of this state
    ///
    /// Any non-terminal state may fail. Only `Polling` may succeed or time out.
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        use TaskState::*;
        match (self, next) {
            (Pending, Staged) => true,
            (Staged, Submitted) => true,
            (Submitted, Polling) => true,
            (Polling, Succeeded) | (Polling, TimedOut) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid task state: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_progression() {
        assert!(TaskState::Pending.can_transition_to(TaskState::Staged));
        assert!(TaskState::Staged.can_transition_to(TaskState::Submitted));
        assert!(TaskState::Submitted.can_transition_to(TaskState::Polling));
        assert!(TaskState::Polling.can_transition_to(TaskState::Succeeded));
        assert!(TaskState::Polling.can_transition_to(TaskState::TimedOut));
    }

    #[test]
    fn test_no_regression_or_skips() {
        assert!(!TaskState::Staged.can_transition_to(TaskState::Pending));
        assert!(!TaskState::Polling.can_transition_to(TaskState::Submitted));
        assert!(!TaskState::Pending.can_transition_to(TaskState::Succeeded));
        assert!(!TaskState::Submitted.can_transition_to(TaskState::TimedOut));
    }

    #[test]
    fn test_failure_from_any_live_state() {
        for state in [
            TaskState::Pending,
            TaskState::Staged,
            TaskState::Submitted,
            TaskState::Polling,
        ] {
            assert!(state.can_transition_to(TaskState::Failed), "{}", state);
        }
        for state in [TaskState::Succeeded, TaskState::Failed, TaskState::TimedOut] {
            assert!(!state.can_transition_to(TaskState::Failed), "{}", state);
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!(TaskState::parse("Polling"), Some(TaskState::Polling));
        assert_eq!(TaskState::parse("timed_out"), Some(TaskState::TimedOut));
        assert_eq!("succeeded".parse::<TaskState>(), Ok(TaskState::Succeeded));
        assert!(TaskState::parse("done").is_none());
    }
}
