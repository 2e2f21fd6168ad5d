//! Document task - one unit of work for the orchestrator

use crate::{DocumentOutcome, ErrorKind, TaskError, TaskState, TransitionError};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// One input document's end-to-end journey
///
/// A task is owned by exactly one worker for its whole lifetime. Fields are
/// private so that state and the data attached to it always change together:
/// `remote_key` is set when the task is staged, `job_id` when it is submitted,
/// `result_path` only on success, and `error` only in `Failed`/`TimedOut`.
///
/// # Examples
///
/// ```
/// use ocrbatch_domain::{DocumentTask, TaskState};
///
/// let mut task = DocumentTask::new("in/report.pdf", "report.pdf");
/// assert_eq!(task.state(), TaskState::Pending);
///
/// task.mark_staged("textract-inputs/ab12-report.pdf").unwrap();
/// assert_eq!(task.remote_key(), Some("textract-inputs/ab12-report.pdf"));
/// ```
#[derive(Debug, Clone)]
pub struct DocumentTask {
    source_path: PathBuf,
    relative_path: PathBuf,
    remote_key: Option<String>,
    job_id: Option<String>,
    state: TaskState,
    attempt: u32,
    deadline: Option<Instant>,
    error: Option<TaskError>,
    result_path: Option<PathBuf>,
}

impl DocumentTask {
    /// Create a pending task
    ///
    /// `relative_path` is the document's path relative to the root it was
    /// discovered under; it decides where the text artifact lands.
    pub fn new(source_path: impl Into<PathBuf>, relative_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            relative_path: relative_path.into(),
            remote_key: None,
            job_id: None,
            state: TaskState::Pending,
            attempt: 0,
            deadline: None,
            error: None,
            result_path: None,
        }
    }

    /// Location of the input file
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Path relative to the discovery root
    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    /// Object store key, once staged
    pub fn remote_key(&self) -> Option<&str> {
        self.remote_key.as_deref()
    }

    /// OCR job identifier, once submitted
    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    /// Current state
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Submission retries consumed
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Instant after which polling must stop
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Last recorded failure
    pub fn error(&self) -> Option<&TaskError> {
        self.error.as_ref()
    }

    /// Output file location, once succeeded
    pub fn result_path(&self) -> Option<&Path> {
        self.result_path.as_deref()
    }

    /// Whether the task has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    fn transition(&mut self, next: TaskState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(next) {
            return Err(TransitionError {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Record a successful upload under `key`
    pub fn mark_staged(&mut self, key: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(TaskState::Staged)?;
        self.remote_key = Some(key.into());
        Ok(())
    }

    /// Count one submission retry
    ///
    /// Retries do not change state; the task stays `Staged`.
    pub fn record_submit_retry(&mut self) {
        self.attempt += 1;
    }

    /// Record the job id and the polling deadline
    pub fn mark_submitted(
        &mut self,
        job_id: impl Into<String>,
        deadline: Instant,
    ) -> Result<(), TransitionError> {
        self.transition(TaskState::Submitted)?;
        self.job_id = Some(job_id.into());
        self.deadline = Some(deadline);
        Ok(())
    }

    /// Enter the polling loop
    pub fn mark_polling(&mut self) -> Result<(), TransitionError> {
        self.transition(TaskState::Polling)
    }

    /// Record the written artifact
    pub fn succeed(&mut self, result_path: impl Into<PathBuf>) -> Result<(), TransitionError> {
        self.transition(TaskState::Succeeded)?;
        self.result_path = Some(result_path.into());
        Ok(())
    }

    /// Move to `Failed` or `TimedOut` depending on the error kind
    ///
    /// `TimeoutExceeded` maps to `TimedOut`; every other kind maps to `Failed`.
    /// A timeout outside of `Polling` is recorded as a failure instead.
    pub fn fail(&mut self, error: TaskError) -> Result<(), TransitionError> {
        let next = if error.kind == ErrorKind::TimeoutExceeded
            && self.state.can_transition_to(TaskState::TimedOut)
        {
            TaskState::TimedOut
        } else {
            TaskState::Failed
        };
        self.transition(next)?;
        self.error = Some(error);
        Ok(())
    }

    /// Snapshot of the task for the run report
    pub fn to_outcome(&self) -> DocumentOutcome {
        DocumentOutcome {
            path: self.source_path.clone(),
            state: self.state,
            error: self.error.clone(),
            output_path: self.result_path.clone(),
            remote_key: self.remote_key.clone(),
            job_id: self.job_id.clone(),
            attempts: self.attempt,
        }
    }
}
