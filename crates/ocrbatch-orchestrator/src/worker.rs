//! Per-document pipeline
//!
//! A `DocumentWorker` takes one task from `Pending` to a terminal state:
//! stage, submit, await, materialize, then release the staged object when
//! configured to. Every failure is recorded on the task; nothing escapes.

use crate::config::OrchestratorConfig;
use crate::materializer::Materializer;
use crate::poller::Poller;
use crate::stager::Stager;
use crate::submitter::{RetryPolicy, Submitter};
use ocrbatch_domain::{DocumentTask, ErrorKind, ObjectStore, OcrService, TaskError, TaskState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Deadline used when `now + timeout` does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Runs the full lifecycle of a single document
pub struct DocumentWorker {
    stager: Stager,
    submitter: Submitter,
    poller: Poller,
    materializer: Materializer,
    timeout: Duration,
    retain_uploaded: bool,
}

impl DocumentWorker {
    /// Build a worker from run configuration and collaborators
    pub fn new(
        config: &OrchestratorConfig,
        store: Arc<dyn ObjectStore>,
        service: Arc<dyn OcrService>,
    ) -> Self {
        let policy = RetryPolicy::new(config.max_submit_attempts, config.submit_backoff_base());
        Self {
            stager: Stager::new(store, config.prefix.clone()),
            submitter: Submitter::new(Arc::clone(&service), policy),
            poller: Poller::new(service, config.poll_interval(), policy),
            materializer: Materializer::new(config.output_dir.clone()),
            timeout: config.document_timeout(),
            retain_uploaded: config.retain_uploaded,
        }
    }

    /// Drive `task` to a terminal state
    ///
    /// A task picked up after cancellation fails as `Interrupted` without
    /// touching any collaborator.
    pub async fn process(&self, task: &mut DocumentTask, cancel: &CancellationToken) {
        let result = if cancel.is_cancelled() {
            Err(TaskError::interrupted())
        } else {
            self.drive(task, cancel).await
        };

        match result {
            Ok(path) => {
                if let Err(e) = task.succeed(&path) {
                    record_failure(task, e.into());
                } else {
                    tracing::info!(output = %path.display(), "Document succeeded");
                }
            }
            Err(e) => record_failure(task, e),
        }

        self.cleanup(task).await;
    }

    /// Rebuild a failed task for a document whose pipeline panicked
    ///
    /// Staging keys are deterministic, so an object uploaded before the panic
    /// is found again, reported on the task and released like any other
    /// failure.
    pub async fn recover_panicked(
        &self,
        source_path: PathBuf,
        relative_path: PathBuf,
        message: String,
    ) -> DocumentTask {
        let mut task = DocumentTask::new(source_path, relative_path);
        if let Some(key) = self.stager.find_staged(task.source_path()).await {
            if let Err(e) = task.mark_staged(key) {
                tracing::error!(error = %e, "Could not record recovered object");
            }
        }
        record_failure(&mut task, TaskError::new(ErrorKind::Internal, message));
        self.cleanup(&task).await;
        task
    }

    async fn drive(
        &self,
        task: &mut DocumentTask,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, TaskError> {
        // in-flight uploads and submissions run to completion; cancellation is
        // checked once they return
        self.stager.stage(task).await?;
        if cancel.is_cancelled() {
            return Err(TaskError::interrupted());
        }

        let job_id = self.submitter.submit(task, cancel).await?;
        let now = tokio::time::Instant::now();
        let deadline = now
            .checked_add(self.timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);
        task.mark_submitted(job_id, deadline.into_std())?;
        if cancel.is_cancelled() {
            return Err(TaskError::interrupted());
        }

        let text = self.poller.await_text(task, cancel).await?;
        self.materializer.materialize(task, &text).await
    }

    /// Release the staged object of a finished task
    ///
    /// Skipped when objects are retained, when nothing was staged, and for
    /// `TimedOut` tasks whose remote job may still complete.
    async fn cleanup(&self, task: &DocumentTask) {
        if self.retain_uploaded {
            return;
        }
        if !matches!(task.state(), TaskState::Succeeded | TaskState::Failed) {
            return;
        }
        if let Some(key) = task.remote_key() {
            self.stager.release(key).await;
        }
    }
}

fn record_failure(task: &mut DocumentTask, error: TaskError) {
    let kind = error.kind;
    let message = error.message.clone();
    if let Err(e) = task.fail(error) {
        tracing::error!(error = %e, "Could not record task failure");
        return;
    }
    match task.state() {
        TaskState::TimedOut => tracing::warn!(reason = %message, "Document timed out"),
        _ => tracing::warn!(kind = %kind, reason = %message, "Document failed"),
    }
}
