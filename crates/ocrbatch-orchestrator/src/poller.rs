//! Poll/await engine
//!
//! Checks a submitted job's status at a fixed interval until the service
//! reports a terminal status or the task's deadline passes, then assembles
//! the result pages into text.

use crate::submitter::RetryPolicy;
use ocrbatch_domain::{DocumentTask, ErrorKind, JobStatus, OcrService, ServiceError, TaskError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Drives one task from `Submitted` to a finished remote job
pub struct Poller {
    service: Arc<dyn OcrService>,
    interval: Duration,
    fetch_policy: RetryPolicy,
}

impl Poller {
    /// Create a poller with a fixed `interval` between status checks
    ///
    /// `fetch_policy` bounds retries of throttled result-page fetches.
    pub fn new(service: Arc<dyn OcrService>, interval: Duration, fetch_policy: RetryPolicy) -> Self {
        Self {
            service,
            interval,
            fetch_policy,
        }
    }

    /// Move the task to `Polling` and wait for its job, returning the text
    ///
    /// # Errors
    ///
    /// - `TimeoutExceeded` when the deadline passes first; the remote job is left running
    /// - `PollFailure` when the job fails or its status/results are refused
    /// - `Interrupted` on cancellation
    pub async fn await_text(
        &self,
        task: &mut DocumentTask,
        cancel: &CancellationToken,
    ) -> Result<String, TaskError> {
        task.mark_polling()?;
        let job_id = task
            .job_id()
            .ok_or_else(|| TaskError::new(ErrorKind::Internal, "polling without a job id"))?
            .to_string();
        let deadline = task
            .deadline()
            .map(Instant::from_std)
            .ok_or_else(|| TaskError::new(ErrorKind::Internal, "polling without a deadline"))?;

        self.wait_for_completion(&job_id, deadline, cancel).await?;
        self.fetch_text(&job_id, cancel).await
    }

    async fn wait_for_completion(
        &self,
        job_id: &str,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<(), TaskError> {
        let mut polls: u32 = 0;
        loop {
            if Instant::now() >= deadline {
                return Err(timed_out(job_id, polls));
            }

            polls += 1;
            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TaskError::interrupted()),
                res = tokio::time::timeout_at(deadline, self.service.job_status(job_id)) => {
                    match res {
                        Ok(status) => status,
                        Err(_) => return Err(timed_out(job_id, polls)),
                    }
                }
            };

            match status {
                Ok(JobStatus::Succeeded) => {
                    tracing::debug!(job_id, polls, "OCR job succeeded");
                    return Ok(());
                }
                Ok(JobStatus::Failed { reason }) => {
                    return Err(TaskError::new(
                        ErrorKind::PollFailure,
                        format!("job {} failed: {}", job_id, reason),
                    ));
                }
                Ok(JobStatus::InProgress) => {
                    tracing::trace!(job_id, polls, "OCR job in progress");
                }
                Err(ServiceError::Throttled(msg)) => {
                    tracing::warn!(job_id, error = %msg, "Status check throttled, retrying next tick");
                }
                Err(ServiceError::Rejected(msg)) => {
                    return Err(TaskError::new(
                        ErrorKind::PollFailure,
                        format!("status of job {} unavailable: {}", job_id, msg),
                    ));
                }
            }

            let wake = (Instant::now() + self.interval).min(deadline);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TaskError::interrupted()),
                _ = tokio::time::sleep_until(wake) => {}
            }
        }
    }

    /// Follow continuation tokens and join every line in page order
    async fn fetch_text(&self, job_id: &str, cancel: &CancellationToken) -> Result<String, TaskError> {
        let mut lines: Vec<String> = Vec::new();
        let mut next_token: Option<String> = None;
        let mut pages = 0;

        loop {
            let mut attempt = 1;
            let page = loop {
                let res = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(TaskError::interrupted()),
                    res = self.service.result_page(job_id, next_token.as_deref()) => res,
                };
                match res {
                    Ok(page) => break page,
                    Err(ServiceError::Throttled(msg)) if attempt < self.fetch_policy.max_attempts => {
                        let delay = self.fetch_policy.delay_for(attempt);
                        tracing::warn!(job_id, attempt, error = %msg, "Result fetch throttled, backing off");
                        tokio::select! {
                            _ = cancel.cancelled() => return Err(TaskError::interrupted()),
                            _ = tokio::time::sleep(delay) => {}
                        }
                        attempt += 1;
                    }
                    Err(e) => {
                        return Err(TaskError::new(
                            ErrorKind::PollFailure,
                            format!("fetching results of job {}: {}", job_id, e),
                        ));
                    }
                }
            };

            pages += 1;
            lines.extend(page.lines);
            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(job_id, pages, lines = lines.len(), "Fetched OCR results");
        Ok(lines.join("\n"))
    }
}

fn timed_out(job_id: &str, polls: u32) -> TaskError {
    TaskError::new(
        ErrorKind::TimeoutExceeded,
        format!("job {} still running after {} status check(s)", job_id, polls),
    )
}
