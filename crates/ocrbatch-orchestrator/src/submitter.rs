//! Job submission with bounded retry under throttling

use ocrbatch_domain::{DocumentTask, ErrorKind, OcrService, ServiceError, TaskError};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Bounded exponential backoff
///
/// `max_attempts` counts every call, including the first. The wait before
/// retry `n` (1-based) is `base_delay * 2^(n-1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total calls allowed
    pub max_attempts: u32,

    /// Wait before the first retry
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Wait before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Starts OCR jobs for staged documents
pub struct Submitter {
    service: Arc<dyn OcrService>,
    policy: RetryPolicy,
}

impl Submitter {
    /// Create a submitter
    pub fn new(service: Arc<dyn OcrService>, policy: RetryPolicy) -> Self {
        Self { service, policy }
    }

    /// Start a job for the task's staged object and return its id
    ///
    /// `Throttled` responses are retried with backoff until the policy is
    /// exhausted (`SubmissionExhausted`); `Rejected` fails immediately
    /// (`SubmissionRejected`). Each retry is counted on the task. An in-flight
    /// call is never abandoned; cancellation is observed between attempts.
    pub async fn submit(
        &self,
        task: &mut DocumentTask,
        cancel: &CancellationToken,
    ) -> Result<String, TaskError> {
        let key = task
            .remote_key()
            .ok_or_else(|| TaskError::new(ErrorKind::Internal, "submit called before staging"))?
            .to_string();

        let mut attempt = 1;
        loop {
            match self.service.start_job(&key).await {
                Ok(job_id) => {
                    tracing::info!(job_id = %job_id, attempt, "Started OCR job");
                    return Ok(job_id);
                }
                Err(ServiceError::Rejected(msg)) => {
                    return Err(TaskError::new(ErrorKind::SubmissionRejected, msg));
                }
                Err(ServiceError::Throttled(msg)) => {
                    if attempt >= self.policy.max_attempts {
                        return Err(TaskError::new(
                            ErrorKind::SubmissionExhausted,
                            format!("throttled on all {} attempts: {}", attempt, msg),
                        ));
                    }

                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Submission throttled, backing off"
                    );
                    task.record_submit_retry();

                    tokio::select! {
                        _ = cancel.cancelled() => return Err(TaskError::interrupted()),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedOcrService;

    fn staged_task(name: &str) -> DocumentTask {
        let mut task = DocumentTask::new(format!("/in/{}", name), name);
        task.mark_staged(format!("prefix/0000-{}", name)).unwrap();
        task
    }

    fn submitter(service: &ScriptedOcrService) -> Submitter {
        Submitter::new(
            Arc::new(service.clone()),
            RetryPolicy::new(3, Duration::from_secs(1)),
        )
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn test_policy_allows_at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_try_success() {
        let service = ScriptedOcrService::new();
        let mut task = staged_task("a.pdf");
        let job = submitter(&service)
            .submit(&mut task, &CancellationToken::new())
            .await
            .unwrap();
        assert!(!job.is_empty());
        assert_eq!(task.attempt(), 0);
        assert_eq!(service.start_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttled_then_success() {
        let service = ScriptedOcrService::new();
        service.throttle_submits_matching("a.pdf", 2);
        let mut task = staged_task("a.pdf");

        let started = tokio::time::Instant::now();
        let result = submitter(&service)
            .submit(&mut task, &CancellationToken::new())
            .await;

        assert!(result.is_ok());
        assert_eq!(task.attempt(), 2);
        assert_eq!(service.start_calls(), 3);
        // 1s + 2s of backoff
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_is_bounded() {
        let service = ScriptedOcrService::new();
        service.throttle_submits_matching("a.pdf", u32::MAX);
        let mut task = staged_task("a.pdf");

        let err = submitter(&service)
            .submit(&mut task, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::SubmissionExhausted);
        assert_eq!(service.start_calls(), 3);
        assert_eq!(task.attempt(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_is_not_retried() {
        let service = ScriptedOcrService::new();
        service.reject_submits_matching("a.pdf", "unsupported document");
        let mut task = staged_task("a.pdf");

        let err = submitter(&service)
            .submit(&mut task, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::SubmissionRejected);
        assert!(err.message.contains("unsupported document"));
        assert_eq!(service.start_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let service = ScriptedOcrService::new();
        service.throttle_submits_matching("a.pdf", u32::MAX);
        let mut task = staged_task("a.pdf");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = submitter(&service).submit(&mut task, &cancel).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Interrupted);
        assert_eq!(service.start_calls(), 1);
    }

    #[tokio::test]
    async fn test_unstaged_task_is_internal_error() {
        let service = ScriptedOcrService::new();
        let mut task = DocumentTask::new("/in/a.pdf", "a.pdf");
        let err = submitter(&service)
            .submit(&mut task, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Internal);
        assert_eq!(service.start_calls(), 0);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: delays never shrink from one retry to the next and saturate
        /// instead of overflowing
        #[test]
        fn test_delay_is_monotonic(base_ms in 0u64..=u64::MAX / 2, retry in 1u32..200) {
            let policy = RetryPolicy::new(3, Duration::from_millis(base_ms));
            let current = policy.delay_for(retry);
            let next = policy.delay_for(retry + 1);
            prop_assert!(next >= current);
            prop_assert!(current >= policy.base_delay);
        }
    }
}
