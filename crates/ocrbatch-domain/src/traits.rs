//! Trait definitions for external collaborators
//!
//! These traits define the boundaries between orchestration logic and the
//! remote services. Implementations live in other crates (`ocrbatch-aws` for
//! production, `ocrbatch-orchestrator::mock` for tests).

use crate::{ServiceError, StoreError};
use async_trait::async_trait;
use bytes::Bytes;

/// Remote object store used to stage documents
///
/// Keys are full object keys (`<prefix>/<unique name>`).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `bytes` under `key`, replacing any existing object
    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), StoreError>;

    /// Whether an object exists and is readable under `key`
    async fn head(&self, key: &str) -> Result<bool, StoreError>;

    /// Delete the object under `key`
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Human-readable location of `key` for logs (e.g. `s3://bucket/key`)
    fn describe(&self, key: &str) -> String {
        key.to_string()
    }
}

/// Status of a remote OCR job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Still running
    InProgress,

    /// Finished; results can be fetched
    Succeeded,

    /// Finished unsuccessfully
    Failed {
        /// Reason reported by the service
        reason: String,
    },
}

impl JobStatus {
    /// Whether the job has finished one way or the other
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::InProgress)
    }
}

/// One page of OCR results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultPage {
    /// Text lines in the service's native order
    pub lines: Vec<String>,

    /// Continuation token; `None` on the last page
    pub next_token: Option<String>,
}

/// Remote asynchronous OCR service
#[async_trait]
pub trait OcrService: Send + Sync {
    /// Start a text-detection job on the staged object `key`
    async fn start_job(&self, key: &str) -> Result<String, ServiceError>;

    /// Current status of `job_id`
    async fn job_status(&self, job_id: &str) -> Result<JobStatus, ServiceError>;

    /// Fetch one page of results, continuing from `next_token`
    async fn result_page(
        &self,
        job_id: &str,
        next_token: Option<&str>,
    ) -> Result<ResultPage, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_terminal() {
        assert!(!JobStatus::InProgress.is_terminal());
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed {
            reason: "bad".into()
        }
        .is_terminal());
    }
}
