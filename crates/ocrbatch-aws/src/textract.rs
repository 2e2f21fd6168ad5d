//! Amazon Textract text detection
//!
//! Jobs are started against objects already staged in S3. Status checks
//! request a single result so they stay cheap; text is fetched afterwards in
//! pages of `page_size` and only `LINE` blocks contribute.

use crate::error::is_transient_code;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_textract::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_textract::operation::get_document_text_detection::GetDocumentTextDetectionOutput;
use aws_sdk_textract::types::{self as tx, BlockType, DocumentLocation, S3Object};
use aws_sdk_textract::Client;
use ocrbatch_domain::{JobStatus, OcrService, ResultPage, ServiceError};
use std::fmt::Debug;

/// Tuning for [`TextractService`]
#[derive(Debug, Clone)]
pub struct TextractConfig {
    /// Maximum blocks per result page
    /// Default: 1000 (the service maximum)
    pub page_size: i32,
}

impl Default for TextractConfig {
    fn default() -> Self {
        Self { page_size: 1000 }
    }
}

/// OCR service backed by Textract's asynchronous text detection API
#[derive(Debug, Clone)]
pub struct TextractService {
    client: Client,
    bucket: String,
    config: TextractConfig,
}

impl TextractService {
    /// Create a service reading staged documents from `bucket`
    pub fn new(sdk_config: &SdkConfig, bucket: impl Into<String>, config: TextractConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
            bucket: bucket.into(),
            config,
        }
    }
}

#[async_trait]
impl OcrService for TextractService {
    async fn start_job(&self, key: &str) -> Result<String, ServiceError> {
        let location = DocumentLocation::builder()
            .s3_object(S3Object::builder().bucket(&self.bucket).name(key).build())
            .build();

        let output = self
            .client
            .start_document_text_detection()
            .document_location(location)
            .send()
            .await
            .map_err(classify)?;

        output
            .job_id()
            .map(str::to_string)
            .ok_or_else(|| ServiceError::Rejected("response carried no job id".to_string()))
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatus, ServiceError> {
        let output = self
            .client
            .get_document_text_detection()
            .job_id(job_id)
            .max_results(1)
            .send()
            .await
            .map_err(classify)?;

        Ok(map_status(output.job_status(), output.status_message()))
    }

    async fn result_page(
        &self,
        job_id: &str,
        next_token: Option<&str>,
    ) -> Result<ResultPage, ServiceError> {
        let output = self
            .client
            .get_document_text_detection()
            .job_id(job_id)
            .max_results(self.config.page_size)
            .set_next_token(next_token.map(str::to_string))
            .send()
            .await
            .map_err(classify)?;

        tracing::trace!(job_id, blocks = output.blocks().len(), "Fetched Textract page");
        Ok(to_page(&output))
    }
}

fn map_status(status: Option<&tx::JobStatus>, message: Option<&str>) -> JobStatus {
    let with_message = |label: &str| match message {
        Some(m) if !m.is_empty() => format!("{}: {}", label, m),
        _ => label.to_string(),
    };
    match status {
        Some(tx::JobStatus::Succeeded) => JobStatus::Succeeded,
        Some(tx::JobStatus::InProgress) | None => JobStatus::InProgress,
        Some(tx::JobStatus::PartialSuccess) => JobStatus::Failed {
            reason: with_message("partial success"),
        },
        Some(tx::JobStatus::Failed) => JobStatus::Failed {
            reason: with_message("failed"),
        },
        Some(other) => JobStatus::Failed {
            reason: with_message(other.as_str()),
        },
    }
}

fn to_page(output: &GetDocumentTextDetectionOutput) -> ResultPage {
    let lines = output
        .blocks()
        .iter()
        .filter(|b| b.block_type() == Some(&BlockType::Line))
        .filter_map(|b| b.text())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    ResultPage {
        lines,
        next_token: output
            .next_token()
            .filter(|t| !t.is_empty())
            .map(str::to_string),
    }
}

fn classify<E, R>(err: SdkError<E, R>) -> ServiceError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: Debug,
{
    let message = DisplayErrorContext(&err).to_string();
    let transient = matches!(
        err,
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_)
    ) || is_transient_code(err.code());

    if transient {
        ServiceError::Throttled(message)
    } else {
        ServiceError::Rejected(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_textract::types::Block;

    fn block(kind: BlockType, text: &str) -> Block {
        Block::builder().block_type(kind).text(text).build()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            map_status(Some(&tx::JobStatus::Succeeded), None),
            JobStatus::Succeeded
        );
        assert_eq!(
            map_status(Some(&tx::JobStatus::InProgress), None),
            JobStatus::InProgress
        );
        assert_eq!(
            map_status(Some(&tx::JobStatus::PartialSuccess), None),
            JobStatus::Failed {
                reason: "partial success".to_string()
            }
        );
        assert_eq!(
            map_status(Some(&tx::JobStatus::Failed), Some("Request has unsupported document format")),
            JobStatus::Failed {
                reason: "failed: Request has unsupported document format".to_string()
            }
        );
    }

    #[test]
    fn test_only_line_blocks_contribute() {
        let output = GetDocumentTextDetectionOutput::builder()
            .blocks(block(BlockType::Page, "ignored"))
            .blocks(block(BlockType::Line, "Invoice 42"))
            .blocks(block(BlockType::Word, "Invoice"))
            .blocks(block(BlockType::Line, "Total: 10.00"))
            .next_token("token-2")
            .build();

        let page = to_page(&output);
        assert_eq!(page.lines, vec!["Invoice 42", "Total: 10.00"]);
        assert_eq!(page.next_token.as_deref(), Some("token-2"));
    }

    #[test]
    fn test_empty_token_ends_pagination() {
        let output = GetDocumentTextDetectionOutput::builder()
            .next_token("")
            .build();
        assert!(to_page(&output).next_token.is_none());
    }

    #[test]
    fn test_default_page_size() {
        assert_eq!(TextractConfig::default().page_size, 1000);
    }
}
