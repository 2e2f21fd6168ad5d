//! S3 staging store

use crate::error::AwsError;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use ocrbatch_domain::{ObjectStore, StoreError};
use std::fmt::Debug;

/// Codes S3 returns when the caller lacks permission
const DENIED_CODES: &[&str] = &[
    "AccessDenied",
    "AllAccessDisabled",
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
];

/// Codes S3 returns for a missing bucket or key
const MISSING_CODES: &[&str] = &["NoSuchBucket", "NoSuchKey", "NotFound"];

/// Object store backed by one S3 bucket
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Create a store for `bucket`
    pub fn new(config: &SdkConfig, bucket: impl Into<String>) -> Self {
        Self {
            client: Client::new(config),
            bucket: bucket.into(),
        }
    }

    /// Bucket this store writes to
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/pdf")
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn head(&self, key: &str) -> Result<bool, StoreError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(e)) if e.err().is_not_found() => Ok(false),
            Err(e) => Err(classify(e)),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    fn describe(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}

fn classify<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: Debug,
{
    let message = DisplayErrorContext(&err).to_string();
    if matches!(
        err,
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_)
    ) {
        return StoreError::Transport(message);
    }
    classify_code(err.code(), message)
}

fn classify_code(code: Option<&str>, message: String) -> StoreError {
    match code {
        Some(c) if DENIED_CODES.contains(&c) => StoreError::PermissionDenied(message),
        Some(c) if MISSING_CODES.contains(&c) => StoreError::NotFound(message),
        _ => StoreError::Other(message),
    }
}

/// Region hosting `bucket`
///
/// S3 reports no location constraint for `us-east-1` and the legacy `EU`
/// constraint for `eu-west-1`.
pub async fn bucket_region(config: &SdkConfig, bucket: &str) -> Result<String, AwsError> {
    let client = Client::new(config);
    let output = client
        .get_bucket_location()
        .bucket(bucket)
        .send()
        .await
        .map_err(|e| AwsError::S3(DisplayErrorContext(&e).to_string()))?;

    let constraint = output
        .location_constraint()
        .map(|c| c.as_str().to_string())
        .unwrap_or_default();
    Ok(normalize_location(&constraint))
}

fn normalize_location(constraint: &str) -> String {
    match constraint {
        "" => "us-east-1".to_string(),
        "EU" => "eu-west-1".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_normalization() {
        assert_eq!(normalize_location(""), "us-east-1");
        assert_eq!(normalize_location("EU"), "eu-west-1");
        assert_eq!(normalize_location("ap-southeast-2"), "ap-southeast-2");
    }

    #[test]
    fn test_code_classification() {
        assert!(matches!(
            classify_code(Some("AccessDenied"), "denied".into()),
            StoreError::PermissionDenied(_)
        ));
        assert!(matches!(
            classify_code(Some("NoSuchBucket"), "gone".into()),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            classify_code(None, "?".into()),
            StoreError::Other(_)
        ));
    }

    #[test]
    fn test_describe_uses_s3_uri() {
        let config = SdkConfig::builder()
            .behavior_version(aws_config::BehaviorVersion::latest())
            .build();
        let store = S3ObjectStore::new(&config, "ocr-inputs");
        assert_eq!(
            store.describe("textract-inputs/abc-a.pdf"),
            "s3://ocr-inputs/textract-inputs/abc-a.pdf"
        );
        assert_eq!(store.bucket(), "ocr-inputs");
    }
}
