//! Error types for AWS adapters

use thiserror::Error;

/// Errors raised outside of the collaborator traits
#[derive(Error, Debug)]
pub enum AwsError {
    /// Bucket metadata could not be read
    #[error("S3 error: {0}")]
    S3(String),
}

/// Error codes AWS uses for throttling and transient server trouble
pub(crate) const TRANSIENT_CODES: &[&str] = &[
    "ThrottlingException",
    "Throttling",
    "ProvisionedThroughputExceededException",
    "LimitExceededException",
    "InternalServerError",
    "ServiceUnavailable",
    "SlowDown",
];

/// Whether an AWS error code denotes a retryable condition
pub(crate) fn is_transient_code(code: Option<&str>) -> bool {
    code.map(|c| TRANSIENT_CODES.contains(&c)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_codes() {
        assert!(is_transient_code(Some("ThrottlingException")));
        assert!(is_transient_code(Some("LimitExceededException")));
        assert!(!is_transient_code(Some("InvalidS3ObjectException")));
        assert!(!is_transient_code(Some("AccessDeniedException")));
        assert!(!is_transient_code(None));
    }
}
