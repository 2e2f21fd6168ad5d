//! Configuration for orchestrator runs
//!
//! Defines concurrency width, polling cadence, per-document deadline, the
//! object store namespace, and submission retry bounds.

use crate::OrchestratorError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Immutable parameters for one run
///
/// # Examples
///
/// ```
/// use ocrbatch_orchestrator::OrchestratorConfig;
///
/// let config = OrchestratorConfig {
///     bucket: "my-ocr-inputs".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(config.workers, 4);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Number of concurrent worker lanes
    /// Default: 4
    pub workers: usize,

    /// Seconds between status checks of one job
    /// Default: 5.0
    pub poll_interval_secs: f64,

    /// Seconds a document may spend polling after submission
    /// Default: 1800.0 (30 minutes)
    pub document_timeout_secs: f64,

    /// Object store bucket for staged documents
    pub bucket: String,

    /// Key prefix for staged documents
    /// Default: "textract-inputs"
    pub prefix: String,

    /// Keep staged objects after the task finishes
    /// Default: false (delete after `Succeeded` or `Failed`)
    #[serde(default)]
    pub retain_uploaded: bool,

    /// Descend into subdirectories of input roots
    /// Default: true
    #[serde(default = "default_recursive")]
    pub recursive: bool,

    /// Accepted file extensions, compared case-insensitively
    /// Default: ["pdf"]
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory receiving the `.txt` artifacts
    /// Default: "out"
    pub output_dir: PathBuf,

    /// Total submission attempts while the service throttles
    /// Default: 3
    pub max_submit_attempts: u32,

    /// Delay before the first submission retry (milliseconds), doubled per retry
    /// Default: 1000
    pub submit_backoff_base_ms: u64,
}

/// Whether `secs` converts to a `Duration` without saturating
fn representable(secs: f64) -> bool {
    Duration::try_from_secs_f64(secs).is_ok()
}

fn default_recursive() -> bool {
    true
}

fn default_extensions() -> Vec<String> {
    vec!["pdf".to_string()]
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            poll_interval_secs: 5.0,
            document_timeout_secs: 1800.0,
            bucket: String::new(),
            prefix: "textract-inputs".to_string(),
            retain_uploaded: false,
            recursive: true,
            extensions: default_extensions(),
            output_dir: PathBuf::from("out"),
            max_submit_attempts: 3,
            submit_backoff_base_ms: 1000,
        }
    }
}

impl OrchestratorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.workers == 0 {
            return Err(OrchestratorError::Config(
                "workers must be greater than 0".to_string(),
            ));
        }
        if !(self.poll_interval_secs > 0.0 && representable(self.poll_interval_secs)) {
            return Err(OrchestratorError::Config(format!(
                "poll interval must be a positive number of seconds (got {})",
                self.poll_interval_secs
            )));
        }
        if !(self.document_timeout_secs > 0.0 && representable(self.document_timeout_secs)) {
            return Err(OrchestratorError::Config(format!(
                "document timeout must be a positive number of seconds (got {})",
                self.document_timeout_secs
            )));
        }
        if self.bucket.trim().is_empty() {
            return Err(OrchestratorError::Config("bucket must not be empty".to_string()));
        }
        if self.max_submit_attempts == 0 {
            return Err(OrchestratorError::Config(
                "max_submit_attempts must be at least 1".to_string(),
            ));
        }
        if self.extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(OrchestratorError::Config(
                "at least one input extension is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the poll interval as Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.poll_interval_secs).unwrap_or_default()
    }

    /// Get the per-document timeout as Duration
    pub fn document_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.document_timeout_secs).unwrap_or_default()
    }

    /// Get the first submission backoff delay as Duration
    pub fn submit_backoff_base(&self) -> Duration {
        Duration::from_millis(self.submit_backoff_base_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> OrchestratorConfig {
        OrchestratorConfig {
            bucket: "bucket".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.workers, 4);
        assert_eq!(config.poll_interval_secs, 5.0);
        assert_eq!(config.document_timeout_secs, 1800.0);
        assert_eq!(config.prefix, "textract-inputs");
        assert_eq!(config.max_submit_attempts, 3);
        assert!(config.recursive);
        assert!(!config.retain_uploaded);
        assert_eq!(config.extensions, vec!["pdf".to_string()]);
    }

    #[test]
    fn test_default_requires_bucket() {
        assert!(matches!(
            OrchestratorConfig::default().validate(),
            Err(OrchestratorError::Config(_))
        ));
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_rejects_degenerate_values() {
        let cases = [
            OrchestratorConfig { workers: 0, ..valid() },
            OrchestratorConfig { poll_interval_secs: 0.0, ..valid() },
            OrchestratorConfig { document_timeout_secs: f64::NAN, ..valid() },
            OrchestratorConfig { document_timeout_secs: 1e20, ..valid() },
            OrchestratorConfig { poll_interval_secs: f64::INFINITY, ..valid() },
            OrchestratorConfig { max_submit_attempts: 0, ..valid() },
            OrchestratorConfig { extensions: vec![], ..valid() },
        ];
        for config in cases {
            assert!(config.validate().is_err(), "{:?}", config);
        }
    }

    #[test]
    fn test_duration_conversions() {
        let config = OrchestratorConfig {
            poll_interval_secs: 0.25,
            document_timeout_secs: 90.0,
            submit_backoff_base_ms: 500,
            ..valid()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.document_timeout(), Duration::from_secs(90));
        assert_eq!(config.submit_backoff_base(), Duration::from_millis(500));
    }

    #[test]
    fn test_serde_roundtrip_applies_defaults() {
        let json = r#"{
            "workers": 2,
            "poll_interval_secs": 1.0,
            "document_timeout_secs": 10.0,
            "bucket": "b",
            "prefix": "p",
            "output_dir": "o",
            "max_submit_attempts": 5,
            "submit_backoff_base_ms": 10
        }"#;
        let config: OrchestratorConfig = serde_json::from_str(json).unwrap();
        assert!(config.recursive);
        assert!(!config.retain_uploaded);
        assert_eq!(config.extensions, vec!["pdf".to_string()]);
        assert_eq!(config.max_submit_attempts, 5);
    }
}
