//! ocrbatch AWS adapters
//!
//! Production implementations of the orchestrator's collaborators:
//!
//! - [`S3ObjectStore`]: stages documents in an S3 bucket
//! - [`TextractService`]: asynchronous text detection with Amazon Textract
//!
//! Credentials and the default region come from the standard AWS provider
//! chain (environment, shared config, instance metadata).
//!
//! # Examples
//!
//! ```no_run
//! use ocrbatch_aws::{load_sdk_config, S3ObjectStore, TextractConfig, TextractService};
//!
//! # async fn example() {
//! let sdk_config = load_sdk_config(Some("eu-west-1")).await;
//! let store = S3ObjectStore::new(&sdk_config, "ocr-inputs");
//! let service = TextractService::new(&sdk_config, "ocr-inputs", TextractConfig::default());
//! # }
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod s3;
pub mod textract;

use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;

pub use aws_config::SdkConfig;
pub use error::AwsError;
pub use s3::{bucket_region, S3ObjectStore};
pub use textract::{TextractConfig, TextractService};

/// Load shared SDK configuration, optionally pinning the region
pub async fn load_sdk_config(region: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }
    loader.load().await
}

/// Region the SDK configuration resolved to, if any
pub fn session_region(config: &SdkConfig) -> Option<String> {
    config.region().map(|r| r.to_string())
}
