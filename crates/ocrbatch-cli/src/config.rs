//! Configuration file handling and layering.
//!
//! Values are resolved in three layers: command-line flags override the
//! `[run]` table of the config file, which overrides built-in defaults.

use crate::cli::Cli;
use crate::error::{CliError, Result};
use ocrbatch_orchestrator::OrchestratorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Run parameters
    #[serde(default)]
    pub run: RunSection,

    /// Display settings
    #[serde(default)]
    pub settings: Settings,
}

/// `[run]` table; every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSection {
    /// S3 bucket for staged documents
    pub bucket: Option<String>,
    /// S3 key prefix
    pub prefix: Option<String>,
    /// AWS region
    pub region: Option<String>,
    /// Output directory
    pub output_dir: Option<PathBuf>,
    /// Concurrent jobs
    pub workers: Option<usize>,
    /// Recurse into subdirectories
    pub recursive: Option<bool>,
    /// Seconds between status checks
    pub poll_interval_secs: Option<f64>,
    /// Per-document timeout in seconds
    pub document_timeout_secs: Option<f64>,
    /// Keep uploaded objects
    pub retain_uploaded: Option<bool>,
    /// Submission attempts under throttling
    pub max_submit_attempts: Option<u32>,
    /// First submission backoff delay in milliseconds
    pub submit_backoff_base_ms: Option<u64>,
    /// Accepted input extensions
    pub extensions: Option<Vec<String>>,
}

/// Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

/// Fully resolved parameters for one invocation.
#[derive(Debug, Clone)]
pub struct ResolvedRun {
    /// Orchestrator configuration
    pub orchestrator: OrchestratorConfig,
    /// Explicit AWS region, if any
    pub region: Option<String>,
}

impl Config {
    /// Get the default configuration file path.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".ocrbatch").join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicitly named file must exist; a missing default file yields the
    /// built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_file(path),
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    Self::load_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn load_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Layer command-line flags over this file's values.
    pub fn resolve(&self, cli: &Cli) -> Result<ResolvedRun> {
        let file = &self.run;
        let defaults = OrchestratorConfig::default();

        let bucket = cli
            .bucket
            .clone()
            .or_else(|| file.bucket.clone())
            .ok_or_else(|| {
                CliError::Config(
                    "a bucket is required (--bucket, OCRBATCH_BUCKET, or run.bucket)".into(),
                )
            })?;

        let orchestrator = OrchestratorConfig {
            workers: cli.jobs.or(file.workers).unwrap_or(defaults.workers),
            poll_interval_secs: cli
                .poll_seconds
                .or(file.poll_interval_secs)
                .unwrap_or(defaults.poll_interval_secs),
            document_timeout_secs: cli
                .timeout_seconds
                .or(file.document_timeout_secs)
                .unwrap_or(defaults.document_timeout_secs),
            bucket,
            prefix: cli
                .prefix
                .clone()
                .or_else(|| file.prefix.clone())
                .unwrap_or(defaults.prefix),
            retain_uploaded: cli.keep_uploaded
                || file.retain_uploaded.unwrap_or(defaults.retain_uploaded),
            recursive: !cli.no_recursive && file.recursive.unwrap_or(defaults.recursive),
            extensions: file.extensions.clone().unwrap_or(defaults.extensions),
            output_dir: cli
                .output_dir
                .clone()
                .or_else(|| file.output_dir.clone())
                .unwrap_or(defaults.output_dir),
            max_submit_attempts: cli
                .max_attempts
                .or(file.max_submit_attempts)
                .unwrap_or(defaults.max_submit_attempts),
            submit_backoff_base_ms: file
                .submit_backoff_base_ms
                .unwrap_or(defaults.submit_backoff_base_ms),
        };
        orchestrator.validate()?;

        Ok(ResolvedRun {
            orchestrator,
            region: cli.region.clone().or_else(|| file.region.clone()),
        })
    }
}
