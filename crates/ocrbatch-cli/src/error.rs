//! Error types for the CLI application.

use ocrbatch_orchestrator::OrchestratorError;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// Exit code for runs where some document did not succeed.
pub const EXIT_PARTIAL: i32 = 1;

/// Exit code for unusable configuration or inputs.
pub const EXIT_USAGE: i32 = 2;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input paths could not be enumerated
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Orchestrator error
    #[error(transparent)]
    Orchestrator(OrchestratorError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<OrchestratorError> for CliError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::Config(msg) => CliError::Config(msg),
            OrchestratorError::Discovery(msg)
            | OrchestratorError::DiscoveryAborted { reason: msg, .. } => CliError::Discovery(msg),
            other => CliError::Orchestrator(other),
        }
    }
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::Discovery(_) | CliError::Toml(_) => EXIT_USAGE,
            _ => EXIT_PARTIAL,
        }
    }
}
