//! ocrbatch CLI library.
//!
//! Argument parsing, configuration layering, logging setup and report
//! rendering for the `ocrbatch` binary.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;

pub use cli::Cli;
pub use config::{Config, ResolvedRun};
pub use error::{CliError, Result};
pub use output::Formatter;
