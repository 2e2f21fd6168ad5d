//! ocrbatch Orchestrator
//!
//! Drives batches of documents through a remote, rate-limited OCR service
//! under bounded concurrency.
//!
//! # Overview
//!
//! Each document passes through one pipeline owned by a single worker lane:
//!
//! | Stage | Component | On failure |
//! |-------|-----------|------------|
//! | Discover | [`Discovery`] | Run aborts (bad root) |
//! | Stage | [`Stager`] | Task `Failed` (`stage_error`), never retried |
//! | Submit | [`Submitter`] | Throttling retried with backoff, then `submission_exhausted` |
//! | Await | [`Poller`] | `Failed` (`poll_failure`) or `TimedOut` at the deadline |
//! | Materialize | [`Materializer`] | `Failed` (`io_error`) even though OCR succeeded |
//! | Cleanup | [`Stager::release`] | Logged only |
//!
//! Staged objects are released after `Succeeded` or `Failed` unless
//! `retain_uploaded` is set. `TimedOut` documents keep their object, because
//! the remote job may still finish.
//!
//! # Usage
//!
//! ```no_run
//! use ocrbatch_orchestrator::mock::{MemoryObjectStore, ScriptedOcrService};
//! use ocrbatch_orchestrator::{Orchestrator, OrchestratorConfig};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = OrchestratorConfig {
//!         bucket: "ocr-inputs".to_string(),
//!         ..Default::default()
//!     };
//!     let orchestrator = Orchestrator::new(
//!         config,
//!         Arc::new(MemoryObjectStore::new()),
//!         Arc::new(ScriptedOcrService::new()),
//!     )?;
//!
//!     let cancel = CancellationToken::new();
//!     let ctrl_c = cancel.clone();
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         ctrl_c.cancel();
//!     });
//!
//!     let report = orchestrator.run(&[PathBuf::from("scans")], cancel).await?;
//!     println!("{}", report.summary_line());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collector;
pub mod config;
pub mod controller;
pub mod discovery;
pub mod error;
pub mod materializer;
pub mod mock;
pub mod poller;
pub mod stager;
pub mod submitter;
pub mod worker;

pub use collector::{ReportCollector, ReportEvent};
pub use config::OrchestratorConfig;
pub use controller::Orchestrator;
pub use discovery::{Discovery, DocumentDescriptor};
pub use error::OrchestratorError;
pub use materializer::Materializer;
pub use poller::Poller;
pub use stager::Stager;
pub use submitter::{RetryPolicy, Submitter};
pub use worker::DocumentWorker;
