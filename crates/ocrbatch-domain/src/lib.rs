//! ocrbatch Domain Layer
//!
//! Core data model and collaborator interfaces for the batch OCR orchestrator.
//! Every other crate in the workspace depends on this one; it carries no
//! runtime or SDK dependencies.
//!
//! ## Key Concepts
//!
//! - **Document task**: one input file's journey through staging, OCR
//!   submission, polling, and materialization
//! - **Task state**: `Pending → Staged → Submitted → Polling → {Succeeded, Failed, TimedOut}`
//! - **Run report**: the aggregate outcome of one invocation
//! - **Collaborators**: the remote object store and the remote OCR service,
//!   expressed as traits so the orchestrator never touches an SDK directly

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod report;
pub mod state;
pub mod task;
pub mod traits;

// Re-exports for convenience
pub use error::{ErrorKind, ServiceError, StoreError, TaskError, TransitionError};
pub use report::{DocumentOutcome, RunReport};
pub use state::TaskState;
pub use task::DocumentTask;
pub use traits::{JobStatus, ObjectStore, OcrService, ResultPage};
