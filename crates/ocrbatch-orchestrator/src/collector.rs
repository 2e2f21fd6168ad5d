//! Report collection
//!
//! Worker lanes never share the report. They send outcomes over a channel to
//! a single collecting task, which owns the `RunReport` until the run ends.

use ocrbatch_domain::{DocumentOutcome, RunReport};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Messages accepted by the collector
#[derive(Debug)]
pub enum ReportEvent {
    /// A document was handed to the lanes
    Discovered,

    /// A document reached a terminal state
    Finished(DocumentOutcome),
}

/// Handle used by the controller and lanes to feed the collector
pub type ReportSender = mpsc::UnboundedSender<ReportEvent>;

/// Owns the report accumulator task
pub struct ReportCollector {
    handle: JoinHandle<RunReport>,
}

impl ReportCollector {
    /// Spawn the collector and return it with its sender
    pub fn spawn(run_id: Uuid) -> (Self, ReportSender) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            let mut report = RunReport::new(run_id);
            while let Some(event) = rx.recv().await {
                match event {
                    ReportEvent::Discovered => report.record_discovered(),
                    ReportEvent::Finished(outcome) => {
                        if !outcome.state.is_terminal() {
                            tracing::error!(
                                path = %outcome.path.display(),
                                state = %outcome.state,
                                "Outcome reported in a non-terminal state"
                            );
                        }
                        tracing::debug!(
                            path = %outcome.path.display(),
                            state = %outcome.state,
                            "Recorded outcome"
                        );
                        report.record(outcome);
                    }
                }
            }
            report.finalize();
            report
        });
        (Self { handle }, tx)
    }

    /// Wait for every sender to drop and return the finalized report
    pub async fn finish(self) -> Result<RunReport, tokio::task::JoinError> {
        self.handle.await
    }
}
