//! Concurrency controller
//!
//! Runs a fixed number of worker lanes over a shared pull queue fed by the
//! input enumerator. Each lane finishes one document before pulling the next.

use crate::collector::{ReportCollector, ReportEvent, ReportSender};
use crate::config::OrchestratorConfig;
use crate::discovery::{DocumentDescriptor, Discovery};
use crate::worker::DocumentWorker;
use crate::OrchestratorError;
use ocrbatch_domain::{DocumentOutcome, DocumentTask, ObjectStore, OcrService, RunReport};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

type SharedQueue = Arc<Mutex<mpsc::Receiver<DocumentDescriptor>>>;

/// Batch OCR orchestrator
///
/// # Examples
///
/// ```no_run
/// use ocrbatch_orchestrator::mock::{MemoryObjectStore, ScriptedOcrService};
/// use ocrbatch_orchestrator::{Orchestrator, OrchestratorConfig};
/// use std::path::PathBuf;
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = OrchestratorConfig {
///     bucket: "ocr-inputs".to_string(),
///     workers: 3,
///     ..Default::default()
/// };
/// let orchestrator = Orchestrator::new(
///     config,
///     Arc::new(MemoryObjectStore::new()),
///     Arc::new(ScriptedOcrService::new()),
/// )?;
///
/// let report = orchestrator
///     .run(&[PathBuf::from("scans")], CancellationToken::new())
///     .await?;
/// println!("{}", report.summary_line());
/// # Ok(())
/// # }
/// ```
pub struct Orchestrator {
    config: OrchestratorConfig,
    worker: Arc<DocumentWorker>,
}

impl Orchestrator {
    /// Validate `config` and wire the collaborators
    pub fn new(
        config: OrchestratorConfig,
        store: Arc<dyn ObjectStore>,
        service: Arc<dyn OcrService>,
    ) -> Result<Self, OrchestratorError> {
        config.validate()?;
        let worker = Arc::new(DocumentWorker::new(&config, store, service));
        Ok(Self { config, worker })
    }

    /// Configuration of this orchestrator
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Process every document under `inputs`
    ///
    /// Per-document failures are reported in the returned `RunReport`. The run
    /// itself fails only when an input root is invalid, when the walk breaks
    /// (after in-flight documents finish), or when every document failed. The
    /// last two errors carry the report.
    /// Cancelling `cancel` interrupts in-flight documents; the rest of the
    /// queue drains as `Interrupted` failures.
    pub async fn run(
        &self,
        inputs: &[PathBuf],
        cancel: CancellationToken,
    ) -> Result<RunReport, OrchestratorError> {
        let run_id = Uuid::now_v7();
        let span = tracing::info_span!("run", run_id = %run_id);
        self.run_inner(run_id, inputs, cancel).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        inputs: &[PathBuf],
        cancel: CancellationToken,
    ) -> Result<RunReport, OrchestratorError> {
        let discovery = Discovery::new(inputs, self.config.recursive, &self.config.extensions)?;
        tracing::info!(
            roots = inputs.len(),
            workers = self.config.workers,
            bucket = %self.config.bucket,
            "Starting run"
        );

        let (queue_tx, queue_rx) = mpsc::channel(self.config.workers);
        let feeder = tokio::task::spawn_blocking(move || {
            for item in discovery.iter() {
                let descriptor = item?;
                if queue_tx.blocking_send(descriptor).is_err() {
                    break;
                }
            }
            Ok::<(), OrchestratorError>(())
        });

        let (collector, report_tx) = ReportCollector::spawn(run_id);
        let queue: SharedQueue = Arc::new(Mutex::new(queue_rx));

        let mut lanes = Vec::with_capacity(self.config.workers);
        for lane in 0..self.config.workers {
            let queue = Arc::clone(&queue);
            let worker = Arc::clone(&self.worker);
            let report_tx = report_tx.clone();
            let cancel = cancel.clone();
            let span = tracing::debug_span!("lane", lane);
            lanes.push(tokio::spawn(
                run_lane(queue, worker, report_tx, cancel).instrument(span),
            ));
        }
        drop(report_tx);

        for handle in lanes {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Worker lane terminated abnormally");
            }
        }

        let walk = feeder
            .await
            .map_err(|e| OrchestratorError::Worker(format!("discovery task failed: {}", e)))?;
        let report = collector
            .finish()
            .await
            .map_err(|e| OrchestratorError::Worker(format!("report collector failed: {}", e)))?;

        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            timed_out = report.timed_out,
            "Run finished"
        );

        if let Err(e) = walk {
            let reason = match e {
                OrchestratorError::Discovery(msg) => msg,
                other => other.to_string(),
            };
            return Err(OrchestratorError::DiscoveryAborted {
                reason,
                report: Box::new(report),
            });
        }
        if report.is_total_failure() {
            return Err(OrchestratorError::AllDocumentsFailed {
                report: Box::new(report),
            });
        }
        Ok(report)
    }
}

async fn run_lane(
    queue: SharedQueue,
    worker: Arc<DocumentWorker>,
    report_tx: ReportSender,
    cancel: CancellationToken,
) {
    loop {
        let next = queue.lock().await.recv().await;
        let Some(descriptor) = next else {
            break;
        };

        let _ = report_tx.send(ReportEvent::Discovered);
        let outcome = run_document(Arc::clone(&worker), descriptor, cancel.clone()).await;
        let _ = report_tx.send(ReportEvent::Finished(outcome));
    }
}

/// Process one document on its own task so a panic stays contained
async fn run_document(
    worker: Arc<DocumentWorker>,
    descriptor: DocumentDescriptor,
    cancel: CancellationToken,
) -> DocumentOutcome {
    let DocumentDescriptor {
        path,
        relative_path,
    } = descriptor;
    let span = tracing::info_span!("document", path = %path.display());

    let handle = {
        let worker = Arc::clone(&worker);
        let path = path.clone();
        let relative_path = relative_path.clone();
        tokio::spawn(
            async move {
                let mut task = DocumentTask::new(path, relative_path);
                worker.process(&mut task, &cancel).await;
                task.to_outcome()
            }
            .instrument(span),
        )
    };

    match handle.await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Document worker panicked");
            worker
                .recover_panicked(path, relative_path, format!("worker panicked: {}", e))
                .await
                .to_outcome()
        }
    }
}
