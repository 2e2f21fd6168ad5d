//! Writes extracted text next to the mirrored input layout

use crate::stager::path_digest;
use ocrbatch_domain::{DocumentTask, ErrorKind, TaskError};
use std::path::{Path, PathBuf};

/// Persists text artifacts under an output root
#[derive(Debug, Clone)]
pub struct Materializer {
    output_dir: PathBuf,
}

impl Materializer {
    /// Create a materializer writing under `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Artifact path for a document path relative to its root
    ///
    /// `sub/report.pdf` maps to `<output_dir>/sub/report.txt`.
    pub fn output_path_for(&self, relative_path: &Path) -> PathBuf {
        self.output_dir.join(relative_path).with_extension("txt")
    }

    /// Write `text` for `task` and return the artifact path
    ///
    /// The file appears atomically: content goes to a sibling temp file first
    /// and is renamed into place. Any failure is an `Io` error and leaves no
    /// partial artifact behind.
    pub async fn materialize(&self, task: &DocumentTask, text: &str) -> Result<PathBuf, TaskError> {
        let target = self.output_path_for(task.relative_path());
        let io_err = |what: &str, e: std::io::Error| {
            TaskError::new(
                ErrorKind::Io,
                format!("{} {}: {}", what, target.display(), e),
            )
        };

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_err("creating directory for", e))?;
        }

        // per-document temp name so concurrent writers never share one
        let mut tmp_name = target.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(format!(".{}.tmp", &path_digest(task.source_path())[..16]));
        let tmp = target.with_file_name(tmp_name);
        if let Err(e) = tokio::fs::write(&tmp, text.as_bytes()).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_err("writing", e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_err("finalizing", e));
        }

        tracing::debug!(path = %target.display(), bytes = text.len(), "Wrote text artifact");
        Ok(target)
    }
}
