//! Object staging
//!
//! Uploads documents to the object store under collision-resistant keys and
//! releases them afterwards.

use bytes::Bytes;
use ocrbatch_domain::{DocumentTask, ErrorKind, ObjectStore, TaskError};
use std::path::Path;
use std::sync::Arc;

/// Hex digits of the path digest kept in each key
const KEY_DIGEST_LEN: usize = 16;

/// BLAKE3 digest of a source path, hex encoded
pub(crate) fn path_digest(path: &Path) -> String {
    blake3::hash(path.as_os_str().as_encoded_bytes())
        .to_hex()
        .to_string()
}

/// Uploads documents and deletes them on request
pub struct Stager {
    store: Arc<dyn ObjectStore>,
    prefix: String,
}

impl Stager {
    /// Create a stager writing under `prefix`
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into().trim_matches('/').to_string();
        Self { store, prefix }
    }

    /// Deterministic object key for `path`
    ///
    /// The key is `<prefix>/<digest>-<file name>`, where the digest is a
    /// BLAKE3 hash of the full source path, so two documents sharing a base
    /// name in different directories never collide.
    pub fn key_for(&self, path: &Path) -> String {
        let digest = path_digest(path);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let unique = format!("{}-{}", &digest[..KEY_DIGEST_LEN], name);
        if self.prefix.is_empty() {
            unique
        } else {
            format!("{}/{}", self.prefix, unique)
        }
    }

    /// Upload the task's document and verify it is readable
    ///
    /// The task becomes `Staged` as soon as the upload succeeds, so a failed
    /// verification still leaves the key on the task for cleanup. Failures are
    /// never retried.
    pub async fn stage(&self, task: &mut DocumentTask) -> Result<(), TaskError> {
        let bytes = tokio::fs::read(task.source_path()).await.map_err(|e| {
            TaskError::new(
                ErrorKind::Stage,
                format!("reading {}: {}", task.source_path().display(), e),
            )
        })?;

        let key = self.key_for(task.source_path());
        let size = bytes.len();
        self.store
            .put(&key, Bytes::from(bytes))
            .await
            .map_err(|e| TaskError::new(ErrorKind::Stage, format!("upload failed: {}", e)))?;
        task.mark_staged(key.clone())?;

        match self.store.head(&key).await {
            Ok(true) => {
                tracing::debug!(object = %self.store.describe(&key), size, "Staged document");
                Ok(())
            }
            Ok(false) => Err(TaskError::new(
                ErrorKind::Stage,
                format!("{} not readable after upload", self.store.describe(&key)),
            )),
            Err(e) => Err(TaskError::new(
                ErrorKind::Stage,
                format!("verifying upload failed: {}", e),
            )),
        }
    }

    /// Key of `path`'s object when it is present in the store
    ///
    /// Lookup errors are logged and treated as absent.
    pub async fn find_staged(&self, path: &Path) -> Option<String> {
        let key = self.key_for(path);
        match self.store.head(&key).await {
            Ok(true) => Some(key),
            Ok(false) => None,
            Err(e) => {
                tracing::warn!(object = %self.store.describe(&key), error = %e, "Failed to look up staged object");
                None
            }
        }
    }

    /// Best-effort deletion of a staged object
    ///
    /// Returns whether the object was deleted. Failures are logged, never raised.
    pub async fn release(&self, key: &str) -> bool {
        match self.store.delete(key).await {
            Ok(()) => {
                tracing::debug!(object = %self.store.describe(key), "Released staged object");
                true
            }
            Err(e) => {
                tracing::warn!(
                    object = %self.store.describe(key),
                    error = %e,
                    "Failed to delete staged object"
                );
                false
            }
        }
    }
}
