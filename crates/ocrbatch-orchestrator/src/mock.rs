//! In-memory collaborators for deterministic testing
//!
//! Both mocks are cheap to clone; clones share state, so a test can keep one
//! handle for inspection while the orchestrator owns another.
//!
//! # Examples
//!
//! ```
//! use ocrbatch_orchestrator::mock::{MemoryObjectStore, ScriptedOcrService};
//!
//! let store = MemoryObjectStore::new();
//! store.fail_puts_matching("locked.pdf");
//!
//! let service = ScriptedOcrService::new();
//! service.never_finish_matching("slow.pdf");
//! service.set_in_progress_polls(2);
//!
//! assert!(store.is_empty());
//! assert_eq!(service.start_calls(), 0);
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use ocrbatch_domain::{JobStatus, ObjectStore, OcrService, ResultPage, ServiceError, StoreError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct StoreState {
    objects: HashMap<String, Bytes>,
    puts: usize,
    deletes: usize,
    fail_puts: Vec<String>,
    hidden: Vec<String>,
    fail_deletes: Vec<String>,
}

/// Object store backed by a `HashMap`
///
/// Failures are injected per key substring: a key containing a registered
/// pattern triggers the configured failure.
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryObjectStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject uploads of keys containing `pattern` with a permission error
    pub fn fail_puts_matching(&self, pattern: impl Into<String>) {
        lock(&self.state).fail_puts.push(pattern.into());
    }

    /// Accept uploads of keys containing `pattern` but report them missing
    pub fn hide_objects_matching(&self, pattern: impl Into<String>) {
        lock(&self.state).hidden.push(pattern.into());
    }

    /// Fail deletion of keys containing `pattern`
    pub fn fail_deletes_matching(&self, pattern: impl Into<String>) {
        lock(&self.state).fail_deletes.push(pattern.into());
    }

    /// Stored bytes for `key`
    pub fn get(&self, key: &str) -> Option<Bytes> {
        lock(&self.state).objects.get(key).cloned()
    }

    /// Whether `key` is currently stored
    pub fn contains(&self, key: &str) -> bool {
        lock(&self.state).objects.contains_key(key)
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        lock(&self.state).objects.len()
    }

    /// Whether the store holds no objects
    pub fn is_empty(&self) -> bool {
        lock(&self.state).objects.is_empty()
    }

    /// Sorted list of stored keys
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = lock(&self.state).objects.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of `put` calls, including failed ones
    pub fn put_count(&self) -> usize {
        lock(&self.state).puts
    }

    /// Number of `delete` calls, including failed ones
    pub fn delete_count(&self) -> usize {
        lock(&self.state).deletes
    }
}

fn matches_any(patterns: &[String], key: &str) -> bool {
    patterns.iter().any(|p| key.contains(p.as_str()))
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), StoreError> {
        let mut state = lock(&self.state);
        state.puts += 1;
        if matches_any(&state.fail_puts, key) {
            return Err(StoreError::PermissionDenied(format!("Access Denied: {}", key)));
        }
        state.objects.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn head(&self, key: &str) -> Result<bool, StoreError> {
        let state = lock(&self.state);
        Ok(state.objects.contains_key(key) && !matches_any(&state.hidden, key))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut state = lock(&self.state);
        state.deletes += 1;
        if matches_any(&state.fail_deletes, key) {
            return Err(StoreError::Transport(format!("connection reset deleting {}", key)));
        }
        state.objects.remove(key);
        Ok(())
    }

    fn describe(&self, key: &str) -> String {
        format!("memory://{}", key)
    }
}

#[derive(Debug)]
struct Job {
    key: String,
    status_calls: u32,
    finished: bool,
}

#[derive(Debug)]
struct ServiceState {
    next_job: u64,
    jobs: HashMap<String, Job>,
    start_calls: usize,
    page_calls: usize,
    throttle_submits: Vec<(String, u32)>,
    reject_submits: Vec<(String, String)>,
    panic_submits: Vec<String>,
    never_finish: Vec<String>,
    fail_jobs: Vec<(String, String)>,
    lines: Vec<(String, Vec<String>)>,
    in_progress_polls: u32,
    throttled_status_checks: u32,
    throttled_pages: u32,
    page_size: usize,
    active: usize,
    peak_active: usize,
}

impl Default for ServiceState {
    fn default() -> Self {
        Self {
            next_job: 1,
            jobs: HashMap::new(),
            start_calls: 0,
            page_calls: 0,
            throttle_submits: Vec::new(),
            reject_submits: Vec::new(),
            panic_submits: Vec::new(),
            never_finish: Vec::new(),
            fail_jobs: Vec::new(),
            lines: Vec::new(),
            in_progress_polls: 0,
            throttled_status_checks: 0,
            throttled_pages: 0,
            page_size: 1000,
            active: 0,
            peak_active: 0,
        }
    }
}

impl ServiceState {
    fn lines_for(&self, key: &str) -> Vec<String> {
        self.lines
            .iter()
            .find(|(p, _)| key.contains(p.as_str()))
            .map(|(_, lines)| lines.clone())
            .unwrap_or_else(|| vec![format!("Page text for {}", key)])
    }
}

/// OCR service whose behavior is scripted per object key
///
/// By default every job starts on the first call, completes on its first
/// status check, and returns a single line `Page text for <key>`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOcrService {
    state: Arc<Mutex<ServiceState>>,
}

impl ScriptedOcrService {
    /// Create a service where everything succeeds immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// Throttle the first `times` submissions of keys containing `pattern`
    ///
    /// `u32::MAX` throttles forever.
    pub fn throttle_submits_matching(&self, pattern: impl Into<String>, times: u32) {
        lock(&self.state)
            .throttle_submits
            .push((pattern.into(), times));
    }

    /// Permanently reject submissions of keys containing `pattern`
    pub fn reject_submits_matching(&self, pattern: impl Into<String>, message: impl Into<String>) {
        lock(&self.state)
            .reject_submits
            .push((pattern.into(), message.into()));
    }

    /// Panic inside `start_job` for keys containing `pattern`
    pub fn panic_on_submit_matching(&self, pattern: impl Into<String>) {
        lock(&self.state).panic_submits.push(pattern.into());
    }

    /// Jobs for keys containing `pattern` stay in progress forever
    pub fn never_finish_matching(&self, pattern: impl Into<String>) {
        lock(&self.state).never_finish.push(pattern.into());
    }

    /// Jobs for keys containing `pattern` end in failure with `reason`
    pub fn fail_jobs_matching(&self, pattern: impl Into<String>, reason: impl Into<String>) {
        lock(&self.state)
            .fail_jobs
            .push((pattern.into(), reason.into()));
    }

    /// Result lines for keys containing `pattern`
    pub fn set_lines_matching(&self, pattern: impl Into<String>, lines: Vec<String>) {
        lock(&self.state).lines.push((pattern.into(), lines));
    }

    /// Status checks that report `InProgress` before a job finishes
    pub fn set_in_progress_polls(&self, polls: u32) {
        lock(&self.state).in_progress_polls = polls;
    }

    /// Throttle the next `times` status checks of any job
    pub fn throttle_status_checks(&self, times: u32) {
        lock(&self.state).throttled_status_checks = times;
    }

    /// Throttle the next `times` result-page fetches of any job
    ///
    /// `u32::MAX` throttles forever.
    pub fn throttle_pages(&self, times: u32) {
        lock(&self.state).throttled_pages = times;
    }

    /// Lines per result page
    pub fn set_page_size(&self, size: usize) {
        lock(&self.state).page_size = size.max(1);
    }

    /// Number of `start_job` calls
    pub fn start_calls(&self) -> usize {
        lock(&self.state).start_calls
    }

    /// Number of `result_page` calls
    pub fn page_calls(&self) -> usize {
        lock(&self.state).page_calls
    }

    /// Status checks issued for jobs whose key contains `pattern`
    pub fn status_calls_matching(&self, pattern: &str) -> u32 {
        lock(&self.state)
            .jobs
            .values()
            .filter(|j| j.key.contains(pattern))
            .map(|j| j.status_calls)
            .sum()
    }

    /// Highest number of started jobs not yet observed as finished
    pub fn peak_active_jobs(&self) -> usize {
        lock(&self.state).peak_active
    }
}

#[async_trait]
impl OcrService for ScriptedOcrService {
    async fn start_job(&self, key: &str) -> Result<String, ServiceError> {
        let mut state = lock(&self.state);
        state.start_calls += 1;

        if matches_any(&state.panic_submits, key) {
            drop(state);
            panic!("scripted panic submitting {}", key);
        }

        if let Some((_, message)) = state
            .reject_submits
            .iter()
            .find(|(p, _)| key.contains(p.as_str()))
        {
            return Err(ServiceError::Rejected(message.clone()));
        }
        if let Some((_, remaining)) = state
            .throttle_submits
            .iter_mut()
            .find(|(p, n)| *n > 0 && key.contains(p.as_str()))
        {
            if *remaining != u32::MAX {
                *remaining -= 1;
            }
            return Err(ServiceError::Throttled("Rate exceeded".to_string()));
        }

        let job_id = format!("job-{:04}", state.next_job);
        state.next_job += 1;
        state.jobs.insert(
            job_id.clone(),
            Job {
                key: key.to_string(),
                status_calls: 0,
                finished: false,
            },
        );
        state.active += 1;
        state.peak_active = state.peak_active.max(state.active);
        Ok(job_id)
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatus, ServiceError> {
        let mut guard = lock(&self.state);
        let state = &mut *guard;
        let job = state
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| ServiceError::Rejected(format!("unknown job {}", job_id)))?;
        job.status_calls += 1;

        if state.throttled_status_checks > 0 {
            state.throttled_status_checks -= 1;
            return Err(ServiceError::Throttled("Rate exceeded".to_string()));
        }
        if matches_any(&state.never_finish, &job.key) || job.status_calls <= state.in_progress_polls {
            return Ok(JobStatus::InProgress);
        }

        let status = match state.fail_jobs.iter().find(|(p, _)| job.key.contains(p.as_str())) {
            Some((_, reason)) => JobStatus::Failed {
                reason: reason.clone(),
            },
            None => JobStatus::Succeeded,
        };
        if !job.finished {
            job.finished = true;
            state.active = state.active.saturating_sub(1);
        }
        Ok(status)
    }

    async fn result_page(
        &self,
        job_id: &str,
        next_token: Option<&str>,
    ) -> Result<ResultPage, ServiceError> {
        let mut state = lock(&self.state);
        state.page_calls += 1;

        if state.throttled_pages > 0 {
            if state.throttled_pages != u32::MAX {
                state.throttled_pages -= 1;
            }
            return Err(ServiceError::Throttled("Rate exceeded".to_string()));
        }

        let key = state
            .jobs
            .get(job_id)
            .map(|j| j.key.clone())
            .ok_or_else(|| ServiceError::Rejected(format!("unknown job {}", job_id)))?;
        let offset = match next_token {
            None => 0,
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| ServiceError::Rejected(format!("invalid token {}", token)))?,
        };

        let lines = state.lines_for(&key);
        let end = (offset + state.page_size).min(lines.len());
        let page = lines.get(offset..end).map(<[String]>::to_vec).unwrap_or_default();
        let next_token = (end < lines.len()).then(|| end.to_string());
        Ok(ResultPage {
            lines: page,
            next_token,
        })
    }
}
