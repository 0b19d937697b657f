//! `src/model/job_registry.rs`
//! ============================================================================
//! Liveness table for background jobs.
//!
//! Every job gets a [`JobToken`] when it is registered. Workers poll the token
//! without an id lookup. The registry keeps the id → token mapping so a new
//! selection can cancel everything in one step.

use std::{collections::HashMap, fmt};

use ahash::RandomState;
use compact_str::CompactString;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{AppError, AppResult};

/// Opaque job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(CompactString);

impl JobId {
    #[must_use]
    pub fn generate() -> Self {
        Self(CompactString::new(nanoid::nanoid!()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(CompactString::new(s))
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cancellation handle passed into long-running work.
#[derive(Debug, Clone)]
pub struct JobToken {
    id: JobId,
    cancel: CancellationToken,
}

impl JobToken {
    /// Token that is not tracked by any registry.
    #[must_use]
    pub fn detached(id: JobId) -> Self {
        Self {
            id,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> &JobId {
        &self.id
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// `Err(Cancelled)` once the job has been ended or superseded.
    pub fn check(&self) -> AppResult<()> {
        if self.is_live() {
            Ok(())
        } else {
            Err(AppError::Cancelled)
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Process-wide table of job liveness.
///
/// All mutations go through one mutex, so `cancel_all` is atomic with
/// respect to `is_live` and `is_any_live`.
#[derive(Debug)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobId, JobToken, RandomState>>,
}

impl JobRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::with_hasher(RandomState::new())),
        }
    }

    /// Register `id` as live and hand back its token.
    ///
    /// Re-registering an id cancels the token previously issued for it.
    pub fn begin(&self, id: JobId) -> JobToken {
        let token = JobToken::detached(id.clone());
        let previous = self.jobs.lock().insert(id, token.clone());

        if let Some(previous) = previous {
            previous.cancel();
        }

        trace!(marker = "JOB", operation_type = "job_begin", job_id = %token.id, "Job registered");
        token
    }

    /// Current liveness; `false` for unknown ids.
    #[must_use]
    pub fn is_live(&self, id: &JobId) -> bool {
        self.jobs.lock().get(id).is_some_and(JobToken::is_live)
    }

    /// True if at least one tracked job is live.
    #[must_use]
    pub fn is_any_live(&self) -> bool {
        self.jobs.lock().values().any(JobToken::is_live)
    }

    /// Mark the job finished or cancelled; the entry stays until `remove`.
    pub fn end(&self, id: &JobId) {
        if let Some(token) = self.jobs.lock().get(id) {
            token.cancel();
        }
    }

    /// Drop the entry, but only once it is no longer live.
    pub fn remove(&self, id: &JobId) {
        let mut jobs = self.jobs.lock();
        if jobs.get(id).is_some_and(|token| !token.is_live()) {
            jobs.remove(id);
        }
    }

    /// `end` followed by `remove`.
    pub fn cleanup(&self, id: &JobId) {
        let mut jobs = self.jobs.lock();
        if let Some(token) = jobs.remove(id) {
            token.cancel();
        }
    }

    /// Mark every tracked job cancelled. Entries are removed lazily by
    /// whichever path next observes the cancellation.
    pub fn cancel_all(&self) {
        let jobs = self.jobs.lock();
        for token in jobs.values() {
            token.cancel();
        }
        debug!(
            marker = "JOB",
            operation_type = "cancel_all",
            tracked = jobs.len(),
            "Cancelled all tracked jobs"
        );
    }

    #[must_use]
    pub fn contains(&self, id: &JobId) -> bool {
        self.jobs.lock().contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn unknown_ids_are_not_live() {
        let registry = JobRegistry::new();
        assert!(!registry.is_live(&JobId::from("missing")));
        assert!(!registry.is_any_live());
    }

    #[test]
    fn begin_and_end() {
        let registry = JobRegistry::new();
        let id = JobId::generate();
        let token = registry.begin(id.clone());

        assert!(registry.is_live(&id));
        assert!(token.is_live());

        registry.end(&id);

        assert!(!registry.is_live(&id));
        assert!(!token.is_live());
        assert!(registry.contains(&id));
        assert!(token.check().unwrap_err().is_cancelled());
    }

    #[test]
    fn cancel_all_ends_every_job_but_keeps_entries() {
        let registry = JobRegistry::new();
        let ids: Vec<JobId> = (0..5).map(|_| JobId::generate()).collect();
        let tokens: Vec<JobToken> = ids.iter().cloned().map(|id| registry.begin(id)).collect();

        assert!(registry.is_any_live());

        registry.cancel_all();

        assert!(!registry.is_any_live());
        assert!(ids.iter().all(|id| !registry.is_live(id)));
        assert!(tokens.iter().all(|t| !t.is_live()));
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn remove_ignores_live_jobs() {
        let registry = JobRegistry::new();
        let id = JobId::generate();
        registry.begin(id.clone());

        registry.remove(&id);
        assert!(registry.contains(&id));
        assert!(registry.is_live(&id));

        registry.end(&id);
        registry.remove(&id);
        assert!(!registry.contains(&id));
    }

    #[test]
    fn reregistering_cancels_previous_token() {
        let registry = JobRegistry::new();
        let id = JobId::from("job");
        let first = registry.begin(id.clone());
        let second = registry.begin(id.clone());

        assert!(!first.is_live());
        assert!(second.is_live());
        assert!(registry.is_live(&id));
    }

    #[test]
    fn cancel_all_is_seen_by_concurrent_workers() {
        let registry = Arc::new(JobRegistry::new());
        let token = registry.begin(JobId::generate());

        let worker = std::thread::spawn(move || {
            let mut spins = 0u64;
            while token.is_live() {
                spins += 1;
                std::thread::yield_now();
            }
            spins
        });

        registry.cancel_all();
        worker.join().unwrap();
        assert!(!registry.is_any_live());
    }
}
