//! `src/cache/fast_result.rs`
//! ============================================================================
//! Handoff slots between background jobs and the synchronous `retrieve` call.
//!
//! A job that finishes inside the caller's poll window parks its result here;
//! the caller picks it up with [`FastResultCache::wait_take`] instead of
//! showing a bare value that is replaced a moment later.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use ahash::RandomState;
use parking_lot::{Condvar, Mutex};
use tracing::trace;

use crate::model::{
    job_registry::{JobId, JobRegistry},
    selection_data::SelectionData,
};

#[derive(Debug)]
pub struct FastResultCache {
    slots: Mutex<HashMap<JobId, SelectionData, RandomState>>,
    ready: Condvar,
    registry: Arc<JobRegistry>,
}

impl FastResultCache {
    /// Taking a slot ends the matching job in `registry`.
    #[must_use]
    pub fn new(registry: Arc<JobRegistry>) -> Self {
        Self {
            slots: Mutex::new(HashMap::with_hasher(RandomState::new())),
            ready: Condvar::new(),
            registry,
        }
    }

    /// Store or overwrite the slot for `id` and wake waiters.
    pub fn update(&self, id: &JobId, data: SelectionData) {
        self.slots.lock().insert(id.clone(), data);
        self.ready.notify_all();

        trace!(
            marker = "FAST_CACHE",
            operation_type = "update",
            job_id = %id,
            "Fast result parked"
        );
    }

    /// Consume the slot for `id`. A hit also ends the job, so the caller
    /// that wins the race owns the bookkeeping.
    pub fn take_if_present(&self, id: &JobId) -> Option<SelectionData> {
        let taken = self.slots.lock().remove(id);
        if taken.is_some() {
            self.registry.end(id);
        }
        taken
    }

    /// Like [`take_if_present`](Self::take_if_present), but waits up to
    /// `timeout` for the slot to be filled.
    pub fn wait_take(&self, id: &JobId, timeout: Duration) -> Option<SelectionData> {
        let deadline = Instant::now() + timeout;
        let mut slots = self.slots.lock();

        let taken = loop {
            if let Some(data) = slots.remove(id) {
                break Some(data);
            }
            if self.ready.wait_until(&mut slots, deadline).timed_out() {
                break slots.remove(id);
            }
        };
        drop(slots);

        if taken.is_some() {
            self.registry.end(id);
        }

        trace!(
            marker = "FAST_CACHE",
            operation_type = "wait_take",
            job_id = %id,
            hit = taken.is_some(),
            "Fast result poll finished"
        );
        taken
    }

    pub fn clear_all(&self) {
        self.slots.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::selection_data::FieldKey;

    fn setup() -> (Arc<JobRegistry>, FastResultCache) {
        let registry = Arc::new(JobRegistry::new());
        let cache = FastResultCache::new(Arc::clone(&registry));
        (registry, cache)
    }

    #[test]
    fn take_on_empty_slot_is_none() {
        let (registry, cache) = setup();
        let id = JobId::generate();
        registry.begin(id.clone());

        assert!(cache.take_if_present(&id).is_none());
        assert!(registry.is_live(&id));
    }

    #[test]
    fn take_consumes_and_ends_job() {
        let (registry, cache) = setup();
        let id = JobId::generate();
        registry.begin(id.clone());
        cache.update(&id, SelectionData::new().with(FieldKey::Size, "1 kB"));

        let taken = cache.take_if_present(&id).unwrap();

        assert_eq!(taken.get(FieldKey::Size), Some("1 kB"));
        assert!(!registry.is_live(&id));
        assert!(cache.take_if_present(&id).is_none());
    }

    #[test]
    fn update_overwrites() {
        let (_registry, cache) = setup();
        let id = JobId::generate();
        cache.update(&id, SelectionData::new().with(FieldKey::Name, "a"));
        cache.update(&id, SelectionData::new().with(FieldKey::Name, "b"));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.take_if_present(&id).unwrap().get(FieldKey::Name), Some("b"));
    }

    #[test]
    fn wait_take_times_out() {
        let (_registry, cache) = setup();
        let started = Instant::now();

        assert!(cache.wait_take(&JobId::generate(), Duration::from_millis(30)).is_none());
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn wait_take_wakes_on_update() {
        let (registry, cache) = setup();
        let cache = Arc::new(cache);
        let id = JobId::generate();
        registry.begin(id.clone());

        let producer = {
            let cache = Arc::clone(&cache);
            let id = id.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                cache.update(&id, SelectionData::new().with(FieldKey::Items, "3 items"));
            })
        };

        let started = Instant::now();
        let taken = cache.wait_take(&id, Duration::from_secs(5));
        producer.join().unwrap();

        assert_eq!(taken.unwrap().get(FieldKey::Items), Some("3 items"));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!registry.is_live(&id));
    }

    #[test]
    fn clear_all_empties() {
        let (_registry, cache) = setup();
        cache.update(&JobId::generate(), SelectionData::new());
        cache.update(&JobId::generate(), SelectionData::new());

        cache.clear_all();

        assert!(cache.is_empty());
    }
}
