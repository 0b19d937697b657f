//! `src/pipeline/display.rs`
//! ============================================================================
//! Boundary to whatever renders selection data, plus the serialized display
//! context that every update passes through.
//!
//! [`Presenter`] owns the currently shown data behind one mutex. `retrieve`
//! holds it for its whole run and late job deliveries take it before
//! touching the sink, so a result the caller already folded in is never
//! delivered a second time.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace};

use crate::{
    cache::fast_result::FastResultCache,
    model::{
        job_registry::{JobId, JobRegistry},
        selection::{SelectionId, SelectionInfo, SelectionKind},
        selection_data::SelectionData,
        settings::SettingsFilter,
    },
};

/// Receives fully merged, settings-filtered data. Must not block.
pub trait DisplaySink: Send + Sync {
    fn deliver(&self, data: SelectionData, info: &SelectionInfo);
}

/// One update pushed to a [`ChannelSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub selection_id: SelectionId,
    pub kind: SelectionKind,
    pub data: SelectionData,
}

/// Forwards deliveries over an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<Delivery>,
}

impl ChannelSink {
    #[must_use]
    pub fn new() -> (Self, UnboundedReceiver<Delivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl DisplaySink for ChannelSink {
    fn deliver(&self, data: SelectionData, info: &SelectionInfo) {
        let delivery = Delivery {
            selection_id: info.id.clone(),
            kind: info.kind,
            data,
        };
        if self.tx.send(delivery).is_err() {
            debug!(
                marker = "DISPLAY",
                operation_type = "sink_closed",
                selection_id = %info.id,
                "Display receiver dropped"
            );
        }
    }
}

/// What the display currently shows.
#[derive(Debug, Clone, Default)]
pub struct DisplayState {
    pub selection: Option<SelectionId>,
    pub data: SelectionData,
}

/// Serialized display context.
pub struct Presenter {
    state: Mutex<DisplayState>,
    sink: Arc<dyn DisplaySink>,
    settings: Arc<dyn SettingsFilter>,
}

impl Presenter {
    #[must_use]
    pub fn new(sink: Arc<dyn DisplaySink>, settings: Arc<dyn SettingsFilter>) -> Self {
        Self {
            state: Mutex::new(DisplayState::default()),
            sink,
            settings,
        }
    }

    /// Enter the display context.
    pub fn lock(&self) -> MutexGuard<'_, DisplayState> {
        self.state.lock()
    }

    #[must_use]
    pub fn settings(&self) -> &dyn SettingsFilter {
        self.settings.as_ref()
    }

    /// Snapshot of the shown data.
    #[cfg(test)]
    #[must_use]
    pub fn current(&self) -> DisplayState {
        self.state.lock().clone()
    }

    /// Push a late job result to the sink if `job` is still live.
    ///
    /// The job is finished and removed either way. Returns whether the sink
    /// was called.
    pub fn deliver_late(
        &self,
        info: &SelectionInfo,
        job: &JobId,
        result: &SelectionData,
        registry: &JobRegistry,
        fast: &FastResultCache,
    ) -> bool {
        let mut state = self.state.lock();

        if !registry.is_live(job) {
            // A cancel can land between the runner's check and its update.
            let _ = fast.take_if_present(job);
            registry.cleanup(job);
            trace!(
                marker = "DISPLAY",
                operation_type = "stale_delivery_dropped",
                job_id = %job,
                "Job no longer live, update dropped"
            );
            return false;
        }

        // Finished: drop the parked copy and the registry entry.
        let _ = fast.take_if_present(job);
        registry.cleanup(job);

        let base = if state.selection.as_ref() == Some(&info.id) {
            state.data.clone()
        } else {
            SelectionData::new()
        };
        let merged = self.settings.filter(base.merge(result), info.kind);

        state.selection = Some(info.id.clone());
        state.data = merged.clone();
        drop(state);

        self.sink.deliver(merged, info);

        debug!(
            marker = "DISPLAY",
            operation_type = "late_delivery",
            job_id = %job,
            selection_id = %info.id,
            "Delivered update"
        );
        true
    }
}

impl std::fmt::Debug for Presenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Presenter")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        selection_data::FieldKey,
        settings::FieldSettings,
    };
    use std::path::PathBuf;

    fn setup() -> (Presenter, UnboundedReceiver<Delivery>, Arc<JobRegistry>, FastResultCache) {
        let (sink, rx) = ChannelSink::new();
        let presenter = Presenter::new(Arc::new(sink), Arc::new(FieldSettings::new()));
        let registry = Arc::new(JobRegistry::new());
        let fast = FastResultCache::new(Arc::clone(&registry));
        (presenter, rx, registry, fast)
    }

    #[test]
    fn late_delivery_merges_over_current_data() {
        let (presenter, mut rx, registry, fast) = setup();
        let info = SelectionInfo::new(vec![PathBuf::from("/d")], SelectionKind::Directory);
        {
            let mut state = presenter.lock();
            state.selection = Some(info.id.clone());
            state.data = SelectionData::new().with(FieldKey::Name, "d");
        }
        registry.begin(info.size_job.clone());

        let result = SelectionData::new().with(FieldKey::Size, "4.1 kB");
        assert!(presenter.deliver_late(&info, &info.size_job, &result, &registry, &fast));

        let delivery = rx.try_recv().unwrap();
        assert_eq!(delivery.selection_id, info.id);
        assert_eq!(delivery.data.get(FieldKey::Name), Some("d"));
        assert_eq!(delivery.data.get(FieldKey::Size), Some("4.1 kB"));
        assert!(!registry.contains(&info.size_job));
        assert_eq!(presenter.current().data, delivery.data);
    }

    #[test]
    fn stale_jobs_never_reach_the_sink() {
        let (presenter, mut rx, registry, fast) = setup();
        let info = SelectionInfo::new(vec![PathBuf::from("/d")], SelectionKind::Directory);
        registry.begin(info.main_job.clone());
        registry.cancel_all();

        let delivered = presenter.deliver_late(
            &info,
            &info.main_job,
            &SelectionData::new().with(FieldKey::Items, "2 items"),
            &registry,
            &fast,
        );

        assert!(!delivered);
        assert!(rx.try_recv().is_err());
        assert!(!registry.contains(&info.main_job));
    }

    #[test]
    fn stale_delivery_discards_its_parked_result() {
        let (presenter, mut rx, registry, fast) = setup();
        let info = SelectionInfo::new(vec![PathBuf::from("/d")], SelectionKind::Directory);
        registry.begin(info.size_job.clone());
        registry.cancel_all();
        let stale = SelectionData::new().with(FieldKey::Size, "1 kB");
        fast.update(&info.size_job, stale.clone());

        assert!(!presenter.deliver_late(&info, &info.size_job, &stale, &registry, &fast));
        assert!(fast.is_empty());
        assert!(rx.try_recv().is_err());
    }
}
