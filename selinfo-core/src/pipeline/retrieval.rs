//! `src/pipeline/retrieval.rs`
//! ============================================================================
//! # RetrievalPipeline: one selection in, one coherent snapshot out
//!
//! `retrieve` supersedes all prior work, computes the cheap fields on the
//! caller's thread, launches the main and size jobs, and gives each a short
//! bounded window to finish so fast results land in the first update.
//! Anything slower reaches the [`DisplaySink`] later through the job runner.
//!
//! `retrieve` blocks. Call it from outside the runtime whose handle the
//! pipeline owns.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use arc_swap::ArcSwapOption;
use compact_str::CompactString;
use tokio::runtime::Handle;
use tracing::{debug, info, instrument};

use crate::{
    cache::{fast_result::FastResultCache, size_cache::SizeCache},
    config::{Config, PipelineConfig},
    fs::metadata_source::MetadataSource,
    model::{
        job_registry::JobRegistry,
        selection::{SelectionId, SelectionInfo, SelectionKind},
        selection_data::{FieldKey, SelectionData},
        settings::SettingsFilter,
    },
    pipeline::display::{DisplaySink, Presenter},
    tasks::{
        job::{JobEnv, JobKind, spawn_job},
        metadata_task,
        size_task::{self, QuickSize},
    },
    util::humanize::human_readable_size,
};

/// Selection currently being retrieved and when it started.
#[derive(Debug)]
struct ActiveSelection {
    id: SelectionId,
    started: Instant,
}

pub struct RetrievalPipeline {
    runtime: Handle,
    env: JobEnv,
    sizes: SizeCache,
    source: Arc<dyn MetadataSource>,
    active: ArcSwapOption<ActiveSelection>,
}

impl RetrievalPipeline {
    /// Background jobs run on `runtime`.
    #[must_use]
    pub fn new(
        runtime: Handle,
        config: &Config,
        source: Arc<dyn MetadataSource>,
        settings: Arc<dyn SettingsFilter>,
        sink: Arc<dyn DisplaySink>,
    ) -> Self {
        let registry = Arc::new(JobRegistry::new());
        let fast = Arc::new(FastResultCache::new(Arc::clone(&registry)));
        let presenter = Arc::new(Presenter::new(sink, settings));

        Self {
            runtime,
            env: JobEnv {
                registry,
                fast,
                presenter,
                config: config.pipeline.clone(),
            },
            sizes: SizeCache::with_config(config.cache.clone(), Arc::clone(&source)),
            source,
            active: ArcSwapOption::empty(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.env.config
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<JobRegistry> {
        &self.env.registry
    }

    #[must_use]
    pub const fn size_cache(&self) -> &SizeCache {
        &self.sizes
    }

    #[must_use]
    pub const fn presenter(&self) -> &Arc<Presenter> {
        &self.env.presenter
    }

    /// Merged, settings-filtered data for `info`, or `None` for kinds that
    /// carry no data and for an info without paths.
    #[instrument(skip_all, fields(selection_id = %info.id, kind = %info.kind, paths = info.paths.len()))]
    pub fn retrieve(&self, info: &SelectionInfo) -> Option<SelectionData> {
        if info.kind.is_terminal() || info.paths.is_empty() {
            return None;
        }

        let info = Arc::new(info.clone());
        let mut display = self.env.presenter.lock();

        self.reset_all();
        self.active.store(Some(Arc::new(ActiveSelection {
            id: info.id.clone(),
            started: Instant::now(),
        })));
        display.selection = Some(info.id.clone());
        display.data = SelectionData::new();

        let baseline = metadata_task::sync_fields(&info, self.source.as_ref());
        self.launch_main(&info, baseline.clone());

        let mut data = match self
            .env
            .fast
            .wait_take(&info.main_job, self.env.config.main_poll_window)
        {
            Some(caught) => {
                debug!(
                    marker = "PIPELINE",
                    operation_type = "main_caught",
                    "Main job finished inside poll window"
                );
                caught
            }
            None => baseline,
        };

        if let Some(size) = self.resolve_size(&info) {
            data.set(FieldKey::Size, Some(size));
        }

        let filtered = self.env.presenter.settings().filter(data, info.kind);
        display.data = filtered.clone();

        info!(
            marker = "PIPELINE",
            operation_type = "retrieve_complete",
            fields = filtered.len(),
            "Selection retrieved"
        );
        Some(filtered)
    }

    /// True while any job of the active selection `id` is still running.
    #[must_use]
    pub fn is_loading(&self, id: &SelectionId) -> bool {
        let active = self.active.load();
        let is_active = matches!(&*active, Some(current) if current.id == *id);
        is_active && self.env.registry.is_any_live()
    }

    /// Like [`is_loading`](Self::is_loading), but only once the selection has
    /// been loading for longer than the configured loader delay.
    #[must_use]
    pub fn show_loader(&self, id: &SelectionId) -> bool {
        let active = self.active.load();
        let Some(current) = &*active else {
            return false;
        };
        current.id == *id
            && current.started.elapsed() >= self.env.config.loader_delay
            && self.env.registry.is_any_live()
    }

    /// Cancel every outstanding job and drop parked results. Cached sizes
    /// survive.
    pub fn reset_all(&self) {
        self.env.fast.clear_all();
        self.env.registry.cancel_all();
        self.active.store(None);

        debug!(
            marker = "PIPELINE",
            operation_type = "reset_all",
            "All jobs cancelled"
        );
    }

    fn launch_main(&self, info: &Arc<SelectionInfo>, baseline: SelectionData) {
        let token = self.env.registry.begin(info.main_job.clone());
        let source = Arc::clone(&self.source);
        let job_info = Arc::clone(info);

        spawn_job(
            &self.runtime,
            self.env.clone(),
            Arc::clone(info),
            token,
            JobKind::Main,
            move |_| {
                metadata_task::display_data(&job_info, source.as_ref())
                    .map(|full| baseline.merge(&full))
            },
        );
    }

    /// Size from the cache or plain stats when possible; otherwise start the
    /// size job and give it a short window.
    fn resolve_size(&self, info: &Arc<SelectionInfo>) -> Option<CompactString> {
        if info.kind == SelectionKind::Volume
            || !self.env.presenter.settings().size_enabled(info.kind)
        {
            return None;
        }

        match size_task::quick_sizes(&info.paths, &self.sizes) {
            QuickSize::Resolved(bytes) => Some(human_readable_size(bytes)),
            QuickSize::Unavailable => None,
            QuickSize::NeedsWalk => {
                self.launch_size(info);

                let window = if info.kind.is_directory_like() {
                    self.env.config.size_poll_window
                } else {
                    Duration::ZERO
                };

                self.env
                    .fast
                    .wait_take(&info.size_job, window)
                    .and_then(|mut sized| sized.remove(FieldKey::Size))
            }
        }
    }

    fn launch_size(&self, info: &Arc<SelectionInfo>) {
        let token = self.env.registry.begin(info.size_job.clone());
        let sizes = self.sizes.clone();
        let job_info = Arc::clone(info);

        spawn_job(
            &self.runtime,
            self.env.clone(),
            Arc::clone(info),
            token,
            JobKind::Size,
            move |token| match size_task::selection_size(&job_info.paths, &sizes, token) {
                Ok(bytes) => Some(size_task::size_field(bytes)),
                Err(e) => {
                    debug!(
                        marker = "SIZE_TASK",
                        operation_type = "size_unresolved",
                        cancelled = e.is_cancelled(),
                        error = %e,
                        "Size left unresolved"
                    );
                    None
                }
            },
        );
    }

    /// Log size cache counters.
    pub fn log_stats(&self) {
        self.sizes.log_stats();
    }
}

impl std::fmt::Debug for RetrievalPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalPipeline")
            .field("env", &self.env)
            .field("sizes", &self.sizes)
            .finish_non_exhaustive()
    }
}
