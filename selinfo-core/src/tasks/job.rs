//! `src/tasks/job.rs`
//! ============================================================================
//! # Background Job Runner
//!
//! Runs one unit of blocking work for a selection and routes its result:
//! - cancelled or empty results only clean up their registry entry
//! - results that took longer than the slow threshold are held back for the
//!   late-delivery delay so a value does not flash right after appearing
//! - otherwise the result is parked in the fast cache for the caller's poll
//!   and pushed to the display through the [`Presenter`]

use std::{sync::Arc, time::Instant};

use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{Instrument, debug, info_span, warn};

use crate::{
    cache::fast_result::FastResultCache,
    config::PipelineConfig,
    model::{
        job_registry::{JobRegistry, JobToken},
        selection::SelectionInfo,
        selection_data::SelectionData,
    },
    pipeline::display::Presenter,
};

/// Which half of the selection a job computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Main,
    Size,
}

impl JobKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Size => "size",
        }
    }
}

/// Shared handles every job needs.
#[derive(Clone)]
pub struct JobEnv {
    pub registry: Arc<JobRegistry>,
    pub fast: Arc<FastResultCache>,
    pub presenter: Arc<Presenter>,
    pub config: PipelineConfig,
}

/// Spawn `work` on the blocking pool of `runtime` under `token`.
///
/// `work` returns `None` when it has nothing to report (failure or
/// cancellation). The returned handle resolves once the result has been
/// delivered or dropped.
pub fn spawn_job<F>(
    runtime: &Handle,
    env: JobEnv,
    info: Arc<SelectionInfo>,
    token: JobToken,
    kind: JobKind,
    work: F,
) -> JoinHandle<()>
where
    F: FnOnce(&JobToken) -> Option<SelectionData> + Send + 'static,
{
    let span = info_span!(
        "selection_job",
        job = kind.as_str(),
        job_id = %token.id(),
        selection_id = %info.id,
    );

    runtime.spawn(
        async move {
            let started = Instant::now();
            let id = token.id().clone();

            let worker_token = token.clone();
            let outcome = tokio::task::spawn_blocking(move || work(&worker_token)).await;

            let result = match outcome {
                Ok(Some(data)) => data,
                Ok(None) => {
                    env.registry.cleanup(&id);
                    debug!(
                        marker = "JOB",
                        operation_type = "job_empty",
                        elapsed_ms = started.elapsed().as_millis(),
                        "Job produced no result"
                    );
                    return;
                }
                Err(e) => {
                    env.registry.cleanup(&id);
                    warn!(
                        marker = "JOB",
                        operation_type = "job_panicked",
                        error = %e,
                        "Job worker failed"
                    );
                    return;
                }
            };

            if !token.is_live() {
                env.registry.remove(&id);
                debug!(
                    marker = "JOB",
                    operation_type = "job_superseded",
                    elapsed_ms = started.elapsed().as_millis(),
                    "Job finished after cancellation"
                );
                return;
            }

            let elapsed = started.elapsed();
            if elapsed > env.config.slow_job_threshold {
                debug!(
                    marker = "JOB",
                    operation_type = "job_delayed",
                    elapsed_ms = elapsed.as_millis(),
                    delay_ms = env.config.late_delivery_delay.as_millis(),
                    "Slow job, postponing delivery"
                );
                tokio::time::sleep(env.config.late_delivery_delay).await;

                if !token.is_live() {
                    env.registry.remove(&id);
                    debug!(
                        marker = "JOB",
                        operation_type = "job_superseded",
                        elapsed_ms = started.elapsed().as_millis(),
                        "Job cancelled during delivery delay"
                    );
                    return;
                }
            }

            env.fast.update(&id, result.clone());

            let JobEnv {
                registry,
                fast,
                presenter,
                ..
            } = env;
            let delivered = tokio::task::spawn_blocking(move || {
                presenter.deliver_late(&info, &id, &result, &registry, &fast)
            })
            .await
            .unwrap_or(false);

            debug!(
                marker = "JOB",
                operation_type = "job_finished",
                elapsed_ms = started.elapsed().as_millis(),
                delivered,
                "Job finished"
            );
        }
        .instrument(span),
    )
}

impl std::fmt::Debug for JobEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobEnv")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
