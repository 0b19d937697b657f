//! src/main.rs
//! `selinfo <path>...`: print the info-panel fields for one selection.

use std::{env, sync::Arc, time::Duration};

use anyhow::{Context, Result, bail};
use tokio::{runtime::Runtime, sync::mpsc::UnboundedReceiver};
use tracing::{info, warn};

use selinfo_core::{
    Config, Logger, LoggerBuilder,
    controller::SelectionController,
    fs::{FsMetadataSource, MetadataSource},
    model::{FieldSettings, Paths, SelectionData, SelectionId, SelectionKind},
    pipeline::{ChannelSink, Delivery, RetrievalPipeline},
};

/// Poll interval while waiting for background jobs to report.
const DELIVERY_POLL: Duration = Duration::from_millis(250);

fn main() -> Result<()> {
    let paths: Vec<String> = env::args().skip(1).collect();
    if paths.is_empty() {
        bail!("usage: selinfo <path>...");
    }

    let config = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build bootstrap runtime")?
        .block_on(Config::load())
        .unwrap_or_else(|e| {
            eprintln!("Failed to load config, using defaults: {e}");
            Config::default()
        });

    let _guard = match LoggerBuilder::new().with_config(config.logging.clone()).build() {
        Ok(guard) => Some(guard),
        Err(e) => {
            Logger::init_tracing();
            warn!("File logging unavailable, logging to stderr: {e:#}");
            None
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.pipeline.worker_threads.max(1))
        .thread_name("selinfo-worker")
        .enable_all()
        .build()
        .context("Failed to build runtime")?;

    let source: Arc<dyn MetadataSource> = Arc::new(FsMetadataSource::new());
    let (sink, rx) = ChannelSink::new();
    let pipeline = Arc::new(RetrievalPipeline::new(
        runtime.handle().clone(),
        &config,
        Arc::clone(&source),
        Arc::new(FieldSettings::new()),
        Arc::new(sink),
    ));
    let controller = SelectionController::new(Arc::clone(&pipeline), source);

    let selection = controller.observe(Paths::available(paths));
    println!("[{}]", selection.kind);

    match (selection.info, selection.data) {
        (Some(info), Some(data)) => {
            print_fields(&data);
            await_late_deliveries(&runtime, &pipeline, &info.id, rx);
        }
        _ if selection.kind == SelectionKind::Error => {
            pipeline.log_stats();
            bail!("selection is not accessible");
        }
        _ => {}
    }

    pipeline.log_stats();
    info!("selinfo exited cleanly");
    Ok(())
}

fn print_fields(data: &SelectionData) {
    for field in data.visible_fields() {
        println!("{:>14}  {}", field.key.label(), field.value);
    }
}

/// Print updates until no job of `id` is running and the channel is quiet.
fn await_late_deliveries(
    runtime: &Runtime,
    pipeline: &RetrievalPipeline,
    id: &SelectionId,
    mut rx: UnboundedReceiver<Delivery>,
) {
    runtime.block_on(async {
        let mut loader_shown = false;
        loop {
            match tokio::time::timeout(DELIVERY_POLL, rx.recv()).await {
                Ok(Some(delivery)) => {
                    println!("[{} update]", delivery.kind);
                    print_fields(&delivery.data);
                }
                Ok(None) => break,
                Err(_) if !pipeline.is_loading(id) => break,
                Err(_) => {
                    if !loader_shown && pipeline.show_loader(id) {
                        println!("(loading…)");
                        loader_shown = true;
                    }
                }
            }
        }
    });
}
