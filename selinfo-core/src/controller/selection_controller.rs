//! `src/controller/selection_controller.rs`
//! ============================================================================
//! # SelectionController
//!
//! Turns raw selection events into classified [`Selection`]s and hands the
//! retrievable ones to the [`RetrievalPipeline`]. Repeats of the previous
//! path list are reported as duplicates without touching the pipeline.

use std::{path::PathBuf, sync::Arc};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{
    error::{AppError, AppResult},
    fs::metadata_source::MetadataSource,
    model::selection::{PathState, Paths, Selection, SelectionInfo, SelectionKind},
    pipeline::retrieval::RetrievalPipeline,
};

pub struct SelectionController {
    pipeline: Arc<RetrievalPipeline>,
    source: Arc<dyn MetadataSource>,
    last: Mutex<Option<Vec<String>>>,
}

impl SelectionController {
    #[must_use]
    pub fn new(pipeline: Arc<RetrievalPipeline>, source: Arc<dyn MetadataSource>) -> Self {
        Self {
            pipeline,
            source,
            last: Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn pipeline(&self) -> &Arc<RetrievalPipeline> {
        &self.pipeline
    }

    /// Classify `paths` and retrieve its data.
    pub fn observe(&self, paths: Paths) -> Selection {
        match paths.state {
            PathState::Duplicate => return Selection::bare(SelectionKind::Duplicate),
            PathState::Unavailable => return self.clear(SelectionKind::None),
            PathState::Error => return self.clear(SelectionKind::Error),
            PathState::Available => {}
        }

        if paths.paths.is_empty() {
            return self.clear(SelectionKind::None);
        }

        if let Err(e) = self.remember(&paths.paths) {
            debug!(
                marker = "SELECTION",
                operation_type = "duplicate_selection",
                paths = paths.paths.len(),
                error = %e,
                "Selection unchanged"
            );
            return Selection::bare(SelectionKind::Duplicate);
        }

        let resolved: Vec<PathBuf> = paths.paths.iter().map(PathBuf::from).collect();
        let Some(info) = self.describe(resolved) else {
            self.pipeline.reset_all();
            return Selection::bare(SelectionKind::Error);
        };

        info!(
            marker = "SELECTION",
            operation_type = "selection_changed",
            selection_id = %info.id,
            kind = %info.kind,
            paths = info.paths.len(),
            "New selection"
        );

        let data = self.pipeline.retrieve(&info);
        Selection {
            kind: info.kind,
            info: Some(info),
            data,
        }
    }

    /// Record `paths` as the latest selection. Fails with
    /// `DuplicateSelection` when it equals the previous one.
    fn remember(&self, paths: &[String]) -> AppResult<()> {
        let mut last = self.last.lock();
        if last.as_deref() == Some(paths) {
            return Err(AppError::DuplicateSelection);
        }
        *last = Some(paths.to_vec());
        Ok(())
    }

    /// Forget the remembered selection and cancel outstanding work.
    fn clear(&self, kind: SelectionKind) -> Selection {
        *self.last.lock() = None;
        self.pipeline.reset_all();
        Selection::bare(kind)
    }

    fn describe(&self, paths: Vec<PathBuf>) -> Option<SelectionInfo> {
        if paths.len() > 1 {
            return Some(SelectionInfo::new(paths, SelectionKind::Multi));
        }

        let path = paths.first()?;
        let kind = match self.source.classify_path(path) {
            Ok(kind) => kind,
            Err(e) => {
                warn!(
                    marker = "SELECTION",
                    operation_type = "classify_failed",
                    path = %path.display(),
                    error = %e,
                    "Selected item is not accessible"
                );
                return None;
            }
        };

        let (cloud, hidden) = self
            .source
            .resource_facts(path)
            .map(|facts| (Some(facts.is_cloud_sync_file), Some(facts.is_hidden)))
            .unwrap_or((None, None));

        Some(SelectionInfo::new(paths, kind).with_flags(cloud, hidden))
    }
}

impl std::fmt::Debug for SelectionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionController")
            .field("last", &*self.last.lock())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        fs::metadata_source::testing::ScriptedSource,
        model::{selection_data::FieldKey, settings::FieldSettings},
        pipeline::display::ChannelSink,
    };
    use std::{fs, time::Duration};
    use tempfile::TempDir;
    use tokio::runtime::Runtime;

    fn setup() -> (Runtime, SelectionController, Arc<ScriptedSource>) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let mut config = Config::default();
        config.pipeline.main_poll_window = Duration::from_secs(5);

        let source = Arc::new(ScriptedSource::new());
        let (sink, _rx) = ChannelSink::new();
        let pipeline = Arc::new(RetrievalPipeline::new(
            runtime.handle().clone(),
            &config,
            Arc::clone(&source) as Arc<dyn MetadataSource>,
            Arc::new(FieldSettings::new()),
            Arc::new(sink),
        ));
        let controller =
            SelectionController::new(pipeline, Arc::clone(&source) as Arc<dyn MetadataSource>);
        (runtime, controller, source)
    }

    fn path_str(path: &std::path::Path) -> String {
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn repeated_selection_is_a_duplicate_without_work() {
        let (_rt, controller, source) = setup();
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, b"abc").unwrap();

        let first = controller.observe(Paths::available([path_str(&file)]));
        assert_eq!(first.kind, SelectionKind::Single);
        assert!(first.data.is_some());

        let calls = source.calls();
        let second = controller.observe(Paths::available([path_str(&file)]));

        assert_eq!(second.kind, SelectionKind::Duplicate);
        assert!(second.info.is_none());
        assert!(second.data.is_none());
        assert_eq!(source.calls(), calls);
    }

    #[test]
    fn remembering_the_same_paths_twice_is_rejected() {
        let (_rt, controller, _) = setup();
        let paths = vec!["/a".to_owned(), "/b".to_owned()];

        assert!(controller.remember(&paths).is_ok());
        assert!(matches!(
            controller.remember(&paths),
            Err(AppError::DuplicateSelection)
        ));
        assert!(controller.remember(&paths[..1]).is_ok());
    }

    #[test]
    fn several_paths_form_a_multi_selection() {
        let (_rt, controller, _) = setup();
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::write(&a, b"1").unwrap();
        fs::write(&b, b"2").unwrap();

        let selection = controller.observe(Paths::available([path_str(&a), path_str(&b)]));

        assert_eq!(selection.kind, SelectionKind::Multi);
        assert_eq!(
            selection.data.unwrap().get(FieldKey::Items),
            Some("2 items")
        );
    }

    #[test]
    fn inaccessible_path_is_an_error() {
        let (_rt, controller, _) = setup();
        let dir = TempDir::new().unwrap();

        let selection = controller.observe(Paths::available([path_str(&dir.path().join("gone"))]));

        assert_eq!(selection.kind, SelectionKind::Error);
        assert!(selection.data.is_none());
    }

    #[test]
    fn cleared_selection_resets_the_pipeline() {
        let (_rt, controller, _) = setup();
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("f"), b"x").unwrap();

        let selection = controller.observe(Paths::available([path_str(dir.path())]));
        assert_eq!(selection.kind, SelectionKind::Directory);

        let cleared = controller.observe(Paths::with_state(PathState::Unavailable));
        assert_eq!(cleared.kind, SelectionKind::None);
        assert!(!controller.pipeline().registry().is_any_live());

        // The same path is no longer a duplicate once the selection was cleared.
        let again = controller.observe(Paths::available([path_str(dir.path())]));
        assert_eq!(again.kind, SelectionKind::Directory);
    }

    #[test]
    fn source_states_map_to_terminal_kinds() {
        let (_rt, controller, _) = setup();

        assert_eq!(
            controller.observe(Paths::with_state(PathState::Error)).kind,
            SelectionKind::Error
        );
        assert_eq!(
            controller.observe(Paths::with_state(PathState::Duplicate)).kind,
            SelectionKind::Duplicate
        );
        assert_eq!(
            controller.observe(Paths::available(Vec::<String>::new())).kind,
            SelectionKind::None
        );
    }

    #[cfg(unix)]
    #[test]
    fn hidden_flag_comes_from_resource_facts() {
        let (_rt, controller, _) = setup();
        let dir = TempDir::new().unwrap();
        let hidden = dir.path().join(".secret");
        fs::write(&hidden, b"x").unwrap();

        let selection = controller.observe(Paths::available([path_str(&hidden)]));

        assert_eq!(selection.info.unwrap().is_hidden, Some(true));
    }
}
