//! `src/model/selection.rs`
//! ============================================================================
//! Selection identity and classification.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use compact_str::CompactString;

use crate::model::{job_registry::JobId, selection_data::SelectionData};

/// Generalised selection type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionKind {
    None,
    Error,
    Duplicate,
    Single,
    Multi,
    Directory,
    Application,
    Volume,
    Image,
    Movie,
    Audio,
}

impl SelectionKind {
    /// Kinds whose size needs a recursive walk.
    #[must_use]
    pub const fn is_directory_like(self) -> bool {
        matches!(self, Self::Directory | Self::Application)
    }

    /// Kinds that carry no retrievable data.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::None | Self::Error | Self::Duplicate)
    }
}

impl fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Error => "error",
            Self::Duplicate => "duplicate",
            Self::Single => "single",
            Self::Multi => "multi",
            Self::Directory => "directory",
            Self::Application => "application",
            Self::Volume => "volume",
            Self::Image => "image",
            Self::Movie => "movie",
            Self::Audio => "audio",
        };
        f.write_str(s)
    }
}

/// Opaque per-selection identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectionId(CompactString);

impl SelectionId {
    #[must_use]
    pub fn generate() -> Self {
        Self(CompactString::new(nanoid::nanoid!()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SelectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State reported by the external selection source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathState {
    Available,
    Unavailable,
    Duplicate,
    Error,
}

/// Raw selection as handed over by the selection source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub paths: Vec<String>,
    pub state: PathState,
}

impl Paths {
    #[must_use]
    pub fn available<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            state: PathState::Available,
        }
    }

    #[must_use]
    pub const fn with_state(state: PathState) -> Self {
        Self {
            paths: Vec::new(),
            state,
        }
    }
}

/// Immutable context for one selection.
///
/// Both job ids are generated fresh with the selection; they are never
/// reused across selections.
#[derive(Debug, Clone)]
pub struct SelectionInfo {
    pub paths: Arc<[PathBuf]>,
    pub kind: SelectionKind,
    pub id: SelectionId,
    pub main_job: JobId,
    pub size_job: JobId,
    pub is_cloud_sync_file: Option<bool>,
    pub is_hidden: Option<bool>,
}

impl SelectionInfo {
    #[must_use]
    pub fn new(paths: Vec<PathBuf>, kind: SelectionKind) -> Self {
        Self {
            paths: paths.into(),
            kind,
            id: SelectionId::generate(),
            main_job: JobId::generate(),
            size_job: JobId::generate(),
            is_cloud_sync_file: None,
            is_hidden: None,
        }
    }

    #[must_use]
    pub const fn with_flags(mut self, is_cloud_sync_file: Option<bool>, is_hidden: Option<bool>) -> Self {
        self.is_cloud_sync_file = is_cloud_sync_file;
        self.is_hidden = is_hidden;
        self
    }

    /// The first (for single selections, the only) path.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.paths.first().map(PathBuf::as_path)
    }
}

/// Result of observing one selection event.
#[derive(Debug, Clone)]
pub struct Selection {
    pub kind: SelectionKind,
    pub info: Option<SelectionInfo>,
    pub data: Option<SelectionData>,
}

impl Selection {
    #[must_use]
    pub const fn bare(kind: SelectionKind) -> Self {
        Self {
            kind,
            info: None,
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_info_gets_fresh_job_ids() {
        let a = SelectionInfo::new(vec![PathBuf::from("/a")], SelectionKind::Single);
        let b = SelectionInfo::new(vec![PathBuf::from("/a")], SelectionKind::Single);

        assert_ne!(a.main_job, a.size_job);
        assert_ne!(a.main_job, b.main_job);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn directory_like_kinds() {
        assert!(SelectionKind::Directory.is_directory_like());
        assert!(SelectionKind::Application.is_directory_like());
        assert!(!SelectionKind::Multi.is_directory_like());
        assert!(SelectionKind::Duplicate.is_terminal());
    }
}
