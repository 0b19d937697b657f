//! src/error.rs
//! ============================================================================
//! # `AppError`: Unified Error Type for Selection Retrieval
//!
//! Every fallible operation in the crate returns `AppResult<T>`. Only the
//! classification step may surface an error to the caller of `retrieve`; the
//! background jobs degrade their field to "unresolved" instead.

use std::{io, path::PathBuf};
use thiserror::Error;

/// Convenient alias carrying the unified error type.
pub type AppResult<T> = Result<T, AppError>;

/// Unified error type for all selection retrieval operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// Path is missing or the process lacks permission to read it.
    #[error("Path not accessible: {path:?}: {source}")]
    NotAccessible {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Standard IO error, auto-converted from `io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error retrieving file or directory metadata.
    #[error("Filesystem metadata error on {path:?}: {source}")]
    FsMetadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Enumeration failure part way through a directory size walk.
    #[error("Directory walk failed under {path:?}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// The owning job was superseded before the work finished.
    #[error("Job was cancelled")]
    Cancelled,

    /// Selection is identical to the one immediately before it.
    #[error("Selection unchanged since last observation")]
    DuplicateSelection,

    /// TOML config parsing error.
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// TOML config serialization error.
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Config file I/O error with path.
    #[error("Failed to access config file {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Any other error, with description.
    #[error("Unexpected error: {0}")]
    Other(String),
}

impl AppError {
    /// Wrap an IO error raised while classifying or opening `path`.
    pub fn not_accessible<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        Self::NotAccessible {
            path: path.into(),
            source,
        }
    }

    /// Wrap an IO error raised while reading metadata for `path`.
    pub fn fs_metadata<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        Self::FsMetadata {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

// Allow conversion from `anyhow::Error` as fallback.
impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        Self::Other(e.to_string())
    }
}
