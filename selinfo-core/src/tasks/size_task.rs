//! `src/tasks/size_task.rs`
//! ============================================================================
//! Selection size: cache lookup, cancellable recursive walk, multi-item sum.
//!
//! The walk checks its [`JobToken`] on every visited entry, so a superseded
//! selection stops after at most one more directory-enumeration step.

use std::{
    fs::Metadata,
    path::{Path, PathBuf},
    time::Instant,
};

use tracing::{debug, instrument, trace};
use walkdir::{DirEntry, WalkDir};

use crate::{
    cache::size_cache::SizeCache,
    error::{AppError, AppResult},
    model::{
        job_registry::JobToken,
        selection_data::{FieldKey, SelectionData},
    },
    util::humanize::human_readable_size,
};

/// Outcome of the synchronous size lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickSize {
    /// Every path resolved from the cache or a single stat.
    Resolved(u64),
    /// At least one uncached directory; needs the background walk.
    NeedsWalk,
    /// A path could not be read.
    Unavailable,
}

/// Resolve what can be had without recursion: cache hits and plain files.
pub fn quick_sizes(paths: &[PathBuf], cache: &SizeCache) -> QuickSize {
    let mut total = 0u64;

    for path in paths {
        if let Some(bytes) = cache.get(path) {
            total = total.saturating_add(bytes);
            continue;
        }

        match std::fs::metadata(path) {
            Ok(meta) if meta.is_dir() => return QuickSize::NeedsWalk,
            Ok(meta) => total = total.saturating_add(meta.len()),
            Err(e) => {
                debug!(
                    marker = "SIZE_TASK",
                    operation_type = "quick_size_failed",
                    path = %path.display(),
                    error = %e,
                    "Quick size could not stat path"
                );
                return QuickSize::Unavailable;
            }
        }
    }

    QuickSize::Resolved(total)
}

/// On-disk footprint of one file.
#[cfg(unix)]
#[must_use]
pub fn allocated_size(meta: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;

    match meta.blocks() {
        0 => meta.len(),
        blocks => blocks.saturating_mul(512),
    }
}

#[cfg(not(unix))]
#[must_use]
pub fn allocated_size(meta: &Metadata) -> u64 {
    meta.len()
}

/// Sum of the allocated sizes of all regular files below `root`.
///
/// Fails with `Cancelled` as soon as `token` is no longer live and with
/// `Walk` on the first enumeration error. No partial sum is ever returned.
#[instrument(level = "debug", skip(token), fields(job_id = %token.id()))]
pub fn directory_size(root: &Path, token: &JobToken) -> AppResult<u64> {
    walk_size(root, WalkDir::new(root).min_depth(1), token)
}

fn walk_size<I>(root: &Path, entries: I, token: &JobToken) -> AppResult<u64>
where
    I: IntoIterator<Item = walkdir::Result<DirEntry>>,
{
    let started = Instant::now();
    let mut total = 0u64;
    let mut files = 0u64;

    for entry in entries {
        token.check()?;

        let entry = entry.map_err(|source| AppError::Walk {
            path: root.to_path_buf(),
            source,
        })?;

        if entry.file_type().is_file() {
            let meta = entry.metadata().map_err(|source| AppError::Walk {
                path: root.to_path_buf(),
                source,
            })?;
            total = total.saturating_add(allocated_size(&meta));
            files += 1;
        }
    }

    debug!(
        marker = "SIZE_TASK",
        operation_type = "directory_walk",
        path = %root.display(),
        bytes = total,
        files,
        elapsed_ms = started.elapsed().as_millis(),
        "Directory walk completed"
    );

    Ok(total)
}

/// Total size of every path in the selection.
///
/// Cached entries are reused; directories are walked and stored back into
/// `cache` on success. Any failure or cancellation aborts the whole sum.
pub fn selection_size(paths: &[PathBuf], cache: &SizeCache, token: &JobToken) -> AppResult<u64> {
    sum_selection(paths, cache, token, directory_size)
}

fn sum_selection<W>(paths: &[PathBuf], cache: &SizeCache, token: &JobToken, walk: W) -> AppResult<u64>
where
    W: Fn(&Path, &JobToken) -> AppResult<u64>,
{
    let mut total = 0u64;

    for path in paths {
        token.check()?;

        if let Some(bytes) = cache.get(path) {
            total = total.saturating_add(bytes);
            continue;
        }

        let meta = std::fs::metadata(path).map_err(|e| AppError::fs_metadata(path, e))?;
        let bytes = if meta.is_dir() {
            let bytes = walk(path, token)?;
            cache.store(path, bytes);
            bytes
        } else {
            meta.len()
        };

        trace!(
            marker = "SIZE_TASK",
            operation_type = "item_sized",
            path = %path.display(),
            bytes,
        );
        total = total.saturating_add(bytes);
    }

    Ok(total)
}

/// Size as a display field.
#[must_use]
pub fn size_field(bytes: u64) -> SelectionData {
    SelectionData::new().with(FieldKey::Size, human_readable_size(bytes))
}
