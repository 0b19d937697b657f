//! `src/fs/classify.rs`
//! ============================================================
//! Path classification helpers shared by the metadata source and the size
//! cache.

use std::{ffi::OsStr, fs::Metadata, path::Path};

/// Coarse content category derived from the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Image,
    Movie,
    Audio,
    Other,
}

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "heic", "heif", "tif", "tiff", "bmp", "webp", "raw", "cr2",
    "cr3", "nef", "arw", "dng", "orf", "raf", "psd", "avif",
];

const MOVIE_EXTENSIONS: &[&str] = &[
    "mov", "mp4", "m4v", "avi", "mkv", "webm", "mpg", "mpeg", "3gp", "hevc",
];

const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "m4a", "aac", "wav", "aif", "aiff", "flac", "ogg", "opus", "caf", "alac", "wma",
];

#[must_use]
pub fn file_category(path: &Path) -> FileCategory {
    let Some(ext) = path.extension().and_then(OsStr::to_str) else {
        return FileCategory::Other;
    };
    let ext = ext.to_ascii_lowercase();

    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        FileCategory::Image
    } else if MOVIE_EXTENSIONS.contains(&ext.as_str()) {
        FileCategory::Movie
    } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        FileCategory::Audio
    } else {
        FileCategory::Other
    }
}

/// `.app` bundle directory.
#[must_use]
pub fn is_application_bundle(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("app"))
}

/// Undownloaded cloud placeholder (`.name.ext.icloud`).
#[must_use]
pub fn is_cloud_placeholder(path: &Path) -> bool {
    path.file_name()
        .and_then(OsStr::to_str)
        .is_some_and(|name| name.starts_with('.') && name.ends_with(".icloud"))
}

/// Root of a mounted filesystem: `/`, or a directory on a different device
/// than its parent.
#[cfg(unix)]
#[must_use]
pub fn is_mount_point(path: &Path, meta: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;

    let Some(parent) = path.parent() else {
        return true;
    };
    if parent.as_os_str().is_empty() {
        return false;
    }

    std::fs::metadata(parent).is_ok_and(|parent_meta| parent_meta.dev() != meta.dev())
}

#[cfg(not(unix))]
#[must_use]
pub fn is_mount_point(path: &Path, _meta: &Metadata) -> bool {
    path.parent().is_none()
}
