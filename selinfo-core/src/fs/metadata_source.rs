//! `src/fs/metadata_source.rs`
//! ============================================================
//! Facts about a path, as consumed by the retrieval pipeline.
//!
//! [`MetadataSource`] is the seam to the platform: classification, cheap
//! resource facts, and the slower media and volume facts. The pipeline treats
//! every call as blocking and only issues the slow ones from background jobs.
//!
//! [`FsMetadataSource`] is the portable implementation on top of `std::fs`
//! and `sysinfo`. Its media facts cover image dimensions (read from the
//! image header) and application bundle versions (read from
//! `Contents/Info.plist`). Movie and audio facts are left to platform
//! sources.

use std::{
    ffi::OsStr,
    fs::{self, Metadata},
    path::{Component, Path, PathBuf},
    time::{Duration, SystemTime},
};

use compact_str::{CompactString, format_compact};
use smallvec::SmallVec;
use sysinfo::Disks;
use tracing::{debug, trace};

use crate::{
    error::{AppError, AppResult},
    fs::classify::{self, FileCategory},
    model::selection::SelectionKind,
};

/// Cheap per-path facts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceFacts {
    pub path: PathBuf,
    pub name: CompactString,
    pub kind_description: Option<CompactString>,
    pub created: Option<SystemTime>,
    pub modified: Option<SystemTime>,

    /// Byte length, regular files only.
    pub size: Option<u64>,

    pub is_directory: bool,
    pub is_hidden: bool,

    /// The path is a cloud placeholder that has not been downloaded.
    pub is_cloud_sync_file: bool,
    pub cloud_container: Option<CompactString>,
}

/// Image, movie and audio facts. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaFacts {
    pub dimensions: Option<(u32, u32)>,
    pub camera: Option<CompactString>,
    pub focal_length: Option<f64>,
    pub aperture: Option<f64>,
    pub exposure_time: Option<f64>,
    pub iso: Option<u32>,
    pub color_profile: Option<CompactString>,
    pub wide_gamut: Option<bool>,

    pub codecs: SmallVec<[CompactString; 4]>,
    pub duration: Option<Duration>,
    pub sample_rate: Option<f64>,

    /// Per-track estimates in bits per second.
    pub video_bitrate: Option<f64>,
    pub audio_bitrate: Option<f64>,

    /// Container-level total, in kilobits per second.
    pub container_bitrate_kbps: Option<f64>,

    /// Bundle version for applications.
    pub version: Option<CompactString>,
}

/// Capacity of the volume a path lives on, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeFacts {
    pub total: u64,
    pub available: u64,

    /// Space available once purgeable data is reclaimed, when the platform
    /// reports it.
    pub available_for_important_usage: Option<u64>,
}

/// Source of path facts.
pub trait MetadataSource: Send + Sync {
    /// Selection kind of a single path. Fails with `NotAccessible` when the
    /// path cannot be read at all.
    fn classify_path(&self, path: &Path) -> AppResult<SelectionKind>;

    fn resource_facts(&self, path: &Path) -> AppResult<ResourceFacts>;

    /// May be slow. `None` when nothing is known.
    fn media_facts(&self, path: &Path) -> Option<MediaFacts>;

    fn volume_facts(&self, path: &Path) -> Option<VolumeFacts>;

    /// Non-hidden direct children of a directory.
    fn item_count(&self, path: &Path) -> AppResult<usize> {
        let entries = fs::read_dir(path).map_err(|e| AppError::fs_metadata(path, e))?;
        Ok(entries
            .filter_map(Result::ok)
            .filter(|entry| !is_hidden_name(&entry.file_name()))
            .count())
    }
}

/// `std::fs` + `sysinfo` backed source.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsMetadataSource;

impl FsMetadataSource {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl MetadataSource for FsMetadataSource {
    fn classify_path(&self, path: &Path) -> AppResult<SelectionKind> {
        let meta = fs::metadata(path).map_err(|e| AppError::not_accessible(path, e))?;
        Ok(classify_with_meta(path, &meta))
    }

    fn resource_facts(&self, path: &Path) -> AppResult<ResourceFacts> {
        let meta = fs::metadata(path).map_err(|e| AppError::fs_metadata(path, e))?;
        let kind = classify_with_meta(path, &meta);

        let name = CompactString::new(
            path.file_name()
                .and_then(OsStr::to_str)
                .unwrap_or_else(|| path.to_str().unwrap_or("")),
        );
        let is_hidden = path.file_name().is_some_and(is_hidden_name);

        trace!(
            marker = "METADATA",
            operation_type = "resource_facts",
            path = %path.display(),
            kind = %kind,
        );

        Ok(ResourceFacts {
            path: path.to_path_buf(),
            kind_description: Some(kind_description(path, kind)),
            created: meta.created().ok(),
            modified: meta.modified().ok(),
            size: meta.is_file().then(|| meta.len()),
            is_directory: meta.is_dir(),
            is_hidden,
            is_cloud_sync_file: classify::is_cloud_placeholder(path),
            cloud_container: cloud_container(path),
            name,
        })
    }

    fn media_facts(&self, path: &Path) -> Option<MediaFacts> {
        if classify::is_application_bundle(path) {
            return bundle_version(path).map(|version| MediaFacts {
                version: Some(version),
                ..MediaFacts::default()
            });
        }

        match classify::file_category(path) {
            FileCategory::Image => image_dimensions(path).map(|dimensions| MediaFacts {
                dimensions: Some(dimensions),
                ..MediaFacts::default()
            }),
            FileCategory::Movie | FileCategory::Audio | FileCategory::Other => None,
        }
    }

    fn volume_facts(&self, path: &Path) -> Option<VolumeFacts> {
        let disks = Disks::new_with_refreshed_list();

        disks
            .list()
            .iter()
            .filter(|disk| path.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().components().count())
            .map(|disk| VolumeFacts {
                total: disk.total_space(),
                available: disk.available_space(),
                available_for_important_usage: None,
            })
    }
}

fn classify_with_meta(path: &Path, meta: &Metadata) -> SelectionKind {
    if meta.is_dir() {
        if classify::is_mount_point(path, meta) {
            SelectionKind::Volume
        } else if classify::is_application_bundle(path) {
            SelectionKind::Application
        } else {
            SelectionKind::Directory
        }
    } else {
        match classify::file_category(path) {
            FileCategory::Image => SelectionKind::Image,
            FileCategory::Movie => SelectionKind::Movie,
            FileCategory::Audio => SelectionKind::Audio,
            FileCategory::Other => SelectionKind::Single,
        }
    }
}

fn kind_description(path: &Path, kind: SelectionKind) -> CompactString {
    let ext = path
        .extension()
        .and_then(OsStr::to_str)
        .map(str::to_uppercase);

    match (kind, ext) {
        (SelectionKind::Directory, _) => CompactString::const_new("Folder"),
        (SelectionKind::Application, _) => CompactString::const_new("Application"),
        (SelectionKind::Volume, _) => CompactString::const_new("Volume"),
        (SelectionKind::Image, Some(ext)) => format_compact!("{ext} image"),
        (SelectionKind::Movie, Some(ext)) => format_compact!("{ext} movie"),
        (SelectionKind::Audio, Some(ext)) => format_compact!("{ext} audio"),
        (_, Some(ext)) => format_compact!("{ext} file"),
        (_, None) => CompactString::const_new("Document"),
    }
}

/// Display name of the cloud container holding `path`, if any.
fn cloud_container(path: &Path) -> Option<CompactString> {
    let mut components = path.components();
    components.by_ref().find(|c| c.as_os_str() == "Mobile Documents")?;

    let Component::Normal(container) = components.next()? else {
        return None;
    };
    let container = container.to_str()?;

    if container == "com~apple~CloudDocs" {
        return Some(CompactString::const_new("iCloud Drive"));
    }
    container.rsplit('~').next().map(CompactString::new)
}

/// Pixel size from the image header. Formats without a decoder yield `None`.
fn image_dimensions(path: &Path) -> Option<(u32, u32)> {
    match image::image_dimensions(path) {
        Ok(dimensions) => Some(dimensions),
        Err(e) => {
            debug!(
                marker = "METADATA",
                operation_type = "image_dimensions_failed",
                path = %path.display(),
                error = %e,
                "Image header unreadable"
            );
            None
        }
    }
}

/// `CFBundleShortVersionString`, falling back to `CFBundleVersion`.
fn bundle_version(bundle: &Path) -> Option<CompactString> {
    let info_plist = bundle.join("Contents").join("Info.plist");
    let value = match plist::Value::from_file(&info_plist) {
        Ok(value) => value,
        Err(e) => {
            debug!(
                marker = "METADATA",
                operation_type = "bundle_info_failed",
                path = %info_plist.display(),
                error = %e,
                "Bundle Info.plist unreadable"
            );
            return None;
        }
    };

    let info = value.as_dictionary()?;
    ["CFBundleShortVersionString", "CFBundleVersion"]
        .into_iter()
        .filter_map(|key| info.get(key).and_then(plist::Value::as_string))
        .map(str::trim)
        .find(|version| !version.is_empty())
        .map(CompactString::new)
}

fn is_hidden_name(name: &OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

#[cfg(test)]
pub mod testing {
    //! Scriptable source for pipeline tests.

    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Filesystem facts from [`FsMetadataSource`], media and volume facts
    /// from fixed values, and a call counter.
    #[derive(Debug, Default)]
    pub struct ScriptedSource {
        inner: FsMetadataSource,
        pub media: Option<MediaFacts>,
        pub volume: Option<VolumeFacts>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        #[must_use]
        pub fn with_media(mut self, media: MediaFacts) -> Self {
            self.media = Some(media);
            self
        }

        #[must_use]
        pub fn with_volume(mut self, volume: VolumeFacts) -> Self {
            self.volume = Some(volume);
            self
        }

        /// Number of `resource_facts` and `media_facts` calls so far.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    /// `<dir>/<name>/Contents/Info.plist` holding `entries` as its dictionary.
    pub fn write_bundle(dir: &Path, name: &str, entries: &str) -> PathBuf {
        let app = dir.join(name);
        let contents = app.join("Contents");
        fs::create_dir_all(&contents).unwrap();
        fs::write(
            contents.join("Info.plist"),
            format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
                 <!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \
                 \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n\
                 <plist version=\"1.0\"><dict>{entries}</dict></plist>\n"
            ),
        )
        .unwrap();
        app
    }

    impl MetadataSource for ScriptedSource {
        fn classify_path(&self, path: &Path) -> AppResult<SelectionKind> {
            self.inner.classify_path(path)
        }

        fn resource_facts(&self, path: &Path) -> AppResult<ResourceFacts> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.resource_facts(path)
        }

        fn media_facts(&self, _path: &Path) -> Option<MediaFacts> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.media.clone()
        }

        fn volume_facts(&self, _path: &Path) -> Option<VolumeFacts> {
            self.volume
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{testing::write_bundle, *};
    use tempfile::TempDir;

    #[test]
    fn classifies_files_and_directories() {
        let dir = TempDir::new().unwrap();
        let source = FsMetadataSource::new();

        let font = dir.path().join("font.ttf");
        fs::write(&font, b"abc").unwrap();
        let photo = dir.path().join("photo.JPG");
        fs::write(&photo, b"").unwrap();
        let song = dir.path().join("song.flac");
        fs::write(&song, b"").unwrap();
        let app = dir.path().join("Thing.app");
        fs::create_dir(&app).unwrap();

        assert_eq!(source.classify_path(&font).unwrap(), SelectionKind::Single);
        assert_eq!(source.classify_path(&photo).unwrap(), SelectionKind::Image);
        assert_eq!(source.classify_path(&song).unwrap(), SelectionKind::Audio);
        assert_eq!(source.classify_path(&app).unwrap(), SelectionKind::Application);
        assert_eq!(
            source.classify_path(dir.path()).unwrap(),
            SelectionKind::Directory
        );
    }

    #[cfg(unix)]
    #[test]
    fn root_is_a_volume() {
        let source = FsMetadataSource::new();
        assert_eq!(
            source.classify_path(Path::new("/")).unwrap(),
            SelectionKind::Volume
        );
    }

    #[test]
    fn missing_path_is_not_accessible() {
        let dir = TempDir::new().unwrap();
        let err = FsMetadataSource::new()
            .classify_path(&dir.path().join("gone"))
            .unwrap_err();
        assert!(matches!(err, AppError::NotAccessible { .. }));
    }

    #[test]
    fn resource_facts_for_a_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".notes.txt");
        fs::write(&path, vec![0u8; 1234]).unwrap();

        let facts = FsMetadataSource::new().resource_facts(&path).unwrap();

        assert_eq!(facts.name, ".notes.txt");
        assert_eq!(facts.size, Some(1234));
        assert!(facts.is_hidden);
        assert!(!facts.is_directory);
        assert!(facts.modified.is_some());
        assert_eq!(facts.kind_description.as_deref(), Some("TXT file"));
        assert_eq!(facts.cloud_container, None);
    }

    #[test]
    fn item_count_skips_hidden_children() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a"), b"").unwrap();
        fs::write(dir.path().join("b"), b"").unwrap();
        fs::write(dir.path().join(".DS_Store"), b"").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        assert_eq!(FsMetadataSource::new().item_count(dir.path()).unwrap(), 3);
    }

    #[test]
    fn cloud_container_names() {
        let drive = Path::new("/Users/u/Library/Mobile Documents/com~apple~CloudDocs/a.txt");
        let pages = Path::new("/Users/u/Library/Mobile Documents/com~apple~Pages/Documents/b.pages");

        assert_eq!(cloud_container(drive).as_deref(), Some("iCloud Drive"));
        assert_eq!(cloud_container(pages).as_deref(), Some("Pages"));
        assert_eq!(cloud_container(Path::new("/tmp/x")), None);
    }

    #[test]
    fn image_dimensions_come_from_the_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pixel.png");
        image::RgbImage::new(4, 3).save(&path).unwrap();

        let facts = FsMetadataSource::new().media_facts(&path).unwrap();

        assert_eq!(facts.dimensions, Some((4, 3)));
        assert_eq!(facts.version, None);
    }

    #[test]
    fn undecodable_image_has_no_media_facts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.png");
        fs::write(&path, b"not a png").unwrap();

        assert_eq!(FsMetadataSource::new().media_facts(&path), None);
    }

    #[test]
    fn bundle_version_prefers_the_short_version() {
        let dir = TempDir::new().unwrap();
        let app = write_bundle(
            dir.path(),
            "Tool.app",
            "<key>CFBundleShortVersionString</key><string>1.2.3</string>\
             <key>CFBundleVersion</key><string>456</string>",
        );

        let facts = FsMetadataSource::new().media_facts(&app).unwrap();

        assert_eq!(facts.version.as_deref(), Some("1.2.3"));
        assert_eq!(facts.dimensions, None);
    }

    #[test]
    fn bundle_version_falls_back_to_the_build_number() {
        let dir = TempDir::new().unwrap();
        let app = write_bundle(
            dir.path(),
            "Build.app",
            "<key>CFBundleShortVersionString</key><string> </string>\
             <key>CFBundleVersion</key><string>456</string>",
        );

        let facts = FsMetadataSource::new().media_facts(&app).unwrap();

        assert_eq!(facts.version.as_deref(), Some("456"));
    }

    #[test]
    fn bundle_without_info_plist_has_no_media_facts() {
        let dir = TempDir::new().unwrap();
        let app = dir.path().join("Empty.app");
        fs::create_dir_all(app.join("Contents")).unwrap();

        assert_eq!(FsMetadataSource::new().media_facts(&app), None);
    }
}
