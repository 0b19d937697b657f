//! `src/tasks/metadata_task.rs`
//! ============================================================================
//! # Per-Kind Display Data
//!
//! One gathering function per [`SelectionKind`], dispatched exhaustively.
//! [`sync_fields`] is the cheap baseline computed on the caller's thread;
//! [`display_data`] is the full set, run by the main background job.

use std::{path::Path, time::Duration};

use compact_str::{CompactString, format_compact};
use tracing::debug;

use crate::{
    fs::metadata_source::{MediaFacts, MetadataSource, VolumeFacts},
    model::{
        selection::{SelectionInfo, SelectionKind},
        selection_data::{FieldKey, SelectionData},
    },
    util::humanize,
};

/// Fields that are cheap enough to compute before returning from `retrieve`.
pub fn sync_fields(info: &SelectionInfo, source: &dyn MetadataSource) -> SelectionData {
    match info.kind {
        SelectionKind::None | SelectionKind::Error | SelectionKind::Duplicate => SelectionData::new(),
        SelectionKind::Multi => multi(info),
        SelectionKind::Single
        | SelectionKind::Directory
        | SelectionKind::Application
        | SelectionKind::Volume
        | SelectionKind::Image
        | SelectionKind::Movie
        | SelectionKind::Audio => info
            .path()
            .map(|path| single(path, source))
            .unwrap_or_default(),
    }
}

/// Complete display data for the selection. `None` for kinds that carry no
/// data and for an info without paths.
pub fn display_data(info: &SelectionInfo, source: &dyn MetadataSource) -> Option<SelectionData> {
    if info.kind.is_terminal() {
        return None;
    }
    if info.kind == SelectionKind::Multi {
        return Some(multi(info));
    }

    let path = info.path()?;
    let specific = match info.kind {
        SelectionKind::Directory => directory(info, path, source),
        SelectionKind::Application => application(path, source),
        SelectionKind::Volume => volume(path, source),
        SelectionKind::Image => image(path, source),
        SelectionKind::Movie => movie(path, source),
        SelectionKind::Audio => audio(path, source),
        SelectionKind::Single
        | SelectionKind::Multi
        | SelectionKind::None
        | SelectionKind::Error
        | SelectionKind::Duplicate => SelectionData::new(),
    };
    Some(single(path, source).merge(&specific))
}

fn multi(info: &SelectionInfo) -> SelectionData {
    SelectionData::new().with(FieldKey::Items, humanize::item_count(info.paths.len()))
}

fn single(path: &Path, source: &dyn MetadataSource) -> SelectionData {
    let mut data = SelectionData::new();

    let facts = match source.resource_facts(path) {
        Ok(facts) => facts,
        Err(e) => {
            debug!(
                marker = "METADATA",
                operation_type = "resource_facts_failed",
                error = %e,
                "Resource facts unavailable"
            );
            return data;
        }
    };

    data.set(FieldKey::Name, Some(facts.name));
    data.set(FieldKey::Kind, facts.kind_description);
    data.set(FieldKey::Created, facts.created.map(humanize::date));
    data.set(FieldKey::Modified, facts.modified.map(humanize::date));
    data.set(
        FieldKey::Path,
        facts
            .path
            .parent()
            .map(|parent| CompactString::new(parent.to_string_lossy())),
    );
    data.set(FieldKey::CloudContainer, facts.cloud_container);

    data
}

fn directory(info: &SelectionInfo, path: &Path, source: &dyn MetadataSource) -> SelectionData {
    let mut data = SelectionData::new();

    if info.is_cloud_sync_file == Some(true) {
        return data;
    }

    data.set(
        FieldKey::Items,
        source
            .item_count(path)
            .ok()
            .map(humanize::item_count),
    );
    data
}

fn application(path: &Path, source: &dyn MetadataSource) -> SelectionData {
    let mut data = SelectionData::new();
    let version = source
        .media_facts(path)
        .and_then(|facts| facts.version)
        .filter(|v| !v.is_empty());

    data.set(FieldKey::Version, version.map(|v| format_compact!("ν{v}")));
    data
}

fn volume(path: &Path, source: &dyn MetadataSource) -> SelectionData {
    source
        .volume_facts(path)
        .map(volume_fields)
        .unwrap_or_default()
}

fn volume_fields(facts: VolumeFacts) -> SelectionData {
    let mut data = SelectionData::new().with(FieldKey::VolumeTotal, humanize::human_readable_size(facts.total));

    match facts.available_for_important_usage {
        Some(important) if important != 0 => {
            let purgeable = important.abs_diff(facts.available);
            data.set(
                FieldKey::VolumeAvailable,
                Some(format_compact!("{} available", humanize::human_readable_size(important))),
            );
            data.set(
                FieldKey::VolumePurgeable,
                Some(format_compact!("{} purgeable", humanize::human_readable_size(purgeable))),
            );
        }
        _ => data.set(
            FieldKey::VolumeAvailable,
            Some(format_compact!(
                "{} available",
                humanize::human_readable_size(facts.available)
            )),
        ),
    }

    data
}

fn image(path: &Path, source: &dyn MetadataSource) -> SelectionData {
    let mut data = SelectionData::new();
    let Some(facts) = source.media_facts(path) else {
        return data;
    };

    data.set(FieldKey::Dimensions, facts.dimensions.map(|(w, h)| humanize::dimensions(w, h)));
    data.set(FieldKey::Camera, facts.camera);
    data.set(FieldKey::FocalLength, facts.focal_length.map(|f| format_compact!("{} mm", trim_float(f))));
    data.set(FieldKey::Aperture, facts.aperture.map(|a| format_compact!("f/{}", trim_float(a))));
    data.set(FieldKey::ShutterSpeed, facts.exposure_time.map(humanize::shutter_speed));
    data.set(FieldKey::Iso, facts.iso.map(|iso| format_compact!("{iso}")));
    data.set(FieldKey::ColorProfile, facts.color_profile);
    data.set(
        FieldKey::ColorGamut,
        facts
            .wide_gamut
            .map(|wide| CompactString::const_new(if wide { "Wide Gamut" } else { "sRGB" })),
    );
    data
}

fn movie(path: &Path, source: &dyn MetadataSource) -> SelectionData {
    let mut data = SelectionData::new();
    let Some(facts) = source.media_facts(path) else {
        return data;
    };
    let file_size = file_size(path);

    data.set(FieldKey::Codecs, codecs(&facts));
    data.set(FieldKey::Duration, facts.duration.map(humanize::duration));
    data.set(FieldKey::ColorProfile, facts.color_profile.clone());
    data.set(FieldKey::Dimensions, facts.dimensions.map(|(w, h)| humanize::dimensions(w, h)));
    data.set(FieldKey::TotalBitrate, total_bitrate(&facts, file_size));
    data.set(FieldKey::SampleRate, facts.sample_rate.map(humanize::sample_rate));
    data
}

fn audio(path: &Path, source: &dyn MetadataSource) -> SelectionData {
    let mut data = SelectionData::new();
    let Some(facts) = source.media_facts(path) else {
        return data;
    };
    let file_size = file_size(path);

    data.set(FieldKey::Codecs, codecs(&facts));
    data.set(FieldKey::SampleRate, facts.sample_rate.map(humanize::sample_rate));
    data.set(FieldKey::Duration, facts.duration.map(humanize::duration));
    data.set(FieldKey::TotalBitrate, total_bitrate(&facts, file_size));
    data
}

fn codecs(facts: &MediaFacts) -> Option<CompactString> {
    if facts.codecs.is_empty() {
        return None;
    }
    let names: Vec<&str> = facts.codecs.iter().map(CompactString::as_str).collect();
    Some(CompactString::from(names.join(", ")))
}

/// Track estimates first, then the container total, then a size/duration
/// estimate marked with `~`.
fn total_bitrate(facts: &MediaFacts, file_size: Option<u64>) -> Option<CompactString> {
    if let (Some(video), Some(audio)) = (facts.video_bitrate, facts.audio_bitrate)
        && video + audio != 0.0
    {
        return Some(humanize::bitrate(video + audio));
    }

    if let Some(kbps) = facts.container_bitrate_kbps {
        return Some(humanize::bitrate(kbps * 1000.0));
    }

    let seconds = facts.duration.map(|d: Duration| d.as_secs_f64())?;
    let size = file_size?;
    if seconds <= 0.0 {
        return None;
    }

    #[expect(clippy::cast_precision_loss, reason = "estimate")]
    let bits = size as f64 * 8.0 / seconds;
    Some(format_compact!("~{}", humanize::bitrate(bits)))
}

fn file_size(path: &Path) -> Option<u64> {
    std::fs::metadata(path).ok().map(|meta| meta.len())
}

fn trim_float(value: f64) -> CompactString {
    if value.fract() == 0.0 {
        format_compact!("{value:.0}")
    } else {
        format_compact!("{value}")
    }
}
