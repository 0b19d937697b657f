//! `src/model/selection_data.rs`
//! ============================================================================
//! Display fields gathered for one selection.
//!
//! A `SelectionData` only ever holds fields that carry a value: assigning
//! `None` removes the key. That keeps the right-biased merge from ever
//! reverting a shown field to empty.

use std::collections::BTreeMap;
use std::fmt;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Every field the pipeline can produce.
///
/// Declaration order is display order: the derived `Ord` drives iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    CloudContainer,
    Name,
    Kind,
    Created,
    Modified,
    Codecs,
    ColorProfile,
    ColorGamut,
    TotalBitrate,
    Version,
    SampleRate,
    VolumeTotal,
    VolumeAvailable,
    VolumePurgeable,
    Aperture,
    Iso,
    FocalLength,
    Camera,
    ShutterSpeed,
    Path,
    Items,
    Duration,
    Dimensions,
    Size,
}

impl FieldKey {
    pub const ALL: [Self; 24] = [
        Self::CloudContainer,
        Self::Name,
        Self::Kind,
        Self::Created,
        Self::Modified,
        Self::Codecs,
        Self::ColorProfile,
        Self::ColorGamut,
        Self::TotalBitrate,
        Self::Version,
        Self::SampleRate,
        Self::VolumeTotal,
        Self::VolumeAvailable,
        Self::VolumePurgeable,
        Self::Aperture,
        Self::Iso,
        Self::FocalLength,
        Self::Camera,
        Self::ShutterSpeed,
        Self::Path,
        Self::Items,
        Self::Duration,
        Self::Dimensions,
        Self::Size,
    ];

    /// Human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CloudContainer => "iCloud",
            Self::Name => "Name",
            Self::Kind => "Kind",
            Self::Created => "Created",
            Self::Modified => "Modified",
            Self::Codecs => "Codecs",
            Self::ColorProfile => "Color Profile",
            Self::ColorGamut => "Color Gamut",
            Self::TotalBitrate => "Bitrate",
            Self::Version => "Version",
            Self::SampleRate => "Sample Rate",
            Self::VolumeTotal => "Total",
            Self::VolumeAvailable => "Available",
            Self::VolumePurgeable => "Purgeable",
            Self::Aperture => "Aperture",
            Self::Iso => "ISO",
            Self::FocalLength => "Focal Length",
            Self::Camera => "Camera",
            Self::ShutterSpeed => "Shutter Speed",
            Self::Path => "Path",
            Self::Items => "Items",
            Self::Duration => "Duration",
            Self::Dimensions => "Dimensions",
            Self::Size => "Size",
        }
    }

    #[must_use]
    pub const fn field_type(self) -> FieldType {
        match self {
            Self::Path => FieldType::Url,
            _ => FieldType::Text,
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a renderer should treat a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Url,
}

/// One renderable field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionField {
    pub key: FieldKey,
    pub value: CompactString,
    pub field_type: FieldType,
}

/// Field-key to formatted value mapping for one selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionData {
    fields: BTreeMap<FieldKey, CompactString>,
}

impl SelectionData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a field. `None` removes it.
    pub fn set<V>(&mut self, key: FieldKey, value: Option<V>)
    where
        V: Into<CompactString>,
    {
        match value {
            Some(v) => {
                self.fields.insert(key, v.into());
            }
            None => {
                self.fields.remove(&key);
            }
        }
    }

    /// Builder flavour of [`set`](Self::set).
    #[must_use]
    pub fn with<V: Into<CompactString>>(mut self, key: FieldKey, value: V) -> Self {
        self.fields.insert(key, value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: FieldKey) -> Option<&str> {
        self.fields.get(&key).map(CompactString::as_str)
    }

    pub fn remove(&mut self, key: FieldKey) -> Option<CompactString> {
        self.fields.remove(&key)
    }

    #[must_use]
    pub fn contains(&self, key: FieldKey) -> bool {
        self.fields.contains_key(&key)
    }

    /// True when no field would be shown.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.values().all(CompactString::is_empty)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Right-biased merge: every key present in `newer` wins, keys only in
    /// `self` are kept.
    #[must_use]
    pub fn merge(&self, newer: &Self) -> Self {
        let mut merged = self.clone();
        merged.merge_from(newer);
        merged
    }

    /// In-place variant of [`merge`](Self::merge).
    pub fn merge_from(&mut self, newer: &Self) {
        for (key, value) in &newer.fields {
            self.fields.insert(*key, value.clone());
        }
    }

    /// Keep only the keys for which `keep` returns true.
    pub fn retain<F: FnMut(FieldKey) -> bool>(&mut self, mut keep: F) {
        self.fields.retain(|key, _| keep(*key));
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Fields worth rendering, in display order.
    #[must_use]
    pub fn visible_fields(&self) -> Vec<SelectionField> {
        self.fields
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| SelectionField {
                key: *key,
                value: value.clone(),
                field_type: key.field_type(),
            })
            .collect()
    }

    /// Values of [`visible_fields`](Self::visible_fields) only.
    #[must_use]
    pub fn to_list_of_strings(&self) -> Vec<CompactString> {
        self.visible_fields().into_iter().map(|f| f.value).collect()
    }
}

impl<V: Into<CompactString>> FromIterator<(FieldKey, V)> for SelectionData {
    fn from_iter<I: IntoIterator<Item = (FieldKey, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k, v.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_is_right_biased() {
        let a = SelectionData::new()
            .with(FieldKey::Size, "10 KB")
            .with(FieldKey::Name, "foo");
        let b = SelectionData::new().with(FieldKey::Size, "12 KB");

        let merged = a.merge(&b);

        assert_eq!(merged.get(FieldKey::Size), Some("12 KB"));
        assert_eq!(merged.get(FieldKey::Name), Some("foo"));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn merge_never_clears_a_field() {
        let a = SelectionData::new().with(FieldKey::Kind, "Folder");
        let mut b = SelectionData::new();
        b.set::<&str>(FieldKey::Kind, None);

        assert_eq!(a.merge(&b).get(FieldKey::Kind), Some("Folder"));
    }

    #[test]
    fn setting_none_removes_key() {
        let mut data = SelectionData::new().with(FieldKey::Items, "3 items");
        data.set::<String>(FieldKey::Items, None);
        assert!(!data.contains(FieldKey::Items));
    }

    #[test]
    fn visible_fields_skip_empty_and_follow_display_order() {
        let data: SelectionData = [
            (FieldKey::Size, "2 MB"),
            (FieldKey::Path, "/tmp"),
            (FieldKey::Name, "a.txt"),
            (FieldKey::Kind, ""),
        ]
        .into_iter()
        .collect();

        let fields = data.visible_fields();
        let keys: Vec<FieldKey> = fields.iter().map(|f| f.key).collect();

        assert_eq!(keys, vec![FieldKey::Name, FieldKey::Path, FieldKey::Size]);
        assert_eq!(fields[1].field_type, FieldType::Url);
        assert_eq!(data.to_list_of_strings(), vec!["a.txt", "/tmp", "2 MB"]);
    }

    #[test]
    fn empty_values_count_as_empty() {
        let data = SelectionData::new().with(FieldKey::Name, "");
        assert!(data.is_empty());
        assert!(SelectionData::new().is_empty());
    }
}
