//! `src/model/settings.rs`
//! ============================================================================
//! Per-field display toggles applied to every result before it leaves the
//! pipeline.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::{
    selection::SelectionKind,
    selection_data::{FieldKey, SelectionData},
};

/// Strips fields the user has switched off.
pub trait SettingsFilter: Send + Sync {
    /// Remove disabled fields from `data`.
    fn filter(&self, data: SelectionData, kind: SelectionKind) -> SelectionData;

    /// Whether a size should be computed at all for `kind`.
    fn size_enabled(&self, kind: SelectionKind) -> bool;
}

/// Field toggles. Everything is shown by default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSettings {
    pub disabled: BTreeSet<FieldKey>,

    /// Skip the recursive walk for directories and applications.
    pub skip_directory_size: bool,
}

impl FieldSettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn disable(mut self, key: FieldKey) -> Self {
        self.disabled.insert(key);
        self
    }

    #[must_use]
    pub const fn skipping_directory_size(mut self, skip: bool) -> Self {
        self.skip_directory_size = skip;
        self
    }

    #[must_use]
    pub fn is_enabled(&self, key: FieldKey) -> bool {
        !self.disabled.contains(&key)
    }
}

impl SettingsFilter for FieldSettings {
    fn filter(&self, mut data: SelectionData, kind: SelectionKind) -> SelectionData {
        data.retain(|key| self.is_enabled(key));

        if !self.size_enabled(kind) {
            data.remove(FieldKey::Size);
        }

        data
    }

    fn size_enabled(&self, kind: SelectionKind) -> bool {
        if !self.is_enabled(FieldKey::Size) {
            return false;
        }
        !(self.skip_directory_size && kind.is_directory_like())
    }
}
