//! Configuration data models
//!
//! This module defines the persisted icon settings: which packs are applied and
//! in what order, per-app custom icon choices, and resolution preferences.

use crate::model::{ComponentKey, CustomIconEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level persisted configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Applied icon pack package names, highest priority first
    pub applied_packs: Vec<String>,
    /// Custom icon overrides keyed by `package/class#user`, values in `pack|icon|arg` form
    pub custom_icons: BTreeMap<String, String>,
    /// Resolution preferences
    pub preferences: IconPreferences,
}

/// Preferences that influence icon resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IconPreferences {
    /// Composite unthemed apps through the pack's mask layers
    pub icon_pack_masking: bool,
    /// Wrap pack icons into adaptive icons
    pub adaptify_icon_packs: bool,
    /// Edge length of rendered icon bitmaps in pixels
    pub icon_bitmap_size: u32,
    /// Screen density used to pick drawable variants
    pub icon_dpi: u32,
}

impl Default for IconPreferences {
    fn default() -> Self {
        Self {
            icon_pack_masking: true,
            adaptify_icon_packs: false,
            icon_bitmap_size: 192,
            icon_dpi: 480,
        }
    }
}

impl EngineConfig {
    /// Custom icon override for a component, accepting legacy stored values
    pub fn custom_icon(&self, key: &ComponentKey) -> Option<CustomIconEntry> {
        self.custom_icons
            .get(&key.to_string())
            .map(|value| CustomIconEntry::parse(value))
    }

    /// Set or clear the custom icon override for a component
    ///
    /// Always stores the canonical format.
    pub fn set_custom_icon(&mut self, key: &ComponentKey, entry: Option<&CustomIconEntry>) {
        match entry {
            Some(entry) => {
                self.custom_icons.insert(key.to_string(), entry.to_string());
            }
            None => {
                self.custom_icons.remove(&key.to_string());
            }
        }
    }
}
