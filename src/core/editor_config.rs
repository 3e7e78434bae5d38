//! Editor display and behavior options

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::settings::UserSettings;

/// Smallest accepted editor font size
pub const MIN_FONT_SIZE: f32 = 8.0;
/// Largest accepted editor font size
pub const MAX_FONT_SIZE: f32 = 72.0;

/// Options applied to the edit surface on every frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Font size in points
    pub font_size: f32,
    /// Font family name ("monospace", "proportional" or a named family)
    pub font_family: String,
    /// Show the line number gutter
    pub line_numbers: bool,
    /// Soft-wrap long lines at the surface width
    pub word_wrap: bool,
    /// Show the minimap strip
    pub minimap: bool,
    /// Disallow edits from the widget
    pub read_only: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            font_size: 14.0,
            font_family: "monospace".to_string(),
            line_numbers: true,
            word_wrap: true,
            minimap: false,
            read_only: false,
        }
    }
}

impl EditorConfig {
    /// Defaults with the valid options of `value` applied.
    ///
    /// Goes through [`EditorConfigPatch::from_json`], so a stored config
    /// is held to the same rules as a live update.
    pub fn from_json(value: &Value) -> Self {
        let mut config = Self::default();
        config.merge(&EditorConfigPatch::from_json(value));
        config
    }

    /// Merge a partial update; absent fields keep their value
    pub fn merge(&mut self, patch: &EditorConfigPatch) {
        if let Some(size) = patch.font_size {
            self.font_size = size;
        }
        if let Some(ref family) = patch.font_family {
            self.font_family = family.clone();
        }
        if let Some(on) = patch.line_numbers {
            self.line_numbers = on;
        }
        if let Some(on) = patch.word_wrap {
            self.word_wrap = on;
        }
        if let Some(on) = patch.minimap {
            self.minimap = on;
        }
        if let Some(on) = patch.read_only {
            self.read_only = on;
        }
    }

    /// Whether the family should be drawn with the proportional egui font
    pub fn is_proportional(&self) -> bool {
        matches!(
            self.font_family.trim().to_ascii_lowercase().as_str(),
            "proportional" | "sans-serif" | "serif"
        )
    }
}

/// Partial editor configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorConfigPatch {
    pub font_size: Option<f32>,
    pub font_family: Option<String>,
    pub line_numbers: Option<bool>,
    pub word_wrap: Option<bool>,
    pub minimap: Option<bool>,
    pub read_only: Option<bool>,
}

impl EditorConfigPatch {
    /// Whether the patch changes nothing
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Set the font size, rejecting values outside the accepted range
    pub fn with_font_size(mut self, size: f32) -> Self {
        if valid_font_size(size) {
            self.font_size = Some(size);
        } else {
            tracing::warn!("Ignoring editor font size {} (allowed {}..={})", size, MIN_FONT_SIZE, MAX_FONT_SIZE);
        }
        self
    }

    pub fn with_word_wrap(mut self, on: bool) -> Self {
        self.word_wrap = Some(on);
        self
    }

    pub fn with_line_numbers(mut self, on: bool) -> Self {
        self.line_numbers = Some(on);
        self
    }

    pub fn with_minimap(mut self, on: bool) -> Self {
        self.minimap = Some(on);
        self
    }

    /// Build a patch from untyped JSON.
    ///
    /// Unknown keys and values of the wrong type or out of range are
    /// dropped with a warning; only recognized, valid fields survive.
    pub fn from_json(value: &Value) -> Self {
        let mut patch = Self::default();
        let Some(object) = value.as_object() else {
            tracing::warn!("Ignoring editor config update: expected an object, got {}", value);
            return patch;
        };

        for (key, value) in object {
            let accepted = match key.as_str() {
                "font_size" => value
                    .as_f64()
                    .map(|v| v as f32)
                    .filter(|v| valid_font_size(*v))
                    .map(|v| patch.font_size = Some(v)),
                "font_family" => value
                    .as_str()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| patch.font_family = Some(s.to_string())),
                "line_numbers" => value.as_bool().map(|v| patch.line_numbers = Some(v)),
                "word_wrap" => value.as_bool().map(|v| patch.word_wrap = Some(v)),
                "minimap" => value.as_bool().map(|v| patch.minimap = Some(v)),
                "read_only" => value.as_bool().map(|v| patch.read_only = Some(v)),
                _ => {
                    tracing::warn!("Ignoring unknown editor option '{}'", key);
                    continue;
                }
            };

            if accepted.is_none() {
                tracing::warn!("Ignoring invalid value for editor option '{}': {}", key, value);
            }
        }

        patch
    }
}

impl From<&UserSettings> for EditorConfigPatch {
    fn from(settings: &UserSettings) -> Self {
        let mut patch = Self::default()
            .with_font_size(settings.editor_font_size)
            .with_line_numbers(settings.show_line_numbers)
            .with_word_wrap(settings.word_wrap)
            .with_minimap(settings.minimap_enabled);
        let family = settings.editor_font_family.trim();
        if !family.is_empty() {
            patch.font_family = Some(family.to_string());
        }
        patch
    }
}

fn valid_font_size(size: f32) -> bool {
    size.is_finite() && (MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_leaves_absent_fields() {
        let mut config = EditorConfig::default();
        config.merge(&EditorConfigPatch {
            word_wrap: Some(false),
            ..Default::default()
        });

        assert!(!config.word_wrap);
        assert_eq!(config.font_size, 14.0);
        assert!(config.line_numbers);
        assert_eq!(config.font_family, "monospace");
    }

    #[test]
    fn test_from_json_rejects_unknown_and_invalid() {
        let patch = EditorConfigPatch::from_json(&json!({
            "font_size": 18,
            "minimap": true,
            "cursor_blink": "smooth",
            "word_wrap": "yes",
            "font_family": "   ",
        }));

        assert_eq!(patch.font_size, Some(18.0));
        assert_eq!(patch.minimap, Some(true));
        assert_eq!(patch.word_wrap, None);
        assert_eq!(patch.font_family, None);
    }

    #[test]
    fn test_from_json_rejects_out_of_range_font_size() {
        let patch = EditorConfigPatch::from_json(&json!({ "font_size": 400 }));
        assert!(patch.is_empty());

        let patch = EditorConfigPatch::default().with_font_size(2.0);
        assert_eq!(patch.font_size, None);
    }

    #[test]
    fn test_from_json_non_object() {
        assert!(EditorConfigPatch::from_json(&json!([1, 2, 3])).is_empty());
    }

    #[test]
    fn test_from_user_settings() {
        let settings = UserSettings {
            editor_font_size: 16.0,
            editor_font_family: "JetBrains Mono".to_string(),
            minimap_enabled: true,
            word_wrap: false,
            ..UserSettings::new("user-1")
        };

        let mut config = EditorConfig::default();
        config.merge(&EditorConfigPatch::from(&settings));

        assert_eq!(config.font_size, 16.0);
        assert_eq!(config.font_family, "JetBrains Mono");
        assert!(config.minimap);
        assert!(!config.word_wrap);
        assert!(!config.read_only);
    }

    #[test]
    fn test_proportional_family() {
        let mut config = EditorConfig::default();
        assert!(!config.is_proportional());
        config.font_family = "Sans-Serif".to_string();
        assert!(config.is_proportional());
    }
}
