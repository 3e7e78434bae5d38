//! Per-user settings record

use std::future::Future;

use serde::{Deserialize, Serialize};

use super::BackendError;

/// Color theme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub const ALL: [Theme; 3] = [Theme::Light, Theme::Dark, Theme::System];

    pub fn label(self) -> &'static str {
        match self {
            Theme::Light => "Light",
            Theme::Dark => "Dark",
            Theme::System => "System",
        }
    }
}

/// Settings row stored for every user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    pub user_id: String,
    #[serde(default)]
    pub theme: Theme,
    pub editor_font_size: f32,
    pub editor_font_family: String,
    pub preview_font_size: f32,
    /// Seconds between automatic saves, 0 disables
    pub auto_save_interval: u64,
    pub show_line_numbers: bool,
    pub word_wrap: bool,
    pub minimap_enabled: bool,
    pub vim_mode_enabled: bool,
    pub notifications_enabled: bool,
    pub email_notifications: bool,
}

impl UserSettings {
    /// Defaults for a freshly created account
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            theme: Theme::System,
            editor_font_size: 14.0,
            editor_font_family: "monospace".to_string(),
            preview_font_size: 16.0,
            auto_save_interval: 30,
            show_line_numbers: true,
            word_wrap: true,
            minimap_enabled: false,
            vim_mode_enabled: false,
            notifications_enabled: true,
            email_notifications: false,
        }
    }

    /// Merge a partial update; absent fields keep their value
    pub fn apply(&mut self, patch: &UserSettingsPatch) {
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(size) = patch.editor_font_size {
            self.editor_font_size = size;
        }
        if let Some(ref family) = patch.editor_font_family {
            self.editor_font_family = family.clone();
        }
        if let Some(size) = patch.preview_font_size {
            self.preview_font_size = size;
        }
        if let Some(interval) = patch.auto_save_interval {
            self.auto_save_interval = interval;
        }
        if let Some(on) = patch.show_line_numbers {
            self.show_line_numbers = on;
        }
        if let Some(on) = patch.word_wrap {
            self.word_wrap = on;
        }
        if let Some(on) = patch.minimap_enabled {
            self.minimap_enabled = on;
        }
        if let Some(on) = patch.vim_mode_enabled {
            self.vim_mode_enabled = on;
        }
        if let Some(on) = patch.notifications_enabled {
            self.notifications_enabled = on;
        }
        if let Some(on) = patch.email_notifications {
            self.email_notifications = on;
        }
    }

    /// Fields of `edited` that differ from `self`
    pub fn diff(&self, edited: &UserSettings) -> UserSettingsPatch {
        fn changed<T: PartialEq + Clone>(old: &T, new: &T) -> Option<T> {
            (old != new).then(|| new.clone())
        }

        UserSettingsPatch {
            theme: changed(&self.theme, &edited.theme),
            editor_font_size: changed(&self.editor_font_size, &edited.editor_font_size),
            editor_font_family: changed(&self.editor_font_family, &edited.editor_font_family),
            preview_font_size: changed(&self.preview_font_size, &edited.preview_font_size),
            auto_save_interval: changed(&self.auto_save_interval, &edited.auto_save_interval),
            show_line_numbers: changed(&self.show_line_numbers, &edited.show_line_numbers),
            word_wrap: changed(&self.word_wrap, &edited.word_wrap),
            minimap_enabled: changed(&self.minimap_enabled, &edited.minimap_enabled),
            vim_mode_enabled: changed(&self.vim_mode_enabled, &edited.vim_mode_enabled),
            notifications_enabled: changed(&self.notifications_enabled, &edited.notifications_enabled),
            email_notifications: changed(&self.email_notifications, &edited.email_notifications),
        }
    }
}

/// Partial settings update. Absent fields are not serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor_font_size: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor_font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_font_size: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_save_interval: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_line_numbers: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_wrap: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimap_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vim_mode_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_notifications: Option<bool>,
}

impl UserSettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Settings persistence in the hosted data store
pub trait SettingsStore {
    /// Fails with [`BackendError::SettingsNotFound`] when the user has no row
    fn get_user_settings(&self, user_id: &str) -> impl Future<Output = Result<UserSettings, BackendError>> + Send;

    /// Merge `patch` into the user's row and return the merged record.
    /// Fails with [`BackendError::UnknownUser`] when there is no row.
    fn update_user_settings(
        &self,
        user_id: &str,
        patch: &UserSettingsPatch,
    ) -> impl Future<Output = Result<UserSettings, BackendError>> + Send;
}
