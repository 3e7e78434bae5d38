//! Application configuration management

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::debounce::DEFAULT_QUIESCENCE;
use super::editor_config::EditorConfig;
use crate::backend::settings::Theme;

/// Environment variable overriding the backend project URL
pub const ENV_BACKEND_URL: &str = "PAPERDESK_SUPABASE_URL";
/// Environment variable overriding the backend public key
pub const ENV_ANON_KEY: &str = "PAPERDESK_SUPABASE_ANON_KEY";
/// Environment variable with the public app URL used in password reset links
pub const ENV_APP_URL: &str = "PAPERDESK_APP_URL";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Hosted backend connection
    pub backend: BackendConfig,
    /// Editor settings used until the user's own settings load
    #[serde(deserialize_with = "validated_editor_config")]
    pub editor: EditorConfig,
    /// UI settings
    pub ui: UiConfig,
    /// Quiescence window for editor input, in milliseconds
    pub debounce_ms: u64,
}

/// Backend connection settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Project URL; without it the app runs on the local in-memory backend
    pub url: Option<String>,
    /// Public (anon) API key
    pub anon_key: Option<String>,
    /// Public app URL for links in password reset emails
    pub redirect_url: Option<String>,
}

/// UI settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Theme used before sign-in
    pub theme: Theme,
    /// Start with the sidebar collapsed
    pub sidebar_collapsed: bool,
    /// Email pre-filled on the sign-in form
    pub last_email: Option<String>,
}

/// Read the `editor` section with unknown or invalid options dropped
fn validated_editor_config<'de, D: Deserializer<'de>>(deserializer: D) -> Result<EditorConfig, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(EditorConfig::from_json(&value))
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            editor: EditorConfig::default(),
            ui: UiConfig::default(),
            debounce_ms: DEFAULT_QUIESCENCE.as_millis() as u64,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            sidebar_collapsed: false,
            last_email: None,
        }
    }
}

impl AppConfig {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "paperdesk", "Paperdesk")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load configuration from disk, then apply environment overrides
    pub fn load() -> Result<Self> {
        let path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        let mut config = Self::load_from(&path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        self.save_to(&path)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Override backend settings from environment lookups
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = non_empty(ENV_BACKEND_URL) {
            self.backend.url = Some(url);
        }
        if let Some(key) = non_empty(ENV_ANON_KEY) {
            self.backend.anon_key = Some(key);
        }
        if let Some(app_url) = non_empty(ENV_APP_URL) {
            self.backend.redirect_url = Some(app_url);
        }
    }

    /// Debounce window for editor input
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::EditorStore;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("config.json")).unwrap();

        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert!(config.backend.url.is_none());
        assert_eq!(config.editor, EditorConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.backend.url = Some("https://project.supabase.co".to_string());
        config.ui.theme = Theme::Dark;
        config.editor.font_size = 18.0;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.backend.url.as_deref(), Some("https://project.supabase.co"));
        assert_eq!(loaded.ui.theme, Theme::Dark);
        assert_eq!(loaded.editor.font_size, 18.0);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "debounce_ms": 150 }"#).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.debounce_ms, 150);
        assert!(config.editor.line_numbers);
    }

    #[test]
    fn test_invalid_editor_options_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "editor": { "font_size": 400, "font_family": "", "cursor_blink": "smooth", "word_wrap": false } }"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.editor.font_size, 14.0);
        assert_eq!(config.editor.font_family, "monospace");
        assert!(!config.editor.word_wrap);

        let store = EditorStore::new(config.editor.clone());
        assert_eq!(store.config().font_size, 14.0);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_BACKEND_URL, "https://env.supabase.co"),
            (ENV_ANON_KEY, "anon-env"),
            (ENV_APP_URL, "  "),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.backend.redirect_url = Some("https://kept.example.org".to_string());
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.backend.url.as_deref(), Some("https://env.supabase.co"));
        assert_eq!(config.backend.anon_key.as_deref(), Some("anon-env"));
        assert_eq!(config.backend.redirect_url.as_deref(), Some("https://kept.example.org"));
    }
}
