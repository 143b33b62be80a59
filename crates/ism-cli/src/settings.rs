//! Persisted CLI settings.
//!
//! Stored as TOML in the platform config directory. Missing keys take their
//! defaults; command-line flags override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use ism_mapping::EditorMode;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// CLI settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub editor: EditorSettings,
}

/// Where and how to reach OpenSearch Dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Dashboards base URL.
    pub url: String,

    /// Data source for multi data source setups.
    pub data_source_id: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:5601".to_string(),
            data_source_id: None,
            timeout_secs: 30,
        }
    }
}

/// Mapping editor preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Mode mapping files are checked in before sending. `visual` checks
    /// the mapping up front; `json` defers the checks to the request build.
    pub mode: EditorMode,
}

impl Settings {
    /// Load settings from the default path.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from `path`. A missing file gives the defaults; an
    /// unreadable one is logged and also gives the defaults.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match toml::from_str(&content) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring invalid settings file");
                Self::default()
            }
        }
    }

    /// Save settings to `path`, creating its directory.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("failed to serialize settings")?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))
    }

    /// Default settings file path.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("org", "OpenSearch", "ism")
            .map(|dirs| dirs.config_dir().join("settings.toml"))
            .unwrap_or_else(|| PathBuf::from("settings.toml"))
    }

    /// Apply command-line overrides.
    pub fn apply_overrides(
        &mut self,
        url: Option<String>,
        data_source_id: Option<String>,
        timeout_secs: Option<u64>,
    ) {
        if let Some(url) = url {
            self.server.url = url;
        }
        if data_source_id.is_some() {
            self.server.data_source_id = data_source_id;
        }
        if let Some(secs) = timeout_secs {
            self.server.timeout_secs = secs;
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.server.timeout_secs)
    }
}
