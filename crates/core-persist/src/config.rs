//! Editor-wide configuration, TOML-backed: read from the user's config
//! directory if present, otherwise fall back to defaults. This is
//! process-level configuration (storage paths, default retention); it is
//! distinct from [`crate::schema::HistorySettings`], which travels inside a
//! saved document.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::schema::RetentionSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    #[serde(default = "default_autosave_interval_secs")]
    pub autosave_interval_secs: u64,
    #[serde(default)]
    pub retention: RetentionSettings,
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
}

fn default_autosave_interval_secs() -> u64 {
    30
}

fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("phototis")
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            autosave_interval_secs: default_autosave_interval_secs(),
            retention: RetentionSettings::default(),
            storage_dir: default_storage_dir(),
        }
    }
}

impl EditorConfig {
    /// Loads `path` as TOML, falling back to defaults when it does not
    /// exist. A present-but-malformed file is an error: unlike a missing
    /// file, it is signal that the user's config is broken.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(target: "persist", path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let config = toml::from_str(&raw)?;
        Ok(config)
    }

    /// Default config file path: `<config_dir>/phototis/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("phototis")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = EditorConfig::load_from(Path::new("/nonexistent/phototis.toml")).unwrap();
        assert_eq!(config.autosave_interval_secs, 30);
    }

    #[test]
    fn loads_overrides_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "autosaveIntervalSecs = 60\n").unwrap();
        let config = EditorConfig::load_from(&path).unwrap();
        assert_eq!(config.autosave_interval_secs, 60);
    }
}
