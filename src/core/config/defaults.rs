use std::path::{Path, PathBuf};

use crate::core::config::data::{Config, ConfigKey};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

impl Config {
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .filter(|model| !model.trim().is_empty())
            .unwrap_or(DEFAULT_MODEL)
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn characters_path(&self) -> Option<&Path> {
        self.characters_path.as_deref()
    }

    /// Resolve the data directory, falling back to the platform data dir.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| Self::project_dirs().map(|dirs| dirs.data_dir().to_path_buf()))
    }

    /// Apply a `set` command. Returns an error message for unparsable values.
    pub fn set_value(&mut self, key: ConfigKey, value: &str) -> Result<(), String> {
        let value = value.trim();
        if value.is_empty() {
            return Err(format!("A value is required for {}", key.as_str()));
        }
        match key {
            ConfigKey::Model => self.model = Some(value.to_string()),
            ConfigKey::BaseUrl => self.base_url = Some(value.to_string()),
            ConfigKey::CharactersPath => self.characters_path = Some(PathBuf::from(value)),
            ConfigKey::DataDir => self.data_dir = Some(PathBuf::from(value)),
            ConfigKey::HistoryLimit => {
                let limit = value
                    .parse::<usize>()
                    .ok()
                    .filter(|limit| *limit > 0)
                    .ok_or_else(|| format!("history-limit must be a positive number, got '{value}'"))?;
                self.history_limit = Some(limit);
            }
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: ConfigKey) {
        match key {
            ConfigKey::Model => self.model = None,
            ConfigKey::BaseUrl => self.base_url = None,
            ConfigKey::CharactersPath => self.characters_path = None,
            ConfigKey::DataDir => self.data_dir = None,
            ConfigKey::HistoryLimit => self.history_limit = None,
        }
    }
}
