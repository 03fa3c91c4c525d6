use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Gemini model used for interviews and key checks (e.g., "gemini-2.5-flash")
    pub model: Option<String>,
    /// API base URL, without the `/models/...` suffix
    pub base_url: Option<String>,
    /// Character list to use instead of the bundled one
    pub characters_path: Option<PathBuf>,
    /// Directory holding the stored credential and chat history
    pub data_dir: Option<PathBuf>,
    /// Keep at most this many archived conversations (unlimited when unset)
    pub history_limit: Option<usize>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

/// Configuration keys accepted by `intervistai set` / `intervistai unset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    Model,
    BaseUrl,
    CharactersPath,
    DataDir,
    HistoryLimit,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 5] = [
        ConfigKey::Model,
        ConfigKey::BaseUrl,
        ConfigKey::CharactersPath,
        ConfigKey::DataDir,
        ConfigKey::HistoryLimit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::Model => "model",
            ConfigKey::BaseUrl => "base-url",
            ConfigKey::CharactersPath => "characters-path",
            ConfigKey::DataDir => "data-dir",
            ConfigKey::HistoryLimit => "history-limit",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let normalized = name.trim().to_lowercase().replace('_', "-");
        Self::ALL.into_iter().find(|key| key.as_str() == normalized)
    }
}
