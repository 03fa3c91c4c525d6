//! Durable key/value storage.
//!
//! Credentials and conversation history are persisted as string values
//! under fixed keys. [`FileStore`] keeps each key in its own file inside the
//! data directory and replaces it atomically; [`MemoryStore`] backs tests.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::core::config::data::path_display;

pub const CREDENTIAL_KEY: &str = "apiCredential";
pub const HISTORY_KEY: &str = "chatHistory";

/// Failure to reach the durable store.
#[derive(Debug)]
pub enum StoreError {
    Read { key: String, source: std::io::Error },
    Write { key: String, source: std::io::Error },
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Read { key, source } => write!(f, "Failed to read '{key}': {source}"),
            StoreError::Write { key, source } => write!(f, "Failed to write '{key}': {source}"),
            StoreError::Unavailable(msg) => write!(f, "Storage unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Read { source, .. } | StoreError::Write { source, .. } => Some(source),
            StoreError::Unavailable(_) => None,
        }
    }
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// One file per key under a single directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::Unavailable(format!("invalid key '{key}'")));
        }
        Ok(self.dir.join(key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(contents) => Ok(Some(contents)),
                Err(err) => {
                    warn!(
                        key,
                        path = %path_display(&path),
                        error = %err,
                        "stored value is not UTF-8; treating it as absent"
                    );
                    Ok(None)
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let write_err = |source| StoreError::Write {
            key: key.to_string(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(write_err)?;
        let mut temp_file = NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        temp_file.write_all(value.as_bytes()).map_err(write_err)?;
        temp_file.as_file_mut().sync_all().map_err(write_err)?;
        temp_file
            .persist(&path)
            .map_err(|err| write_err(err.error))?;

        debug!(key, path = %path_display(&path), bytes = value.len(), "stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Write {
                key: key.to_string(),
                source,
            }),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self
            .values
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))?;
        values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_store_reads_back_written_values() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::new(temp_dir.path().join("data"));

        assert_eq!(store.get(CREDENTIAL_KEY).unwrap(), None);
        store.set(CREDENTIAL_KEY, "secret").unwrap();
        assert_eq!(store.get(CREDENTIAL_KEY).unwrap().as_deref(), Some("secret"));

        store.set(CREDENTIAL_KEY, "rotated").unwrap();
        assert_eq!(
            store.get(CREDENTIAL_KEY).unwrap().as_deref(),
            Some("rotated")
        );
    }

    #[test]
    fn file_store_survives_reopen() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        FileStore::new(temp_dir.path())
            .set(HISTORY_KEY, "[]")
            .unwrap();

        let reopened = FileStore::new(temp_dir.path());
        assert_eq!(reopened.get(HISTORY_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn file_store_remove_is_idempotent() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::new(temp_dir.path());
        store.set(CREDENTIAL_KEY, "secret").unwrap();

        store.remove(CREDENTIAL_KEY).unwrap();
        store.remove(CREDENTIAL_KEY).unwrap();
        assert_eq!(store.get(CREDENTIAL_KEY).unwrap(), None);
    }

    #[test]
    fn file_store_reads_non_utf8_value_as_absent() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join(CREDENTIAL_KEY), [0xff, 0xfe, b'k']).unwrap();
        let store = FileStore::new(temp_dir.path());

        assert_eq!(store.get(CREDENTIAL_KEY).unwrap(), None);
        store.set(CREDENTIAL_KEY, "fresh").unwrap();
        assert_eq!(store.get(CREDENTIAL_KEY).unwrap().as_deref(), Some("fresh"));
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::new(temp_dir.path());
        assert!(matches!(
            store.set("../escape", "x"),
            Err(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn file_store_reports_unwritable_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let store = FileStore::new(blocker.join("data"));
        assert!(matches!(
            store.set(HISTORY_KEY, "[]"),
            Err(StoreError::Write { .. })
        ));
    }
}
