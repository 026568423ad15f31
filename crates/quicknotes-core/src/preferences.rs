//! Local key-value preferences.
//!
//! Holds the display preference (dark mode). It lives outside the remote
//! database: loaded once when a surface starts, written whenever it changes.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

pub const DARK_MODE_KEY: &str = "dark_mode";

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("Failed to access preferences at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse preferences at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub trait PreferenceStore {
    fn get_bool(&self, key: &str, default: bool) -> bool;
    fn set_bool(&self, key: &str, value: bool) -> Result<(), PreferenceError>;
}

/// Preferences persisted as a flat JSON object.
#[derive(Debug, Clone)]
pub struct JsonPreferenceStore {
    path: PathBuf,
    values: Arc<Mutex<BTreeMap<String, serde_json::Value>>>,
}

impl JsonPreferenceStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PreferenceError> {
        let path = path.into();
        let values = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|source| PreferenceError::Io {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&raw).map_err(|source| PreferenceError::Parse {
                path: path.clone(),
                source,
            })?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            values: Arc::new(Mutex::new(values)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, serde_json::Value>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, values: &BTreeMap<String, serde_json::Value>) -> Result<(), PreferenceError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| PreferenceError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let serialized =
            serde_json::to_string_pretty(values).map_err(|source| PreferenceError::Parse {
                path: self.path.clone(),
                source,
            })?;
        std::fs::write(&self.path, serialized).map_err(|source| PreferenceError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl PreferenceStore for JsonPreferenceStore {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.lock()
            .get(key)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(default)
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), PreferenceError> {
        let mut values = self.lock();
        values.insert(key.to_string(), serde_json::Value::Bool(value));
        self.persist(&values)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryPreferenceStore {
    values: Arc<Mutex<BTreeMap<String, bool>>>,
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
            .unwrap_or(default)
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), PreferenceError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }
}

/// Display settings applied to a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayPreferences {
    pub dark_mode: bool,
}

impl DisplayPreferences {
    pub fn load(store: &impl PreferenceStore) -> Self {
        Self {
            dark_mode: store.get_bool(DARK_MODE_KEY, false),
        }
    }

    /// Change dark mode, writing it through to `store` first.
    pub fn set_dark_mode(
        &mut self,
        store: &impl PreferenceStore,
        enabled: bool,
    ) -> Result<(), PreferenceError> {
        store.set_bool(DARK_MODE_KEY, enabled)?;
        self.dark_mode = enabled;
        tracing::info!("Dark mode {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_store_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonPreferenceStore::open(dir.path().join("settings.json")).unwrap();
        assert!(!store.get_bool(DARK_MODE_KEY, false));
        assert!(store.get_bool("other", true));
    }

    #[test]
    fn json_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let store = JsonPreferenceStore::open(&path).unwrap();
        store.set_bool(DARK_MODE_KEY, true).unwrap();

        let reopened = JsonPreferenceStore::open(&path).unwrap();
        assert!(reopened.get_bool(DARK_MODE_KEY, false));
    }

    #[test]
    fn json_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonPreferenceStore::open(&path),
            Err(PreferenceError::Parse { .. })
        ));
    }

    #[test]
    fn display_preferences_load_and_write_on_change() {
        let store = InMemoryPreferenceStore::default();
        let mut display = DisplayPreferences::load(&store);
        assert!(!display.dark_mode);

        display.set_dark_mode(&store, true).unwrap();
        assert!(display.dark_mode);
        assert!(DisplayPreferences::load(&store).dark_mode);
    }
}
