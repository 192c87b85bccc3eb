use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use directories::ProjectDirs;
use helmet_config::{APP_NAME, APP_ORGANIZATION, APP_QUALIFIER, SETTINGS_FILE_NAME};
use helmet_core::SettingsKey;
use serde_json::{Map, Value};

use crate::atomic::{atomic_write, sibling_with_suffix};
use crate::{SettingsError, SettingsStore};

/// Settings kept as a flat JSON object on disk.
///
/// Every call goes to the file, so separate processes (and separate store instances)
/// observe each other's writes. Keys other than the recognised three are preserved.
pub struct JsonSettingsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store at the platform config directory, e.g. `~/.config/helmet-ui/config.json`.
    pub fn open_default() -> Result<Self, SettingsError> {
        let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .ok_or(SettingsError::NoConfigDir)?;
        Ok(Self::new(dirs.config_dir().join(SETTINGS_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Map<String, Value>, SettingsError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        let value: Value =
            serde_json::from_str(&content).map_err(|source| SettingsError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(SettingsError::NotAnObject {
                path: self.path.clone(),
            }),
        }
    }

    /// Reads the document for modification. A corrupt file is moved aside so the write
    /// can proceed from an empty document.
    fn read_document_for_update(&self) -> Result<Map<String, Value>, SettingsError> {
        match self.read_document() {
            Ok(map) => Ok(map),
            Err(e) if e.kind() == crate::SettingsErrorKind::Corrupt => {
                let quarantine = sibling_with_suffix(&self.path, ".corrupt");
                tracing::warn!(
                    path = %self.path.display(),
                    moved_to = %quarantine.display(),
                    "settings file is corrupt; starting from empty settings"
                );
                fs::rename(&self.path, &quarantine)?;
                Ok(Map::new())
            }
            Err(e) => Err(e),
        }
    }

    fn write_document(&self, map: &Map<String, Value>) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(map)?;
        atomic_write(&self.path, json.as_bytes())
    }

    fn update(&self, f: impl FnOnce(&mut Map<String, Value>)) -> Result<(), SettingsError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut map = self.read_document_for_update()?;
        f(&mut map);
        self.write_document(&map)
    }
}

impl SettingsStore for JsonSettingsStore {
    fn get(&self, key: SettingsKey) -> Result<Option<Utf8PathBuf>, SettingsError> {
        let map = self.read_document()?;
        match map.get(key.as_str()) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(Utf8PathBuf::from(s))),
            Some(other) => {
                tracing::warn!(key = %key, value = %other, "ignoring non-string settings value");
                Ok(None)
            }
        }
    }

    fn set(&self, key: SettingsKey, value: &Utf8Path) -> Result<(), SettingsError> {
        self.update(|map| {
            map.insert(key.as_str().to_string(), Value::String(value.to_string()));
        })?;
        tracing::debug!(key = %key, value = %value, "setting persisted");
        Ok(())
    }

    fn unset(&self, key: SettingsKey) -> Result<(), SettingsError> {
        self.update(|map| {
            map.remove(key.as_str());
        })
    }
}
