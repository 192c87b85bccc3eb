use camino::{Utf8Path, Utf8PathBuf};
use helmet_core::{Settings, SettingsKey};

use crate::SettingsError;

/// Read/write contract of the persisted settings.
///
/// `set` is durable when it returns: a fresh store opened on the same location sees
/// the value.
pub trait SettingsStore: Send + Sync + 'static {
    fn get(&self, key: SettingsKey) -> Result<Option<Utf8PathBuf>, SettingsError>;

    fn set(&self, key: SettingsKey, value: &Utf8Path) -> Result<(), SettingsError>;

    fn unset(&self, key: SettingsKey) -> Result<(), SettingsError>;

    fn load(&self) -> Result<Settings, SettingsError> {
        let mut settings = Settings::default();
        for key in SettingsKey::ALL {
            settings.set(key, self.get(key)?);
        }
        Ok(settings)
    }
}

impl<T: SettingsStore + ?Sized> SettingsStore for std::sync::Arc<T> {
    fn get(&self, key: SettingsKey) -> Result<Option<Utf8PathBuf>, SettingsError> {
        (**self).get(key)
    }

    fn set(&self, key: SettingsKey, value: &Utf8Path) -> Result<(), SettingsError> {
        (**self).set(key, value)
    }

    fn unset(&self, key: SettingsKey) -> Result<(), SettingsError> {
        (**self).unset(key)
    }

    fn load(&self) -> Result<Settings, SettingsError> {
        (**self).load()
    }
}
