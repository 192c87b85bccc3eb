use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};

/// The three recognised settings. Anything else in the store is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingsKey {
    EmmePythonPath,
    HelmetScriptsPath,
    ProjectPath,
}

impl SettingsKey {
    pub const ALL: [SettingsKey; 3] = [
        SettingsKey::EmmePythonPath,
        SettingsKey::HelmetScriptsPath,
        SettingsKey::ProjectPath,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingsKey::EmmePythonPath => "emme_python_path",
            SettingsKey::HelmetScriptsPath => "helmet_scripts_path",
            SettingsKey::ProjectPath => "project_path",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SettingsKey::EmmePythonPath => "Emme Python",
            SettingsKey::HelmetScriptsPath => "Helmet scripts",
            SettingsKey::ProjectPath => "Project folder",
        }
    }
}

impl fmt::Display for SettingsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown settings key '{0}'")]
pub struct UnknownSettingsKey(pub String);

impl FromStr for SettingsKey {
    type Err = UnknownSettingsKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SettingsKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownSettingsKey(s.to_string()))
    }
}

/// Snapshot of the persisted settings, one field per key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub emme_python_path: Option<Utf8PathBuf>,
    pub helmet_scripts_path: Option<Utf8PathBuf>,
    pub project_path: Option<Utf8PathBuf>,
}

impl Settings {
    pub fn get(&self, key: SettingsKey) -> Option<&Utf8Path> {
        self.slot(key).as_deref()
    }

    pub fn set(&mut self, key: SettingsKey, value: Option<Utf8PathBuf>) {
        *self.slot_mut(key) = value;
    }

    /// Project folder, falling back to `home` when unset.
    pub fn project_path_or(&self, home: &Utf8Path) -> Utf8PathBuf {
        self.project_path
            .clone()
            .unwrap_or_else(|| home.to_path_buf())
    }

    /// Keys required before a run can be started, in display order.
    pub fn missing_for_run(&self) -> Vec<SettingsKey> {
        [SettingsKey::EmmePythonPath, SettingsKey::HelmetScriptsPath]
            .into_iter()
            .filter(|k| self.get(*k).is_none())
            .collect()
    }

    fn slot(&self, key: SettingsKey) -> &Option<Utf8PathBuf> {
        match key {
            SettingsKey::EmmePythonPath => &self.emme_python_path,
            SettingsKey::HelmetScriptsPath => &self.helmet_scripts_path,
            SettingsKey::ProjectPath => &self.project_path,
        }
    }

    fn slot_mut(&mut self, key: SettingsKey) -> &mut Option<Utf8PathBuf> {
        match key {
            SettingsKey::EmmePythonPath => &mut self.emme_python_path,
            SettingsKey::HelmetScriptsPath => &mut self.helmet_scripts_path,
            SettingsKey::ProjectPath => &mut self.project_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_parse_from_their_persisted_names() {
        for key in SettingsKey::ALL {
            assert_eq!(key.as_str().parse::<SettingsKey>(), Ok(key));
        }
        assert!("emme_path".parse::<SettingsKey>().is_err());
    }

    #[test]
    fn project_path_defaults_to_home() {
        let mut s = Settings::default();
        let home = Utf8Path::new("/home/alice");
        assert_eq!(s.project_path_or(home), home);

        s.set(SettingsKey::ProjectPath, Some("/home/alice/proj".into()));
        assert_eq!(s.project_path_or(home), Utf8Path::new("/home/alice/proj"));
    }

    #[test]
    fn run_needs_python_and_scripts() {
        let mut s = Settings::default();
        s.set(SettingsKey::HelmetScriptsPath, Some("C:/helmet/scripts".into()));
        assert_eq!(s.missing_for_run(), vec![SettingsKey::EmmePythonPath]);
        s.set(SettingsKey::EmmePythonPath, Some("C:/emme/python.exe".into()));
        assert!(s.missing_for_run().is_empty());
    }
}
