use std::path::PathBuf;

use camino::Utf8Path;
use helmet_config::HELMET_ENTRY_SCRIPT;
use helmet_core::SettingsKey;

use super::EngineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl EngineCommand {
    /// `<python> <scripts>/helmet.py --log-format JSON --scenario-name <name>`, run from
    /// the scripts folder. The scenario config itself goes in on stdin.
    pub fn resolve(
        python: &Utf8Path,
        scripts_dir: &Utf8Path,
        scenario_name: &str,
    ) -> Result<Self, EngineError> {
        if python.as_str().trim().is_empty() {
            return Err(EngineError::NotConfigured(SettingsKey::EmmePythonPath));
        }
        if scripts_dir.as_str().trim().is_empty() {
            return Err(EngineError::NotConfigured(SettingsKey::HelmetScriptsPath));
        }

        let script = scripts_dir.join(HELMET_ENTRY_SCRIPT);
        Ok(Self {
            program: python.to_string(),
            args: vec![
                script.to_string(),
                "--log-format".into(),
                "JSON".into(),
                "--scenario-name".into(),
                scenario_name.to_string(),
            ],
            working_dir: scripts_dir.as_std_path().to_path_buf(),
        })
    }

    /// Fails early when the entry script is not where the scripts folder says it is.
    pub fn check_entry_script(&self) -> Result<(), EngineError> {
        let script = self.working_dir.join(HELMET_ENTRY_SCRIPT);
        if script.is_file() {
            Ok(())
        } else {
            Err(EngineError::MissingScript(
                camino::Utf8PathBuf::from_path_buf(script)
                    .unwrap_or_else(|p| p.to_string_lossy().into_owned().into()),
            ))
        }
    }
}
