use anyhow::Context;
use helmet_core::{ScenarioDescriptor, SettingsKey};
use helmet_infra::{run_engine, EngineCommand, EngineError};
use helmet_persistence::SettingsStore;

use crate::ports::ScenarioEngine;
use crate::worker::EngineLog;

/// Runs scenarios through the Helmet model system scripts on the Emme Python.
///
/// Settings are read per scenario so a path changed between runs is picked up.
pub struct HelmetEngine<S> {
    settings: S,
}

impl<S: SettingsStore> HelmetEngine<S> {
    pub fn new(settings: S) -> Self {
        Self { settings }
    }

    fn command_for(&self, scenario: &ScenarioDescriptor) -> anyhow::Result<EngineCommand> {
        let settings = self.settings.load().context("failed to read settings")?;
        let python = settings
            .emme_python_path
            .ok_or(EngineError::NotConfigured(SettingsKey::EmmePythonPath))?;
        let scripts = settings
            .helmet_scripts_path
            .ok_or(EngineError::NotConfigured(SettingsKey::HelmetScriptsPath))?;

        let cmd = EngineCommand::resolve(&python, &scripts, &scenario.name)?;
        cmd.check_entry_script()?;
        Ok(cmd)
    }
}

#[async_trait::async_trait]
impl<S: SettingsStore> ScenarioEngine for HelmetEngine<S> {
    async fn run_scenario(
        &self,
        scenario: &ScenarioDescriptor,
        log: &EngineLog,
    ) -> anyhow::Result<()> {
        let cmd = self.command_for(scenario)?;
        let payload = serde_json::to_vec(&scenario.config).map_err(EngineError::from)?;
        run_engine(&cmd, payload, |out| log.emit(out.into_log_entry()))
            .await
            .with_context(|| format!("scenario '{}' failed", scenario.name))
    }
}
