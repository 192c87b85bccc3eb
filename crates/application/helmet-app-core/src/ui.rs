//! Operator-facing session state: what is running, what has finished, what was logged.

use camino::{Utf8Path, Utf8PathBuf};
use helmet_core::{LogEntry, ScenarioDescriptor, Settings, SettingsKey, UiEvent, UiRequest};
use helmet_persistence::{SettingsError, SettingsStore};

#[derive(Debug, thiserror::Error)]
pub enum UiError {
    #[error("scenarios are already running")]
    AlreadyRunning,
    #[error("no scenarios selected")]
    NoScenarios,
    #[error("set {} in Settings before running scenarios", labels(.0))]
    MissingSettings(Vec<SettingsKey>),
    #[error("settings cannot be changed while scenarios are running")]
    SettingsLocked,
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

fn labels(keys: &[SettingsKey]) -> String {
    keys.iter()
        .map(|k| k.label())
        .collect::<Vec<_>>()
        .join(" and ")
}

pub struct UiSession {
    settings: Settings,
    home: Utf8PathBuf,
    running: bool,
    pending: Vec<String>,
    completed: Vec<String>,
    log: Vec<LogEntry>,
}

impl UiSession {
    pub fn new(settings: Settings, home: impl Into<Utf8PathBuf>) -> Self {
        Self {
            settings,
            home: home.into(),
            running: false,
            pending: Vec::new(),
            completed: Vec::new(),
            log: Vec::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn project_path(&self) -> Utf8PathBuf {
        self.settings.project_path_or(&self.home)
    }

    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    pub fn completed(&self) -> &[String] {
        &self.completed
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// Validates a run locally and returns the request to send.
    pub fn request_run(&mut self, scenarios: Vec<ScenarioDescriptor>) -> Result<UiRequest, UiError> {
        if self.running {
            return Err(UiError::AlreadyRunning);
        }
        if scenarios.is_empty() {
            return Err(UiError::NoScenarios);
        }
        let missing = self.settings.missing_for_run();
        if !missing.is_empty() {
            return Err(UiError::MissingSettings(missing));
        }

        self.running = true;
        self.pending = scenarios.iter().map(|s| s.name.clone()).collect();
        self.completed.clear();
        Ok(UiRequest::RunScenarios(scenarios))
    }

    /// Returns the cancel request when something is running. The session is idle again
    /// right away; the worker reports nothing further for the cancelled cycle.
    pub fn request_cancel(&mut self) -> Option<UiRequest> {
        if !self.running {
            return None;
        }
        self.running = false;
        self.pending.clear();
        Some(UiRequest::CancelScenarios)
    }

    pub fn apply(&mut self, event: &UiEvent) {
        match event {
            UiEvent::ScenarioComplete(scenario) => {
                self.pending.retain(|name| name != &scenario.name);
                self.completed.push(scenario.name.clone());
            }
            UiEvent::AllScenariosComplete => {
                self.running = false;
                self.pending.clear();
            }
            UiEvent::LoggableEvent(entry) => self.log.push(entry.clone()),
        }
    }

    /// Persists a setting and refreshes the local snapshot. `None` clears the key.
    pub fn update_setting<S>(
        &mut self,
        store: &S,
        key: SettingsKey,
        value: Option<&Utf8Path>,
    ) -> Result<(), UiError>
    where
        S: SettingsStore + ?Sized,
    {
        if self.running {
            return Err(UiError::SettingsLocked);
        }
        match value {
            Some(path) => store.set(key, path)?,
            None => store.unset(key)?,
        }
        self.settings.set(key, value.map(Utf8Path::to_path_buf));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Settings {
        let mut settings = Settings::default();
        settings.set(SettingsKey::EmmePythonPath, Some("/emme/python".into()));
        settings.set(SettingsKey::HelmetScriptsPath, Some("/helmet/scripts".into()));
        settings
    }

    #[test]
    fn run_requires_both_engine_settings() {
        let mut session = UiSession::new(Settings::default(), "/home/op");
        let err = session
            .request_run(vec![ScenarioDescriptor::named("a")])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "set Emme Python and Helmet scripts in Settings before running scenarios"
        );
        assert!(!session.is_running());
    }

    #[test]
    fn run_then_events_return_the_session_to_idle() {
        let mut session = UiSession::new(configured(), "/home/op");
        let request = session
            .request_run(vec![ScenarioDescriptor::named("a"), ScenarioDescriptor::named("b")])
            .unwrap();
        assert_eq!(request.channel(), "run-scenarios");
        assert!(matches!(
            session.request_run(vec![ScenarioDescriptor::named("c")]),
            Err(UiError::AlreadyRunning)
        ));

        session.apply(&UiEvent::ScenarioComplete(ScenarioDescriptor::named("a")));
        assert_eq!(session.pending(), ["b"]);
        session.apply(&UiEvent::ScenarioComplete(ScenarioDescriptor::named("b")));
        session.apply(&UiEvent::AllScenariosComplete);
        assert!(!session.is_running());
        assert_eq!(session.completed(), ["a", "b"]);
    }

    #[test]
    fn cancel_only_when_running() {
        let mut session = UiSession::new(configured(), "/home/op");
        assert!(session.request_cancel().is_none());
        session
            .request_run(vec![ScenarioDescriptor::named("a")])
            .unwrap();
        assert_eq!(session.request_cancel(), Some(UiRequest::CancelScenarios));
        assert!(!session.is_running());
    }

    #[test]
    fn project_folder_falls_back_to_home() {
        let session = UiSession::new(Settings::default(), "/home/op");
        assert_eq!(session.project_path(), Utf8Path::new("/home/op"));
    }

    #[test]
    fn settings_are_locked_during_a_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = helmet_persistence::JsonSettingsStore::new(dir.path().join("config.json"));
        let mut session = UiSession::new(configured(), "/home/op");

        session
            .update_setting(&store, SettingsKey::ProjectPath, Some(Utf8Path::new("/proj")))
            .unwrap();
        assert_eq!(session.project_path(), Utf8Path::new("/proj"));
        assert_eq!(
            store.get(SettingsKey::ProjectPath).unwrap().as_deref(),
            Some(Utf8Path::new("/proj"))
        );

        session
            .request_run(vec![ScenarioDescriptor::named("a")])
            .unwrap();
        assert!(matches!(
            session.update_setting(&store, SettingsKey::ProjectPath, None),
            Err(UiError::SettingsLocked)
        ));
    }
}
