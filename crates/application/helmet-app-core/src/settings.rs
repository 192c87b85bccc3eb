use camino::Utf8PathBuf;
use helmet_config::{EMME_PYTHON_VERSION, EMME_SYSTEM_VERSION};
use helmet_core::SettingsKey;
use helmet_persistence::{SettingsError, SettingsStore};
use tracing::{debug, info};

use crate::ports::{EngineLocator, OperatorPrompt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    AlreadyConfigured,
    Accepted(Utf8PathBuf),
    Declined(Utf8PathBuf),
    NotFound,
}

/// First-start check for the Emme Python location.
///
/// When the setting is empty the default install location is probed and the operator is
/// asked before anything is written.
pub fn ensure_engine_path<S, L, P>(
    store: &S,
    locator: &L,
    prompt: &P,
) -> Result<DiscoveryOutcome, SettingsError>
where
    S: SettingsStore + ?Sized,
    L: EngineLocator + ?Sized,
    P: OperatorPrompt + ?Sized,
{
    if store.get(SettingsKey::EmmePythonPath)?.is_some() {
        return Ok(DiscoveryOutcome::AlreadyConfigured);
    }

    match locator.locate() {
        Ok(path) => {
            let question =
                format!("Python {EMME_PYTHON_VERSION} was found at:\n\n{path}\n\nUse this location?");
            if prompt.confirm(&question) {
                store.set(SettingsKey::EmmePythonPath, &path)?;
                info!(%path, "emme python location saved");
                Ok(DiscoveryOutcome::Accepted(path))
            } else {
                info!(%path, "emme python location declined");
                Ok(DiscoveryOutcome::Declined(path))
            }
        }
        Err(e) => {
            debug!(error = %e, "emme python not found");
            prompt.notify(&format!(
                "Emme {EMME_SYSTEM_VERSION} with Python {EMME_PYTHON_VERSION} was not found in \
                 the default location.\n\nSet the {} location in Settings.",
                SettingsKey::EmmePythonPath.label()
            ));
            Ok(DiscoveryOutcome::NotFound)
        }
    }
}
