//! Locates the Python interpreter bundled with Emme.

mod platform;

use camino::{Utf8Path, Utf8PathBuf};
use helmet_config::{EMMEPATH_ENV, EMME_PYTHON_VERSION, EMME_SYSTEM_VERSION};

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error(
        "Emme {} Python {} not found (searched {} locations)",
        EMME_SYSTEM_VERSION,
        EMME_PYTHON_VERSION,
        .searched.len()
    )]
    NotFound { searched: Vec<Utf8PathBuf> },
}

pub struct EmmePythonLocator {
    emme_path: Option<Utf8PathBuf>,
    install_roots: Vec<Utf8PathBuf>,
}

impl EmmePythonLocator {
    pub fn new(emme_path: Option<Utf8PathBuf>, install_roots: Vec<Utf8PathBuf>) -> Self {
        Self {
            emme_path,
            install_roots,
        }
    }

    /// `EMMEPATH` first, then the installer's default locations.
    pub fn from_env() -> Self {
        let emme_path = std::env::var(EMMEPATH_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(Utf8PathBuf::from);
        Self::new(emme_path, platform::default_install_roots())
    }

    pub fn candidates(&self) -> Vec<Utf8PathBuf> {
        let release_dir = format!("Emme-{EMME_SYSTEM_VERSION}");
        self.emme_path
            .iter()
            .map(|p| python_in(p))
            .chain(
                self.install_roots
                    .iter()
                    .map(|root| python_in(&root.join(&release_dir))),
            )
            .collect()
    }

    pub fn locate(&self) -> Result<Utf8PathBuf, DiscoveryError> {
        let searched = self.candidates();
        match searched.iter().find(|p| p.is_file()) {
            Some(found) => {
                tracing::info!(path = %found, "found Emme Python");
                Ok(found.clone())
            }
            None => {
                tracing::warn!(searched = ?searched, "Emme Python not found");
                Err(DiscoveryError::NotFound { searched })
            }
        }
    }
}

fn python_in(emme_dir: &Utf8Path) -> Utf8PathBuf {
    let python_dir = format!("Python{}", EMME_PYTHON_VERSION.replace('.', ""));
    emme_dir.join(python_dir).join(platform::PYTHON_EXECUTABLE)
}
