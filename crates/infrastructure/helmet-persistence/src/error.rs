use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("could not determine a config directory for settings")]
    NoConfigDir,
    #[error("settings file {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("settings file {} does not hold a JSON object", path.display())]
    NotAnObject { path: PathBuf },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsErrorKind {
    NoConfigDir,
    Corrupt,
    Io,
    Codec,
}

impl SettingsError {
    pub fn kind(&self) -> SettingsErrorKind {
        match self {
            SettingsError::NoConfigDir => SettingsErrorKind::NoConfigDir,
            SettingsError::Corrupt { .. } | SettingsError::NotAnObject { .. } => {
                SettingsErrorKind::Corrupt
            }
            SettingsError::Io(_) => SettingsErrorKind::Io,
            SettingsError::Serde(_) => SettingsErrorKind::Codec,
        }
    }
}
