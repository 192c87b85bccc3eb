//! Central configuration constants for runtime limits and defaults.

/// Directory qualifiers handed to `directories::ProjectDirs`.
pub const APP_QUALIFIER: &str = "fi";
pub const APP_ORGANIZATION: &str = "hsl";
pub const APP_NAME: &str = "helmet-ui";

/// File holding the persisted settings, inside the platform config directory.
pub const SETTINGS_FILE_NAME: &str = "config.json";

/// Environment variable overriding the settings file location.
pub const SETTINGS_FILE_ENV: &str = "HELMET_SETTINGS";

/// How long each endpoint gets to connect and report ready during startup.
pub const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 30;

/// Minimum allowed startup timeout.
pub const MIN_STARTUP_TIMEOUT_SECS: u64 = 1;

/// Maximum allowed startup timeout.
pub const MAX_STARTUP_TIMEOUT_SECS: u64 = 600;

/// How long a released endpoint process may take to exit before it is killed.
pub const DEFAULT_ENDPOINT_EXIT_GRACE_MS: u64 = 3000;

/// Capacity of the coordinator's inbound queue (frames read from both endpoints).
pub const INBOUND_QUEUE_CAPACITY: usize = 100;

/// Longest single frame accepted on an endpoint connection. 8 MiB.
pub const MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

/// Entry point of the HELMET model-system scripts, relative to the scripts folder.
pub const HELMET_ENTRY_SCRIPT: &str = "helmet.py";

/// Emme release whose bundled Python is searched for at first start.
pub const EMME_SYSTEM_VERSION: &str = "4.4.2";

/// Python version bundled with `EMME_SYSTEM_VERSION`.
pub const EMME_PYTHON_VERSION: &str = "3.7";

/// Environment variable set by the Emme installer.
pub const EMMEPATH_ENV: &str = "EMMEPATH";

/// Convenience function to clamp a startup timeout into allowed range.
pub fn clamp_startup_timeout_secs(v: u64) -> u64 {
    v.clamp(MIN_STARTUP_TIMEOUT_SECS, MAX_STARTUP_TIMEOUT_SECS)
}
