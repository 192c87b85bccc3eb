use helmet_core::{LogEntry, LogLevel};
use serde::Deserialize;

/// One line written by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOutput {
    Stdout(String),
    Stderr(String),
}

/// Shape of a structured log line (`--log-format JSON`).
#[derive(Deserialize)]
struct StructuredLine {
    level: String,
    message: String,
}

impl EngineOutput {
    /// Structured stdout lines keep their level; other stdout is info, stderr is error.
    pub fn into_log_entry(self) -> LogEntry {
        match self {
            EngineOutput::Stdout(line) => match serde_json::from_str::<StructuredLine>(&line) {
                Ok(parsed) => LogEntry::new(
                    LogLevel::parse_lenient(&parsed.level).unwrap_or(LogLevel::Info),
                    parsed.message,
                ),
                Err(_) => LogEntry::info(line),
            },
            EngineOutput::Stderr(line) => LogEntry::error(line),
        }
    }
}
