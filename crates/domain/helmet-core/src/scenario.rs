use serde::{Deserialize, Serialize};

/// Identifies one run cycle (one accepted run-scenarios command).
pub type RunCycleId = uuid::Uuid;

/// One unit of simulation work.
///
/// `config` is handed to the engine untouched; nothing on the coordination path looks
/// inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDescriptor {
    pub name: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

impl ScenarioDescriptor {
    pub fn new(name: impl Into<String>, config: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, serde_json::Value::Null)
    }
}
