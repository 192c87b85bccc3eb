pub mod lifecycle;
pub mod log;
pub mod protocol;
pub mod scenario;
pub mod settings;

pub use lifecycle::{CycleEnd, LifecycleError, RunLifecycle, RunState};
pub use log::{LogEntry, LogLevel, ProcessError};
pub use protocol::{EndpointKind, Ready, UiEvent, UiRequest, WorkerCommand, WorkerEvent, WorkerEventRoute};
pub use scenario::{RunCycleId, ScenarioDescriptor};
pub use settings::{Settings, SettingsKey, UnknownSettingsKey};
