pub mod coordinator;
pub mod engine;
pub mod ports;
pub mod project;
pub mod settings;
pub mod ui;
pub mod worker;

pub use coordinator::{
    Coordinator, CoordinatorError, CoordinatorOptions, RelayError, ShutdownReason,
    TracingErrorSink,
};
pub use engine::HelmetEngine;
pub use ports::*;
pub use settings::{ensure_engine_path, DiscoveryOutcome};
pub use ui::{UiError, UiSession};
pub use worker::{EngineLog, WorkerRuntime};
