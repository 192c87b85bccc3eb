//! Typed frames exchanged between the coordinator and its two endpoints.
//!
//! Each direction has its own closed enum. On the wire a frame is one JSON object
//! per line, tagged by `channel` with the body under `payload`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::log::{LogEntry, ProcessError};
use crate::scenario::ScenarioDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    Ui,
    Worker,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointKind::Ui => f.write_str("ui"),
            EndpointKind::Worker => f.write_str("worker"),
        }
    }
}

/// First frame an endpoint sends, once its interface is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ready {
    pub role: EndpointKind,
    pub pid: u32,
}

impl Ready {
    pub fn current(role: EndpointKind) -> Self {
        Self {
            role,
            pid: std::process::id(),
        }
    }
}

/// UI -> coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload", rename_all = "kebab-case")]
pub enum UiRequest {
    RunScenarios(Vec<ScenarioDescriptor>),
    CancelScenarios,
}

/// Coordinator -> worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload", rename_all = "kebab-case")]
pub enum WorkerCommand {
    RunScenarios(Vec<ScenarioDescriptor>),
    CancelScenarios,
}

/// Worker -> coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload", rename_all = "kebab-case")]
pub enum WorkerEvent {
    ScenarioComplete(ScenarioDescriptor),
    AllScenariosComplete,
    LoggableEvent(LogEntry),
    ProcessError(ProcessError),
}

/// Coordinator -> UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload", rename_all = "kebab-case")]
pub enum UiEvent {
    ScenarioComplete(ScenarioDescriptor),
    AllScenariosComplete,
    LoggableEvent(LogEntry),
}

/// Where a worker event ends up once it crosses the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEventRoute {
    Ui(UiEvent),
    ErrorSink(ProcessError),
}

impl UiRequest {
    pub fn channel(&self) -> &'static str {
        match self {
            UiRequest::RunScenarios(_) => "run-scenarios",
            UiRequest::CancelScenarios => "cancel-scenarios",
        }
    }
}

impl WorkerCommand {
    pub fn channel(&self) -> &'static str {
        match self {
            WorkerCommand::RunScenarios(_) => "run-scenarios",
            WorkerCommand::CancelScenarios => "cancel-scenarios",
        }
    }
}

impl WorkerEvent {
    pub fn channel(&self) -> &'static str {
        match self {
            WorkerEvent::ScenarioComplete(_) => "scenario-complete",
            WorkerEvent::AllScenariosComplete => "all-scenarios-complete",
            WorkerEvent::LoggableEvent(_) => "loggable-event",
            WorkerEvent::ProcessError(_) => "process-error",
        }
    }

    /// Process errors stay on the coordinator; everything else is forwarded unchanged.
    pub fn route(self) -> WorkerEventRoute {
        match self {
            WorkerEvent::ScenarioComplete(s) => WorkerEventRoute::Ui(UiEvent::ScenarioComplete(s)),
            WorkerEvent::AllScenariosComplete => {
                WorkerEventRoute::Ui(UiEvent::AllScenariosComplete)
            }
            WorkerEvent::LoggableEvent(e) => WorkerEventRoute::Ui(UiEvent::LoggableEvent(e)),
            WorkerEvent::ProcessError(e) => WorkerEventRoute::ErrorSink(e),
        }
    }
}

impl UiEvent {
    pub fn channel(&self) -> &'static str {
        match self {
            UiEvent::ScenarioComplete(_) => "scenario-complete",
            UiEvent::AllScenariosComplete => "all-scenarios-complete",
            UiEvent::LoggableEvent(_) => "loggable-event",
        }
    }
}

impl From<UiRequest> for WorkerCommand {
    fn from(value: UiRequest) -> Self {
        match value {
            UiRequest::RunScenarios(list) => WorkerCommand::RunScenarios(list),
            UiRequest::CancelScenarios => WorkerCommand::CancelScenarios,
        }
    }
}
