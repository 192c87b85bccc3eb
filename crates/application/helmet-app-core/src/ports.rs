use camino::Utf8PathBuf;
use helmet_core::{EndpointKind, ProcessError, ScenarioDescriptor};
use helmet_infra::BoxTransport;

use crate::coordinator::RelayError;
use crate::worker::EngineLog;

#[async_trait::async_trait]
pub trait ScenarioEngine: Send + Sync + 'static {
    /// Runs one scenario to completion. Dropping the future must stop the work.
    async fn run_scenario(
        &self,
        scenario: &ScenarioDescriptor,
        log: &EngineLog,
    ) -> anyhow::Result<()>;
}

pub trait EngineLocator: Send + Sync + 'static {
    fn locate(&self) -> anyhow::Result<Utf8PathBuf>;
}

pub trait OperatorPrompt {
    fn confirm(&self, message: &str) -> bool;
    fn notify(&self, message: &str);
}

/// Operational log for failures that are not shown to the operator: engine errors and
/// messages the relay could not deliver.
pub trait ErrorSink: Send + 'static {
    fn process_error(&self, error: &ProcessError);
    fn relay_failed(&self, error: &RelayError);
}

pub struct LaunchedEndpoint {
    pub transport: BoxTransport,
    /// Owning handle of the endpoint's OS process, when there is one.
    pub process: Option<tokio::process::Child>,
}

#[async_trait::async_trait]
pub trait EndpointLauncher: Send {
    async fn launch(&mut self, kind: EndpointKind) -> std::io::Result<LaunchedEndpoint>;
}

impl EngineLocator for helmet_infra::EmmePythonLocator {
    fn locate(&self) -> anyhow::Result<Utf8PathBuf> {
        Ok(helmet_infra::EmmePythonLocator::locate(self)?)
    }
}
