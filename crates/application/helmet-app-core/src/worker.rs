//! Worker side of the relay: owns the run lifecycle and drives the engine.
//!
//! Commands are handled on the endpoint loop. A run cycle executes on its own task and
//! reports back through a progress channel tagged with the cycle id, so the loop stays
//! responsive to a cancel while a scenario is still in the engine. A cancel waits for the
//! cycle's task to stop before the next command is read. Progress from a cycle that is no
//! longer running is dropped.

use std::sync::Arc;

use futures::{Sink, SinkExt, Stream, StreamExt};
use helmet_core::{
    CycleEnd, LogEntry, ProcessError, RunCycleId, RunLifecycle, RunState, ScenarioDescriptor,
    WorkerCommand, WorkerEvent,
};
use helmet_infra::{MalformedFrame, TransportError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ports::ScenarioEngine;

/// Per-scenario log channel handed to the engine.
pub struct EngineLog {
    scenario: String,
    emit: Box<dyn Fn(LogEntry) + Send + Sync>,
}

impl EngineLog {
    pub fn new(scenario: impl Into<String>, emit: impl Fn(LogEntry) + Send + Sync + 'static) -> Self {
        Self {
            scenario: scenario.into(),
            emit: Box::new(emit),
        }
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn emit(&self, entry: LogEntry) {
        (self.emit)(entry.for_scenario(self.scenario.clone()));
    }
}

#[derive(Debug)]
enum Progress {
    Log {
        cycle: RunCycleId,
        entry: LogEntry,
    },
    Failed {
        cycle: RunCycleId,
        error: ProcessError,
    },
    ScenarioDone {
        cycle: RunCycleId,
        scenario: ScenarioDescriptor,
    },
    CycleEnded {
        cycle: RunCycleId,
    },
}

pub struct WorkerRuntime<E> {
    engine: Arc<E>,
    lifecycle: RunLifecycle,
    cycle: Option<(CancellationToken, JoinHandle<()>)>,
    progress_tx: mpsc::UnboundedSender<Progress>,
    progress_rx: mpsc::UnboundedReceiver<Progress>,
}

impl<E: ScenarioEngine> WorkerRuntime<E> {
    pub fn new(engine: E) -> Self {
        Self::from_shared(Arc::new(engine))
    }

    pub fn from_shared(engine: Arc<E>) -> Self {
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        Self {
            engine,
            lifecycle: RunLifecycle::new(),
            cycle: None,
            progress_tx,
            progress_rx,
        }
    }

    pub fn state(&self) -> &RunState {
        self.lifecycle.state()
    }

    /// Serves the coordinator connection until it closes.
    ///
    /// A running cycle is interrupted when the connection goes away.
    pub async fn serve<C, S>(mut self, mut commands: C, mut events: S) -> Result<(), TransportError>
    where
        C: Stream<Item = Result<Result<WorkerCommand, MalformedFrame>, TransportError>> + Unpin,
        S: Sink<WorkerEvent, Error = TransportError> + Unpin,
    {
        info!("worker ready");
        let result = loop {
            tokio::select! {
                frame = commands.next() => match frame {
                    Some(Ok(Ok(command))) => {
                        if let Err(e) = self.apply(command, &mut events).await {
                            break Err(e);
                        }
                    }
                    Some(Ok(Err(bad))) => {
                        warn!(error = %bad, "ignoring malformed command");
                        let error = ProcessError::new(format!("Ignored malformed command: {bad}"));
                        if let Err(e) = events.send(WorkerEvent::ProcessError(error)).await {
                            break Err(e);
                        }
                    }
                    Some(Err(e)) => break Err(e),
                    None => {
                        info!("coordinator closed the connection");
                        break Ok(());
                    }
                },
                Some(progress) = self.progress_rx.recv() => {
                    if let Err(e) = self.on_progress(progress, &mut events).await {
                        break Err(e);
                    }
                }
            }
        };

        self.stop_cycle().await;
        result
    }

    /// Interrupts the cycle task, if any, and waits until it has dropped the engine.
    async fn stop_cycle(&mut self) {
        if let Some((token, task)) = self.cycle.take() {
            token.cancel();
            if let Err(e) = task.await {
                warn!(error = %e, "run cycle task did not stop cleanly");
            }
        }
    }

    async fn apply<S>(&mut self, command: WorkerCommand, events: &mut S) -> Result<(), TransportError>
    where
        S: Sink<WorkerEvent, Error = TransportError> + Unpin,
    {
        match command {
            WorkerCommand::RunScenarios(scenarios) => match self.lifecycle.start(scenarios.len()) {
                Ok(cycle) => {
                    info!(%cycle, scenarios = scenarios.len(), "run cycle started");
                    let token = CancellationToken::new();
                    let task = tokio::spawn(run_cycle(
                        self.engine.clone(),
                        cycle,
                        scenarios,
                        token.clone(),
                        self.progress_tx.clone(),
                    ));
                    self.cycle = Some((token, task));
                }
                Err(e) => {
                    warn!(error = %e, "rejecting run request");
                    let entry = LogEntry::warn(format!("Run request ignored: {e}"));
                    events.send(WorkerEvent::LoggableEvent(entry)).await?;
                }
            },
            WorkerCommand::CancelScenarios => match self.lifecycle.cancel() {
                Some(cycle) => {
                    info!(%cycle, "cancelling run cycle");
                    self.stop_cycle().await;
                    match self.lifecycle.finish(cycle) {
                        Ok(_) => info!(%cycle, "run cycle interrupted"),
                        Err(e) => warn!(error = %e, "cancelled cycle was already finished"),
                    }
                }
                None => debug!(state = self.lifecycle.state().name(), "nothing to cancel"),
            },
        }
        Ok(())
    }

    async fn on_progress<S>(&mut self, progress: Progress, events: &mut S) -> Result<(), TransportError>
    where
        S: Sink<WorkerEvent, Error = TransportError> + Unpin,
    {
        match progress {
            Progress::Log { cycle, entry } => {
                if self.lifecycle.running_cycle() == Some(cycle) {
                    events.send(WorkerEvent::LoggableEvent(entry)).await?;
                }
            }
            Progress::Failed { cycle, error } => {
                if self.lifecycle.running_cycle() == Some(cycle) {
                    warn!(scenario = error.scenario.as_deref(), "{}", error.message);
                    events.send(WorkerEvent::ProcessError(error)).await?;
                }
            }
            Progress::ScenarioDone { cycle, scenario } => {
                match self.lifecycle.scenario_finished(cycle) {
                    Ok(completed) => {
                        let total = self.lifecycle.progress().map_or(completed, |(_, total)| total);
                        info!(scenario = %scenario.name, "scenario finished ({completed} of {total})");
                        events.send(WorkerEvent::ScenarioComplete(scenario)).await?;
                    }
                    Err(e) => debug!(error = %e, scenario = %scenario.name, "dropping stale completion"),
                }
            }
            Progress::CycleEnded { cycle } => match self.lifecycle.finish(cycle) {
                Ok(CycleEnd::Completed) => {
                    self.cycle = None;
                    info!(%cycle, "run cycle completed");
                    events.send(WorkerEvent::AllScenariosComplete).await?;
                }
                Ok(CycleEnd::Cancelled) => debug!(%cycle, "cancelled cycle wound down"),
                Err(e) => debug!(error = %e, "dropping stale cycle end"),
            },
        }
        Ok(())
    }
}

async fn run_cycle<E: ScenarioEngine>(
    engine: Arc<E>,
    cycle: RunCycleId,
    scenarios: Vec<ScenarioDescriptor>,
    token: CancellationToken,
    progress: mpsc::UnboundedSender<Progress>,
) {
    for scenario in scenarios {
        if token.is_cancelled() {
            break;
        }

        let tx = progress.clone();
        let log = EngineLog::new(scenario.name.clone(), move |entry| {
            let _ = tx.send(Progress::Log { cycle, entry });
        });

        debug!(scenario = %scenario.name, "starting scenario");
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            outcome = engine.run_scenario(&scenario, &log) => outcome,
        };

        if let Err(e) = outcome {
            let error = ProcessError::new(format!("{e:#}")).for_scenario(scenario.name.clone());
            let _ = progress.send(Progress::Failed { cycle, error });
        }
        let _ = progress.send(Progress::ScenarioDone { cycle, scenario });
    }

    let _ = progress.send(Progress::CycleEnded { cycle });
}
