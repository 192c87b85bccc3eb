use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use helmet_app_core::{
    Coordinator, CoordinatorOptions, EndpointLauncher, EngineLog, ErrorSink, LaunchedEndpoint,
    RelayError, ScenarioEngine, ShutdownReason, WorkerRuntime,
};
use helmet_core::{
    EndpointKind, LogEntry, LogLevel, ProcessError, ScenarioDescriptor, UiEvent, UiRequest,
    WorkerCommand,
};
use helmet_infra::{announce, framed, FramedEndpoint};
use tokio::io::DuplexStream;
use tokio::task::JoinHandle;

#[derive(Clone, Copy)]
enum Step {
    Finish,
    Fail(&'static str),
    Log(&'static str),
    Hang,
}

struct ScriptedEngine {
    steps: HashMap<&'static str, Step>,
}

impl ScriptedEngine {
    fn new(steps: &[(&'static str, Step)]) -> Self {
        Self {
            steps: steps.iter().copied().collect(),
        }
    }
}

#[async_trait]
impl ScenarioEngine for ScriptedEngine {
    async fn run_scenario(
        &self,
        scenario: &ScenarioDescriptor,
        log: &EngineLog,
    ) -> anyhow::Result<()> {
        match self.steps.get(scenario.name.as_str()).copied().unwrap_or(Step::Finish) {
            Step::Finish => Ok(()),
            Step::Fail(msg) => anyhow::bail!(msg),
            Step::Log(msg) => {
                log.emit(LogEntry::new(LogLevel::Warn, msg));
                Ok(())
            }
            Step::Hang => std::future::pending().await,
        }
    }
}

#[derive(Clone, Default)]
struct CapturingSink(Arc<Mutex<Vec<ProcessError>>>, Arc<Mutex<Vec<RelayError>>>);

impl ErrorSink for CapturingSink {
    fn process_error(&self, error: &ProcessError) {
        self.0.lock().unwrap().push(error.clone());
    }

    fn relay_failed(&self, error: &RelayError) {
        self.1.lock().unwrap().push(error.clone());
    }
}

struct DuplexLauncher {
    ends: HashMap<EndpointKind, DuplexStream>,
}

#[async_trait]
impl EndpointLauncher for DuplexLauncher {
    async fn launch(&mut self, kind: EndpointKind) -> std::io::Result<LaunchedEndpoint> {
        let io = self
            .ends
            .remove(&kind)
            .ok_or_else(|| std::io::Error::other(format!("no {kind} endpoint")))?;
        Ok(LaunchedEndpoint {
            transport: Box::new(io),
            process: None,
        })
    }
}

struct Harness {
    ui: FramedEndpoint<UiEvent>,
    sink: CapturingSink,
    coordinator: JoinHandle<ShutdownReason>,
}

async fn start(engine: ScriptedEngine) -> Harness {
    let (ui_near, ui_far) = tokio::io::duplex(64 * 1024);
    let (worker_near, worker_far) = tokio::io::duplex(64 * 1024);

    tokio::spawn(async move {
        let mut conn = framed::<WorkerCommand>(worker_far);
        announce(&mut conn, EndpointKind::Worker).await.unwrap();
        let (events, commands) = conn.split::<helmet_core::WorkerEvent>();
        WorkerRuntime::new(engine).serve(commands, events).await
    });

    let mut ui = framed::<UiEvent>(ui_far);
    announce(&mut ui, EndpointKind::Ui).await.unwrap();

    let mut launcher = DuplexLauncher {
        ends: HashMap::from([(EndpointKind::Ui, ui_near), (EndpointKind::Worker, worker_near)]),
    };
    let sink = CapturingSink::default();
    let coordinator = Coordinator::start(&mut launcher, sink.clone(), CoordinatorOptions::default())
        .await
        .unwrap();

    Harness {
        ui,
        sink,
        coordinator: tokio::spawn(coordinator.run()),
    }
}

fn run(names: &[&str]) -> UiRequest {
    UiRequest::RunScenarios(names.iter().map(|n| ScenarioDescriptor::named(*n)).collect())
}

async fn next_event(ui: &mut FramedEndpoint<UiEvent>) -> UiEvent {
    tokio::time::timeout(Duration::from_secs(5), ui.next())
        .await
        .expect("timed out waiting for an event")
        .expect("ui connection closed")
        .expect("transport error")
        .expect("malformed frame")
}

async fn assert_quiet(ui: &mut FramedEndpoint<UiEvent>) {
    let extra = tokio::time::timeout(Duration::from_millis(300), ui.next()).await;
    assert!(extra.is_err(), "unexpected event: {extra:?}");
}

fn complete(name: &str) -> UiEvent {
    UiEvent::ScenarioComplete(ScenarioDescriptor::named(name))
}

#[tokio::test]
async fn completes_each_scenario_in_order_then_all() {
    let mut h = start(ScriptedEngine::new(&[])).await;
    h.ui.send(run(&["A", "B", "C"])).await.unwrap();

    assert_eq!(next_event(&mut h.ui).await, complete("A"));
    assert_eq!(next_event(&mut h.ui).await, complete("B"));
    assert_eq!(next_event(&mut h.ui).await, complete("C"));
    assert_eq!(next_event(&mut h.ui).await, UiEvent::AllScenariosComplete);
    assert_quiet(&mut h.ui).await;
}

#[tokio::test]
async fn cancel_stops_the_cycle_and_the_worker_accepts_a_new_run() {
    let mut h = start(ScriptedEngine::new(&[("B", Step::Hang)])).await;
    h.ui.send(run(&["A", "B", "C"])).await.unwrap();
    assert_eq!(next_event(&mut h.ui).await, complete("A"));

    h.ui.send(UiRequest::CancelScenarios).await.unwrap();
    assert_quiet(&mut h.ui).await;

    h.ui.send(run(&["D"])).await.unwrap();
    assert_eq!(next_event(&mut h.ui).await, complete("D"));
    assert_eq!(next_event(&mut h.ui).await, UiEvent::AllScenariosComplete);
}

#[tokio::test]
async fn run_sent_right_after_a_cancel_is_not_rejected() {
    let mut h = start(ScriptedEngine::new(&[("A", Step::Hang)])).await;
    h.ui.send(run(&["A"])).await.unwrap();
    h.ui.send(UiRequest::CancelScenarios).await.unwrap();
    h.ui.send(run(&["D"])).await.unwrap();

    assert_eq!(next_event(&mut h.ui).await, complete("D"));
    assert_eq!(next_event(&mut h.ui).await, UiEvent::AllScenariosComplete);
    assert_quiet(&mut h.ui).await;
    assert!(h.sink.1.lock().unwrap().is_empty());
}

#[tokio::test]
async fn process_errors_go_to_the_sink_not_the_ui() {
    let mut h = start(ScriptedEngine::new(&[("B", Step::Fail("emme license expired"))])).await;
    h.ui.send(run(&["A", "B", "C"])).await.unwrap();

    assert_eq!(next_event(&mut h.ui).await, complete("A"));
    assert_eq!(next_event(&mut h.ui).await, complete("B"));
    assert_eq!(next_event(&mut h.ui).await, complete("C"));
    assert_eq!(next_event(&mut h.ui).await, UiEvent::AllScenariosComplete);

    let errors = h.sink.0.lock().unwrap().clone();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].scenario.as_deref(), Some("B"));
    assert!(errors[0].message.contains("emme license expired"));
}

#[tokio::test]
async fn loggable_events_are_forwarded_unchanged() {
    let mut h = start(ScriptedEngine::new(&[("A", Step::Log("assignment slow"))])).await;
    h.ui.send(run(&["A"])).await.unwrap();

    match next_event(&mut h.ui).await {
        UiEvent::LoggableEvent(entry) => {
            assert_eq!(entry.level, LogLevel::Warn);
            assert_eq!(entry.message, "assignment slow");
            assert_eq!(entry.scenario.as_deref(), Some("A"));
        }
        other => panic!("expected a log entry, got {other:?}"),
    }
    assert_eq!(next_event(&mut h.ui).await, complete("A"));
    assert_eq!(next_event(&mut h.ui).await, UiEvent::AllScenariosComplete);
}

#[tokio::test]
async fn second_run_while_busy_is_rejected_with_a_warning() {
    let mut h = start(ScriptedEngine::new(&[("A", Step::Hang)])).await;
    h.ui.send(run(&["A"])).await.unwrap();
    h.ui.send(run(&["B"])).await.unwrap();

    match next_event(&mut h.ui).await {
        UiEvent::LoggableEvent(entry) => {
            assert_eq!(entry.level, LogLevel::Warn);
            assert!(entry.message.contains("already running"), "{}", entry.message);
        }
        other => panic!("expected a warning, got {other:?}"),
    }

    h.ui.send(UiRequest::CancelScenarios).await.unwrap();
    assert_quiet(&mut h.ui).await;
}

#[tokio::test]
async fn closing_the_ui_shuts_the_coordinator_down() {
    let h = start(ScriptedEngine::new(&[])).await;
    drop(h.ui);
    let reason = tokio::time::timeout(Duration::from_secs(5), h.coordinator)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reason, ShutdownReason::UiClosed);
}
