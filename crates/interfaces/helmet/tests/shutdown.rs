#![cfg(target_os = "linux")]

use std::path::{Path, PathBuf};
use std::time::Duration;

use camino::Utf8Path;
use futures::SinkExt;
use helmet::launcher::ProcessLauncher;
use helmet_app_core::{
    Coordinator, CoordinatorOptions, EndpointLauncher, LaunchedEndpoint, ShutdownReason,
    TracingErrorSink,
};
use helmet_core::{EndpointKind, ScenarioDescriptor, SettingsKey, UiEvent, UiRequest};
use helmet_infra::{announce, framed};
use helmet_persistence::{JsonSettingsStore, SettingsStore};
use tokio::io::DuplexStream;

/// In-process UI, real worker process.
struct WorkerProcessLauncher {
    ui: Option<DuplexStream>,
    processes: ProcessLauncher,
}

#[async_trait::async_trait]
impl EndpointLauncher for WorkerProcessLauncher {
    async fn launch(&mut self, kind: EndpointKind) -> std::io::Result<LaunchedEndpoint> {
        match kind {
            EndpointKind::Ui => {
                let io = self
                    .ui
                    .take()
                    .ok_or_else(|| std::io::Error::other("ui already launched"))?;
                Ok(LaunchedEndpoint {
                    transport: Box::new(io),
                    process: None,
                })
            }
            EndpointKind::Worker => self.processes.launch(kind).await,
        }
    }
}

/// Alive and not a zombie.
fn is_running(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => !matches!(
            stat.rsplit(')').next().map(str::trim_start).and_then(|s| s.chars().next()),
            Some('Z' | 'X') | None
        ),
        Err(_) => false,
    }
}

async fn wait_for_pid(file: &Path) -> u32 {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
    loop {
        if let Some(pid) = std::fs::read_to_string(file)
            .ok()
            .and_then(|s| s.trim().parse().ok())
        {
            return pid;
        }
        assert!(tokio::time::Instant::now() < deadline, "engine never started");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn closing_the_ui_stops_the_worker_and_its_engine() {
    let dir = tempfile::tempdir().unwrap();
    let scripts = dir.path().join("scripts");
    std::fs::create_dir(&scripts).unwrap();
    let pid_file = dir.path().join("engine.pid");
    std::fs::write(
        scripts.join(helmet_config::HELMET_ENTRY_SCRIPT),
        format!(
            "cat > /dev/null\necho $$ > '{}'\nexec sleep 30\n",
            pid_file.display()
        ),
    )
    .unwrap();

    let settings_file = dir.path().join("config.json");
    let store = JsonSettingsStore::new(settings_file.clone());
    store
        .set(SettingsKey::EmmePythonPath, Utf8Path::new("/bin/sh"))
        .unwrap();
    store
        .set(
            SettingsKey::HelmetScriptsPath,
            Utf8Path::from_path(&scripts).unwrap(),
        )
        .unwrap();

    let (ui_near, ui_far) = tokio::io::duplex(64 * 1024);
    let mut ui = framed::<UiEvent>(ui_far);
    announce(&mut ui, EndpointKind::Ui).await.unwrap();

    let processes = ProcessLauncher::bind(
        PathBuf::from(env!("CARGO_BIN_EXE_helmet")),
        vec![
            "--settings-file".to_string(),
            settings_file.to_string_lossy().into_owned(),
        ],
        false,
    )
    .await
    .unwrap();
    let mut launcher = WorkerProcessLauncher {
        ui: Some(ui_near),
        processes,
    };
    let options = CoordinatorOptions {
        startup_timeout: Duration::from_secs(20),
        exit_grace: Duration::from_secs(2),
    };
    let coordinator = Coordinator::start(&mut launcher, TracingErrorSink, options)
        .await
        .unwrap();
    let relay = tokio::spawn(coordinator.run());

    ui.send(UiRequest::RunScenarios(vec![ScenarioDescriptor::named("base")]))
        .await
        .unwrap();
    let engine = wait_for_pid(&pid_file).await;
    assert!(is_running(engine));

    drop(ui);
    let reason = tokio::time::timeout(Duration::from_secs(20), relay)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reason, ShutdownReason::UiClosed);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while is_running(engine) {
        assert!(
            tokio::time::Instant::now() < deadline,
            "engine process {engine} outlived the coordinator"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
