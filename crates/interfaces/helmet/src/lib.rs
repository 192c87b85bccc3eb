pub mod cli;
pub mod commands;
pub mod launcher;
pub mod logging;
pub mod ui;
pub mod worker;

use std::time::Duration;

use anyhow::Context;
use camino::Utf8PathBuf;
use helmet_app_core::{Coordinator, CoordinatorOptions, TracingErrorSink};
use helmet_config::clamp_startup_timeout_secs;
use helmet_persistence::JsonSettingsStore;
use tracing::{info, info_span, warn, Instrument};

use cli::{Cli, Command, CoordinatorArgs};
use launcher::ProcessLauncher;

pub async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Command::Ui { connect }) => {
            let store = open_store(cli.settings_file)?;
            ui::run(connect, store)
                .instrument(info_span!("ui", pid = std::process::id()))
                .await
        }
        Some(Command::Worker { connect }) => {
            let store = open_store(cli.settings_file)?;
            worker::run(connect, store)
                .instrument(info_span!("worker", pid = std::process::id()))
                .await
        }
        None => {
            let endpoint_args = cli.endpoint_args();
            coordinate(&cli.coordinator, endpoint_args).await
        }
    }
}

fn open_store(path: Option<Utf8PathBuf>) -> anyhow::Result<JsonSettingsStore> {
    match path {
        Some(path) => Ok(JsonSettingsStore::new(path)),
        None => JsonSettingsStore::open_default().context("cannot locate the settings file"),
    }
}

/// Starts both endpoints and relays between them until the operator closes the UI or
/// presses Ctrl-C.
async fn coordinate(args: &CoordinatorArgs, endpoint_args: Vec<String>) -> anyhow::Result<()> {
    let exe = std::env::current_exe().context("cannot locate the helmet executable")?;
    let mut launcher = ProcessLauncher::bind(exe, endpoint_args, args.show_worker_output).await?;
    let options = CoordinatorOptions {
        startup_timeout: Duration::from_secs(clamp_startup_timeout_secs(args.startup_timeout_secs)),
        ..CoordinatorOptions::default()
    };

    let coordinator = Coordinator::start(&mut launcher, TracingErrorSink, options).await?;
    let reason = coordinator
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await;
    info!(?reason, "coordinator stopped");
    Ok(())
}
