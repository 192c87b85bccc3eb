//! Terminal operator interface.

use std::io::BufRead;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use camino::Utf8PathBuf;
use futures::{SinkExt, StreamExt};
use helmet_app_core::project::{list_scenarios, resolve_scenarios};
use helmet_app_core::{ensure_engine_path, OperatorPrompt, UiSession};
use helmet_core::{EndpointKind, SettingsKey, UiEvent};
use helmet_infra::{announce, framed, EmmePythonLocator, FramedEndpoint};
use helmet_persistence::{JsonSettingsStore, SettingsStore};
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{info, warn};

use crate::commands::{parse_command, UiCommand, HELP};

struct TerminalPrompt;

impl OperatorPrompt for TerminalPrompt {
    fn confirm(&self, message: &str) -> bool {
        println!("{message} [y/N]");
        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }

    fn notify(&self, message: &str) {
        println!("{message}");
    }
}

#[derive(PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub async fn run(coordinator: SocketAddr, store: JsonSettingsStore) -> anyhow::Result<()> {
    let stream = TcpStream::connect(coordinator)
        .await
        .with_context(|| format!("cannot reach the coordinator at {coordinator}"))?;
    stream.set_nodelay(true)?;

    let mut conn = framed::<UiEvent>(stream);
    announce(&mut conn, EndpointKind::Ui).await?;

    let store = Arc::new(store);
    let discovery_store = store.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        ensure_engine_path(&discovery_store, &EmmePythonLocator::from_env(), &TerminalPrompt)
    })
    .await??;
    info!(?outcome, "engine location check done");

    let mut session = UiSession::new(store.load()?, home_dir());
    println!("Helmet scenario runner. Project folder: {}", session.project_path());
    println!("{HELP}");

    let mut input = FramedRead::new(tokio::io::stdin(), LinesCodec::new());
    loop {
        tokio::select! {
            line = input.next() => match line {
                Some(Ok(line)) => match parse_command(&line) {
                    Ok(Some(cmd)) => {
                        if execute(cmd, &mut session, store.as_ref(), &mut conn).await? == Flow::Quit {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("{e}"),
                },
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            event = conn.next() => match event {
                Some(Ok(Ok(event))) => {
                    render(&event);
                    session.apply(&event);
                }
                Some(Ok(Err(bad))) => warn!(error = %bad, "ignoring malformed event"),
                Some(Err(e)) => return Err(e.into()),
                None => {
                    info!("coordinator closed the connection");
                    break;
                }
            },
        }
    }
    Ok(())
}

async fn execute(
    cmd: UiCommand,
    session: &mut UiSession,
    store: &JsonSettingsStore,
    conn: &mut FramedEndpoint<UiEvent>,
) -> anyhow::Result<Flow> {
    match cmd {
        UiCommand::List => match list_scenarios(&session.project_path()) {
            Ok(files) if files.is_empty() => println!("No scenarios in {}", session.project_path()),
            Ok(files) => {
                for file in files {
                    let name = file.file_stem().unwrap_or(file.as_str());
                    let done = session.completed().iter().any(|c| c == name);
                    println!("  {name}{}", if done { "  (done)" } else { "" });
                }
            }
            Err(e) => println!("{e:#}"),
        },
        UiCommand::Run(names) => {
            let scenarios = match resolve_scenarios(&session.project_path(), &names) {
                Ok(s) => s,
                Err(e) => {
                    println!("{e:#}");
                    return Ok(Flow::Continue);
                }
            };
            let count = scenarios.len();
            match session.request_run(scenarios) {
                Ok(request) => {
                    conn.send(request).await?;
                    println!("Running {count} scenario(s)...");
                }
                Err(e) => println!("{e}"),
            }
        }
        UiCommand::Cancel => match session.request_cancel() {
            Some(request) => {
                conn.send(request).await?;
                println!("Cancelled.");
            }
            None => println!("Nothing is running."),
        },
        UiCommand::Settings => {
            for key in SettingsKey::ALL {
                let value = match session.settings().get(key) {
                    Some(path) => format!("{}  ({path})", path.file_name().unwrap_or(path.as_str())),
                    None if key == SettingsKey::ProjectPath => {
                        format!("(home) {}", session.project_path())
                    }
                    None => "(not set)".to_string(),
                };
                println!("  {:<16} {value}", key.label());
            }
        }
        UiCommand::Set(key, value) => {
            match session.update_setting(store, key, value.as_deref()) {
                Ok(()) => println!("{} updated.", key.label()),
                Err(e) => println!("{e}"),
            }
        }
        UiCommand::Help => println!("{HELP}"),
        UiCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

fn render(event: &UiEvent) {
    match event {
        UiEvent::ScenarioComplete(s) => println!("Scenario {} complete.", s.name),
        UiEvent::AllScenariosComplete => println!("All scenarios complete."),
        UiEvent::LoggableEvent(entry) => println!("{entry}"),
    }
}

fn home_dir() -> Utf8PathBuf {
    directories::BaseDirs::new()
        .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.home_dir().to_path_buf()).ok())
        .unwrap_or_else(|| Utf8PathBuf::from("."))
}
