use std::net::SocketAddr;

use anyhow::Context;
use futures::StreamExt;
use helmet_app_core::{HelmetEngine, WorkerRuntime};
use helmet_core::{EndpointKind, WorkerCommand, WorkerEvent};
use helmet_infra::{announce, framed};
use helmet_persistence::JsonSettingsStore;
use tokio::net::TcpStream;

pub async fn run(coordinator: SocketAddr, store: JsonSettingsStore) -> anyhow::Result<()> {
    let stream = TcpStream::connect(coordinator)
        .await
        .with_context(|| format!("cannot reach the coordinator at {coordinator}"))?;
    stream.set_nodelay(true)?;

    let mut conn = framed::<WorkerCommand>(stream);
    announce(&mut conn, EndpointKind::Worker).await?;

    let (events, commands) = conn.split::<WorkerEvent>();
    WorkerRuntime::new(HelmetEngine::new(store))
        .serve(commands, events)
        .await?;
    Ok(())
}
