//! Process coordinator: starts the UI and worker endpoints and relays messages between
//! them.
//!
//! Startup is strictly ordered: the UI endpoint is created and reports ready, then the
//! worker endpoint, and only then are the relays installed. Frames an endpoint sends
//! before that stay buffered in its connection and are delivered once relaying starts.

mod error;
mod registry;
mod sink;

use std::future::Future;
use std::time::Duration;

use helmet_config::{
    DEFAULT_ENDPOINT_EXIT_GRACE_MS, DEFAULT_STARTUP_TIMEOUT_SECS, INBOUND_QUEUE_CAPACITY,
};
use helmet_core::{EndpointKind, Ready, UiRequest, WorkerEvent, WorkerEventRoute};
use helmet_infra::{accept_ready, FramedEndpoint};
use serde::de::DeserializeOwned;
use tokio::process::Child;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

pub use error::{CoordinatorError, RelayError};
pub use sink::TracingErrorSink;

use crate::ports::{EndpointLauncher, ErrorSink, LaunchedEndpoint};
use registry::{EndpointHandle, EndpointRegistry, Inbound};

#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    /// Bound on launching one endpoint and receiving its ready frame.
    pub startup_timeout: Duration,
    /// How long a released endpoint may take to exit before it is killed.
    pub exit_grace: Duration,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            startup_timeout: Duration::from_secs(DEFAULT_STARTUP_TIMEOUT_SECS),
            exit_grace: Duration::from_millis(DEFAULT_ENDPOINT_EXIT_GRACE_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The UI connection closed; the application quits with it.
    UiClosed,
    /// The caller's shutdown signal fired.
    Interrupted,
}

pub struct Coordinator<K = TracingErrorSink> {
    registry: EndpointRegistry,
    inbound: mpsc::Receiver<Inbound>,
    sink: K,
}

impl<K: ErrorSink> Coordinator<K> {
    pub async fn start<L>(
        launcher: &mut L,
        sink: K,
        options: CoordinatorOptions,
    ) -> Result<Self, CoordinatorError>
    where
        L: EndpointLauncher + ?Sized,
    {
        let timeout = options.startup_timeout;

        let (ui_conn, ui_ready, ui_process) =
            create_endpoint::<UiRequest, L>(launcher, EndpointKind::Ui, timeout).await?;

        let (worker_conn, worker_ready, worker_process) =
            match create_endpoint::<WorkerEvent, L>(launcher, EndpointKind::Worker, timeout).await
            {
                Ok(endpoint) => endpoint,
                Err(e) => {
                    if let Some(mut ui) = ui_process {
                        let _ = ui.start_kill();
                    }
                    return Err(e);
                }
            };

        let (tx, inbound) = mpsc::channel(INBOUND_QUEUE_CAPACITY);
        let mut registry = EndpointRegistry::new(options.exit_grace);
        registry.install_ui(EndpointHandle::spawn(
            ui_conn,
            ui_ready,
            ui_process,
            tx.clone(),
            Inbound::Ui,
        ));
        registry.install_worker(EndpointHandle::spawn(
            worker_conn,
            worker_ready,
            worker_process,
            tx,
            Inbound::Worker,
        ));
        info!("relays installed");

        Ok(Self {
            registry,
            inbound,
            sink,
        })
    }

    pub fn is_live(&self, kind: EndpointKind) -> bool {
        self.registry.is_live(kind)
    }

    /// Relays until the UI goes away.
    pub async fn run(self) -> ShutdownReason {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Relays until the UI goes away or `shutdown` resolves, then releases both
    /// endpoints: their connections are closed and each process gets the exit grace
    /// period before it is killed.
    pub async fn run_until<F>(mut self, shutdown: F) -> ShutdownReason
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let reason = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break ShutdownReason::Interrupted;
                }
                msg = self.inbound.recv() => match msg {
                    Some(msg) => {
                        if let Some(reason) = self.dispatch(msg) {
                            break reason;
                        }
                    }
                    None => break ShutdownReason::UiClosed,
                },
            }
        };

        self.registry.clear().await;
        reason
    }

    fn dispatch(&mut self, msg: Inbound) -> Option<ShutdownReason> {
        match msg {
            Inbound::Ui(request) => {
                debug!(channel = request.channel(), "ui -> worker");
                if let Err(e) = self.registry.send_to_worker(request.into()) {
                    self.sink.relay_failed(&e);
                }
            }
            Inbound::Worker(event) => {
                debug!(channel = event.channel(), "worker -> ui");
                match event.route() {
                    WorkerEventRoute::Ui(event) => {
                        if let Err(e) = self.registry.send_to_ui(event) {
                            self.sink.relay_failed(&e);
                        }
                    }
                    WorkerEventRoute::ErrorSink(e) => self.sink.process_error(&e),
                }
            }
            Inbound::Malformed { endpoint, error } => {
                error!(%endpoint, %error, "dropping malformed frame");
            }
            Inbound::Closed(EndpointKind::Ui) => {
                info!("ui endpoint closed; shutting down");
                return Some(ShutdownReason::UiClosed);
            }
            Inbound::Closed(EndpointKind::Worker) => {
                error!("worker endpoint closed; scenario commands can no longer be delivered");
                self.registry.retire(EndpointKind::Worker);
            }
        }
        None
    }
}

async fn create_endpoint<D, L>(
    launcher: &mut L,
    kind: EndpointKind,
    timeout: Duration,
) -> Result<(FramedEndpoint<D>, Ready, Option<Child>), CoordinatorError>
where
    D: DeserializeOwned,
    L: EndpointLauncher + ?Sized,
{
    info!(endpoint = %kind, "creating endpoint");
    let attempt = async {
        let LaunchedEndpoint { transport, process } = launcher
            .launch(kind)
            .await
            .map_err(|source| CoordinatorError::Launch {
                endpoint: kind,
                source,
            })?;
        let (conn, ready) = accept_ready::<D>(transport, kind)
            .await
            .map_err(|source| CoordinatorError::Handshake {
                endpoint: kind,
                source,
            })?;
        Ok::<_, CoordinatorError>((conn, ready, process))
    };

    match tokio::time::timeout(timeout, attempt).await {
        Ok(Ok((conn, ready, process))) => {
            info!(endpoint = %kind, pid = ready.pid, "endpoint ready");
            Ok((conn, ready, process))
        }
        Ok(Err(e)) => Err(e),
        Err(_) => Err(CoordinatorError::Timeout {
            endpoint: kind,
            timeout,
        }),
    }
}
