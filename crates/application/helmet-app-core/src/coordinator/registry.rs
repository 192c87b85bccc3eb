use std::time::Duration;

use futures::{SinkExt, StreamExt};
use helmet_core::{EndpointKind, Ready, UiEvent, UiRequest, WorkerCommand, WorkerEvent};
use helmet_infra::{FramedEndpoint, MalformedFrame};
use serde::{de::DeserializeOwned, Serialize};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::RelayError;

/// What the endpoint reader tasks feed into the relay loop.
#[derive(Debug)]
pub(crate) enum Inbound {
    Ui(UiRequest),
    Worker(WorkerEvent),
    Malformed {
        endpoint: EndpointKind,
        error: MalformedFrame,
    },
    Closed(EndpointKind),
}

/// A connected endpoint: its process, a reader task and a writer task.
pub(crate) struct EndpointHandle<M> {
    kind: EndpointKind,
    pid: u32,
    outbound: mpsc::UnboundedSender<M>,
    process: Option<Child>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl<M: Serialize + Send + 'static> EndpointHandle<M> {
    pub(crate) fn spawn<D>(
        conn: FramedEndpoint<D>,
        ready: Ready,
        process: Option<Child>,
        inbound: mpsc::Sender<Inbound>,
        wrap: fn(D) -> Inbound,
    ) -> Self
    where
        D: DeserializeOwned + Send + 'static,
    {
        let kind = ready.role;
        let (mut sink, mut stream) = conn.split::<M>();
        let (outbound, mut rx) = mpsc::unbounded_channel::<M>();

        let writer = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = sink.send(msg).await {
                    warn!(endpoint = %kind, error = %e, "write failed");
                    return;
                }
            }
            let _ = sink.close().await;
        });

        let reader = tokio::spawn(async move {
            loop {
                let msg = match stream.next().await {
                    Some(Ok(Ok(msg))) => wrap(msg),
                    Some(Ok(Err(error))) => Inbound::Malformed {
                        endpoint: kind,
                        error,
                    },
                    Some(Err(e)) => {
                        warn!(endpoint = %kind, error = %e, "read failed");
                        break;
                    }
                    None => break,
                };
                if inbound.send(msg).await.is_err() {
                    return;
                }
            }
            let _ = inbound.send(Inbound::Closed(kind)).await;
        });

        Self {
            kind,
            pid: ready.pid,
            outbound,
            process,
            reader,
            writer,
        }
    }

    fn send(&self, msg: M, channel: &'static str) -> Result<(), RelayError> {
        self.outbound
            .send(msg)
            .map_err(|_| RelayError::EndpointUnavailable {
                endpoint: self.kind,
                channel,
            })
    }

    /// Closes the connection once queued writes have drained, then gives the process
    /// `grace` to exit on its own before killing it.
    async fn shutdown(self, grace: Duration) {
        let Self {
            kind,
            pid,
            outbound,
            process,
            reader,
            mut writer,
        } = self;
        drop(outbound);
        if tokio::time::timeout(grace, &mut writer).await.is_err() {
            debug!(endpoint = %kind, pid, "writes still pending; dropping the connection");
            writer.abort();
        }
        reader.abort();

        if let Some(mut child) = process {
            match tokio::time::timeout(grace, child.wait()).await {
                Ok(Ok(status)) => debug!(endpoint = %kind, pid, %status, "endpoint process exited"),
                Ok(Err(e)) => warn!(endpoint = %kind, pid, error = %e, "cannot wait for endpoint process"),
                Err(_) => {
                    warn!(endpoint = %kind, pid, "endpoint process still running after {grace:?}; killing it");
                    if let Err(e) = child.kill().await {
                        debug!(endpoint = %kind, pid, error = %e, "endpoint process already gone");
                    }
                }
            }
        }
        debug!(endpoint = %kind, pid, "endpoint released");
    }
}

pub(crate) struct EndpointRegistry {
    ui: Option<EndpointHandle<UiEvent>>,
    worker: Option<EndpointHandle<WorkerCommand>>,
    exit_grace: Duration,
}

impl EndpointRegistry {
    pub(crate) fn new(exit_grace: Duration) -> Self {
        Self {
            ui: None,
            worker: None,
            exit_grace,
        }
    }

    pub(crate) fn install_ui(&mut self, handle: EndpointHandle<UiEvent>) {
        if let Some(old) = self.ui.replace(handle) {
            tokio::spawn(old.shutdown(self.exit_grace));
        }
    }

    pub(crate) fn install_worker(&mut self, handle: EndpointHandle<WorkerCommand>) {
        if let Some(old) = self.worker.replace(handle) {
            tokio::spawn(old.shutdown(self.exit_grace));
        }
    }

    pub(crate) fn is_live(&self, kind: EndpointKind) -> bool {
        match kind {
            EndpointKind::Ui => self.ui.is_some(),
            EndpointKind::Worker => self.worker.is_some(),
        }
    }

    pub(crate) fn send_to_worker(&self, command: WorkerCommand) -> Result<(), RelayError> {
        let channel = command.channel();
        match &self.worker {
            Some(worker) => worker.send(command, channel),
            None => Err(RelayError::EndpointUnavailable {
                endpoint: EndpointKind::Worker,
                channel,
            }),
        }
    }

    pub(crate) fn send_to_ui(&self, event: UiEvent) -> Result<(), RelayError> {
        let channel = event.channel();
        match &self.ui {
            Some(ui) => ui.send(event, channel),
            None => Err(RelayError::EndpointUnavailable {
                endpoint: EndpointKind::Ui,
                channel,
            }),
        }
    }

    /// Forgets an endpoint whose connection is gone. Its process is reaped in the
    /// background.
    pub(crate) fn retire(&mut self, kind: EndpointKind) {
        let grace = self.exit_grace;
        match kind {
            EndpointKind::Ui => self.ui.take().map(|h| tokio::spawn(h.shutdown(grace))),
            EndpointKind::Worker => self.worker.take().map(|h| tokio::spawn(h.shutdown(grace))),
        };
    }

    /// Releases the worker, then the UI, waiting for each to exit.
    pub(crate) async fn clear(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.shutdown(self.exit_grace).await;
        }
        if let Some(ui) = self.ui.take() {
            ui.shutdown(self.exit_grace).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_registry_reports_the_missing_endpoint() {
        let registry = EndpointRegistry::new(Duration::from_millis(100));
        assert!(!registry.is_live(EndpointKind::Worker));
        assert_eq!(
            registry.send_to_worker(WorkerCommand::CancelScenarios),
            Err(RelayError::EndpointUnavailable {
                endpoint: EndpointKind::Worker,
                channel: "cancel-scenarios",
            })
        );
        assert!(matches!(
            registry.send_to_ui(UiEvent::AllScenariosComplete),
            Err(RelayError::EndpointUnavailable {
                endpoint: EndpointKind::Ui,
                ..
            })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn shutdown_drains_writes_then_kills_a_lingering_process() {
        let (near, far) = tokio::io::duplex(4096);
        let mut peer = helmet_infra::framed::<UiEvent>(far);
        let child = tokio::process::Command::new("sleep")
            .arg("30")
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        let pid = child.id().unwrap();
        let (tx, _rx) = mpsc::channel(4);
        let handle = EndpointHandle::<UiEvent>::spawn(
            helmet_infra::framed::<UiRequest>(near),
            Ready {
                role: EndpointKind::Ui,
                pid,
            },
            Some(child),
            tx,
            Inbound::Ui,
        );
        handle
            .send(UiEvent::AllScenariosComplete, "all-scenarios-complete")
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle.shutdown(Duration::from_millis(100)))
            .await
            .unwrap();

        assert_eq!(
            peer.next().await.unwrap().unwrap().unwrap(),
            UiEvent::AllScenariosComplete
        );
        assert!(peer.next().await.is_none());
        let alive = std::process::Command::new("sh")
            .args(["-c", &format!("kill -0 {pid} 2>/dev/null")])
            .status()
            .unwrap();
        assert!(!alive.success());
    }
}
