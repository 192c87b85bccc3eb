use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::process::Stdio;

use helmet_app_core::{EndpointLauncher, LaunchedEndpoint};
use helmet_core::EndpointKind;
use tokio::net::TcpListener;
use tokio::process::Command;
use tracing::debug;

/// Starts endpoints as child processes of this executable, connected back over a
/// loopback socket.
pub struct ProcessLauncher {
    exe: PathBuf,
    listener: TcpListener,
    endpoint_args: Vec<String>,
    show_worker_output: bool,
}

impl ProcessLauncher {
    pub async fn bind(
        exe: PathBuf,
        endpoint_args: Vec<String>,
        show_worker_output: bool,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        debug!(addr = %listener.local_addr()?, "listening for endpoints");
        Ok(Self {
            exe,
            listener,
            endpoint_args,
            show_worker_output,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    fn command_for(&self, kind: EndpointKind, addr: SocketAddr) -> Command {
        let mut cmd = Command::new(&self.exe);
        cmd.args(&self.endpoint_args)
            .arg(kind.to_string())
            .arg("--connect")
            .arg(addr.to_string())
            .kill_on_drop(true);

        // The worker has no console of its own.
        if kind == EndpointKind::Worker {
            cmd.stdin(Stdio::null());
            if !self.show_worker_output {
                cmd.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }
        cmd
    }
}

#[async_trait::async_trait]
impl EndpointLauncher for ProcessLauncher {
    async fn launch(&mut self, kind: EndpointKind) -> io::Result<LaunchedEndpoint> {
        let addr = self.local_addr()?;
        let mut child = self.command_for(kind, addr).spawn()?;
        debug!(endpoint = %kind, pid = child.id(), "endpoint process started");

        tokio::select! {
            accepted = self.listener.accept() => {
                let (stream, peer) = accepted?;
                stream.set_nodelay(true)?;
                debug!(endpoint = %kind, %peer, "endpoint connected");
                Ok(LaunchedEndpoint {
                    transport: Box::new(stream),
                    process: Some(child),
                })
            }
            status = child.wait() => {
                let status = status?;
                Err(io::Error::other(format!(
                    "{kind} process exited before connecting ({status})"
                )))
            }
        }
    }
}
