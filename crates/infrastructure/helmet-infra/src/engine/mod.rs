//! Runs one scenario on the external engine as a child process.

mod command;
mod output;

use std::process::Stdio;

use bytes::Bytes;
use futures::StreamExt;
use helmet_core::SettingsKey;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::process::Command;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, FramedRead};

pub use command::EngineCommand;
pub use output::EngineOutput;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{} is not set", .0.label())]
    NotConfigured(SettingsKey),
    #[error("engine entry script not found at {0}")]
    MissingScript(camino::Utf8PathBuf),
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("engine exited with status {0}")]
    Exited(i32),
    #[error("engine was terminated by a signal")]
    Terminated,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode scenario config: {0}")]
    Payload(#[from] serde_json::Error),
}

fn output_lines<R: AsyncRead>(io: R) -> FramedRead<R, AnyDelimiterCodec> {
    FramedRead::new(io, AnyDelimiterCodec::new(b"\n".to_vec(), Vec::new()))
}

/// Bytes that are not UTF-8 become U+FFFD; a trailing `\r` is dropped.
fn decode_line(raw: Result<Bytes, AnyDelimiterCodecError>) -> std::io::Result<String> {
    let raw = raw.map_err(|e| match e {
        AnyDelimiterCodecError::Io(e) => e,
        other => std::io::Error::other(other),
    })?;
    let line = String::from_utf8_lossy(&raw);
    Ok(line.strip_suffix('\r').unwrap_or(&*line).to_owned())
}

/// Spawns `cmd`, writes `stdin_payload` to its stdin and reports every output line
/// through `on_output` in the order it is read.
///
/// The child is killed if the returned future is dropped, which is how an interrupted
/// scenario stops.
pub async fn run_engine(
    cmd: &EngineCommand,
    stdin_payload: Vec<u8>,
    mut on_output: impl FnMut(EngineOutput) + Send,
) -> Result<(), EngineError> {
    tracing::debug!(
        program = %cmd.program,
        args = ?cmd.args,
        cwd = %cmd.working_dir.display(),
        "starting engine"
    );

    let mut child = Command::new(&cmd.program)
        .args(&cmd.args)
        .current_dir(&cmd.working_dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| EngineError::Spawn {
            program: cmd.program.clone(),
            source,
        })?;

    let stdin = child.stdin.take();
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("engine stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| std::io::Error::other("engine stderr was not captured"))?;

    // Fed concurrently with reading so a chatty engine cannot deadlock on a full pipe.
    let feed = async move {
        if let Some(mut stdin) = stdin {
            stdin.write_all(&stdin_payload).await?;
            stdin.shutdown().await?;
        }
        Ok::<_, std::io::Error>(())
    };
    tokio::pin!(feed);

    let mut out_lines = output_lines(stdout);
    let mut err_lines = output_lines(stderr);
    let (mut fed, mut out_done, mut err_done) = (false, false, false);

    while !(out_done && err_done) {
        tokio::select! {
            res = &mut feed, if !fed => {
                fed = true;
                if let Err(e) = res {
                    // The engine may legitimately exit without reading its input.
                    if e.kind() != std::io::ErrorKind::BrokenPipe {
                        return Err(e.into());
                    }
                }
            }
            line = out_lines.next(), if !out_done => match line {
                Some(raw) => on_output(EngineOutput::Stdout(decode_line(raw)?)),
                None => out_done = true,
            },
            line = err_lines.next(), if !err_done => match line {
                Some(raw) => on_output(EngineOutput::Stderr(decode_line(raw)?)),
                None => err_done = true,
            },
        }
    }

    let status = child.wait().await?;
    if status.success() {
        Ok(())
    } else {
        match status.code() {
            Some(code) => Err(EngineError::Exited(code)),
            None => Err(EngineError::Terminated),
        }
    }
}
