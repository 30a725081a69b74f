// src/exec/process.rs

//! Running one OS process with its output teed into the attempt's sinks.

use std::io;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::NodeError;
use crate::io::sink::{SharedSink, Sink};

const PUMP_BUF_SIZE: usize = 8 * 1024;
const PARENT_STDOUT: &str = "<stdout>";

/// Where a process's output goes.
///
/// - stdout and stderr both go to `log`.
/// - stdout also goes to `stdout` and, when `capture` is set, into memory.
/// - A stream with nowhere to go is inherited from this process. Captured
///   stdout with no other target is echoed to this process's stdout.
pub(crate) struct Streams {
    pub log: Option<SharedSink>,
    pub stdout: Option<SharedSink>,
    pub capture: bool,
}

pub(crate) struct ProcessOutcome {
    pub result: Result<(), NodeError>,
    /// Everything the process wrote to stdout, when capture was requested.
    pub captured: Option<Vec<u8>>,
}

/// Spawn `cmd` and wait for it, or for `cancel` to fire.
///
/// `on_spawn` receives the pid (also the process group id) right after the
/// process starts. On cancellation the whole group is killed and the exit
/// status of the killed process is reported.
pub(crate) async fn run_process(
    mut cmd: Command,
    label: &str,
    streams: Streams,
    mut cancel: oneshot::Receiver<()>,
    on_spawn: impl FnOnce(u32),
) -> ProcessOutcome {
    let stdout_targets = stdout_targets(&streams);
    let stderr_targets: Vec<SharedSink> = streams.log.iter().cloned().collect();

    if stdout_targets.is_empty() {
        cmd.stdout(Stdio::inherit());
    } else {
        cmd.stdout(Stdio::piped());
    }
    if stderr_targets.is_empty() {
        cmd.stderr(Stdio::inherit());
    } else {
        cmd.stderr(Stdio::piped());
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return ProcessOutcome {
                result: Err(NodeError::Spawn {
                    command: label.to_string(),
                    source: e.into(),
                }),
                captured: None,
            };
        }
    };

    let pid = child.id();
    if let Some(pid) = pid {
        on_spawn(pid);
    }
    info!(command = %label, pid, "process started");

    let stdout_pump = child.stdout.take().map(|out| {
        let capture = streams.capture.then(Vec::new);
        tokio::spawn(pump(out, stdout_targets, capture))
    });
    let stderr_pump = child
        .stderr
        .take()
        .map(|err| tokio::spawn(pump(err, stderr_targets, None)));

    let waited = tokio::select! {
        status = child.wait() => status,
        Ok(()) = &mut cancel => {
            info!(command = %label, pid, "cancellation requested; killing process group");
            kill_group(&mut child, pid);
            child.wait().await
        }
    };

    let (stdout_res, captured) = match join_pump(stdout_pump).await {
        Ok(captured) => (Ok(()), captured),
        Err(e) => (Err(e), None),
    };
    let stderr_res = join_pump(stderr_pump).await.map(|_| ());

    let result = match waited {
        Err(e) => Err(NodeError::io("waiting for process", e)),
        Ok(status) => match exit_result(status) {
            Ok(()) => stdout_res
                .and(stderr_res)
                .map_err(|e| NodeError::io("copying process output", e)),
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(()) => debug!(command = %label, pid, "process exited successfully"),
        Err(ref e) => info!(command = %label, pid, error = %e, "process failed"),
    }

    ProcessOutcome { result, captured }
}

fn stdout_targets(streams: &Streams) -> Vec<SharedSink> {
    let mut targets: Vec<SharedSink> = streams.log.iter().chain(streams.stdout.iter()).cloned().collect();
    if targets.is_empty() && streams.capture {
        targets.push(Sink::new(PARENT_STDOUT, tokio::io::stdout()).shared());
    }
    targets
}

fn kill_group(child: &mut tokio::process::Child, pid: Option<u32>) {
    #[cfg(unix)]
    {
        if let Some(pid) = pid {
            if let Err(e) = super::signal::signal_group(pid, libc::SIGKILL) {
                debug!(pid, error = %e, "killing process group failed");
            }
        }
    }
    #[cfg(not(unix))]
    let _ = pid;

    if let Err(e) = child.start_kill() {
        debug!(error = %e, "killing process failed; it may have exited already");
    }
}

fn exit_result(status: ExitStatus) -> Result<(), NodeError> {
    if status.success() {
        return Ok(());
    }
    if let Some(code) = status.code() {
        return Err(NodeError::Exited { code });
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Err(NodeError::Signaled { signal });
        }
    }
    Err(NodeError::Exited { code: -1 })
}

/// Copy `reader` into every sink until EOF, optionally keeping a copy.
async fn pump<R>(mut reader: R, sinks: Vec<SharedSink>, mut capture: Option<Vec<u8>>) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; PUMP_BUF_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        let chunk = &buf[..n];
        for sink in sinks.iter() {
            sink.lock().await.write_all(chunk).await?;
        }
        if let Some(ref mut captured) = capture {
            captured.extend_from_slice(chunk);
        }
    }
    for sink in sinks.iter() {
        sink.lock().await.flush().await?;
    }
    Ok(capture)
}

async fn join_pump(handle: Option<JoinHandle<io::Result<Option<Vec<u8>>>>>) -> io::Result<Option<Vec<u8>>> {
    let Some(handle) = handle else {
        return Ok(None);
    };
    match handle.await {
        Ok(res) => res,
        Err(join_err) => {
            warn!(error = %join_err, "output pump task failed");
            Err(io::Error::other(join_err))
        }
    }
}
