//! `tokio::process` backed launcher
use super::{ForegroundProcess, ProcessLauncher, ProcessOutput, ProcessSpec};
use crate::{
    error::{PlaybackError, Result},
    types::program_name,
};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};

/// How long to wait for the exit after SIGKILL
const KILL_WAIT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy)]
struct ExitRecord {
    code: Option<i32>,
}

/// Launches real executables
#[derive(Debug, Clone, Default)]
pub struct SystemLauncher;

impl SystemLauncher {
    pub fn new() -> Self {
        Self
    }

    fn command(spec: &ProcessSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(spec.env.iter().cloned())
            .stdin(Stdio::null());
        cmd
    }
}

#[async_trait]
impl ProcessLauncher for SystemLauncher {
    async fn spawn(&self, spec: &ProcessSpec) -> Result<Box<dyn ForegroundProcess>> {
        let mut cmd = Self::command(spec);
        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| PlaybackError::Spawn {
            program: program_name(&spec.program),
            source,
        })?;

        let label = spec.label();
        let pid = child.id();
        tracing::debug!("{} process started with PID: {:?}", label, pid);

        let (exit_tx, exit_rx) = watch::channel(None);
        let (kill_tx, kill_rx) = mpsc::channel(1);
        tokio::spawn(monitor(child, label.clone(), exit_tx, kill_rx));

        Ok(Box::new(SystemProcess {
            pid,
            label,
            exit: exit_rx,
            kill: kill_tx,
        }))
    }

    async fn run(&self, spec: &ProcessSpec) -> Result<ProcessOutput> {
        let output = Self::command(spec)
            .output()
            .await
            .map_err(|source| PlaybackError::Spawn {
                program: program_name(&spec.program),
                source,
            })?;

        Ok(ProcessOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Handle to a child owned by its monitor task
struct SystemProcess {
    pid: Option<u32>,
    label: String,
    exit: watch::Receiver<Option<ExitRecord>>,
    kill: mpsc::Sender<()>,
}

impl SystemProcess {
    /// Returns true once the monitor has observed the exit
    async fn wait_exit(&mut self, within: Duration) -> bool {
        // A closed channel means the monitor is gone, and with it the child.
        tokio::time::timeout(within, self.exit.wait_for(Option::is_some))
            .await
            .is_ok()
    }

    #[cfg(unix)]
    fn signal_terminate(&self) {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let Some(raw) = self.pid.and_then(|pid| i32::try_from(pid).ok()) else {
            return;
        };

        match kill(Pid::from_raw(raw), Signal::SIGTERM) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => tracing::warn!("Failed to send SIGTERM to {} ({}): {}", self.label, raw, e),
        }
    }

    #[cfg(not(unix))]
    fn signal_terminate(&self) {
        let _ = self.kill.try_send(());
    }
}

#[async_trait]
impl ForegroundProcess for SystemProcess {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn is_running(&self) -> bool {
        self.exit.borrow().is_none()
    }

    fn exit_code(&self) -> Option<i32> {
        self.exit.borrow().and_then(|record| record.code)
    }

    async fn terminate(&mut self, grace: Duration) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }

        tracing::info!("Stopping {} (PID: {:?})", self.label, self.pid);
        self.signal_terminate();
        if self.wait_exit(grace).await {
            return Ok(());
        }

        tracing::warn!(
            "{} did not terminate gracefully, forcing kill",
            self.label
        );
        // Full or closed channel: a kill is already queued or the monitor is done.
        let _ = self.kill.try_send(());
        if self.wait_exit(KILL_WAIT).await {
            Ok(())
        } else {
            Err(PlaybackError::ToolFailed {
                program: self.label.clone(),
                detail: format!("still running {:?} after SIGKILL", KILL_WAIT),
            })
        }
    }
}

/// Drains the child's output into the log until it exits
async fn monitor(
    mut child: Child,
    label: String,
    exit_tx: watch::Sender<Option<ExitRecord>>,
    mut kill_rx: mpsc::Receiver<()>,
) {
    let mut stdout = child.stdout.take().map(|out| BufReader::new(out).lines());
    let mut stderr = child.stderr.take().map(|err| BufReader::new(err).lines());

    let code = loop {
        tokio::select! {
            Some(line) = next_line(&mut stdout) => {
                tracing::debug!("{} output: {}", label, line.trim());
            }
            Some(line) = next_line(&mut stderr) => {
                tracing::warn!("{} error: {}", label, line.trim());
            }
            Some(()) = kill_rx.recv() => {
                if let Err(e) = child.start_kill() {
                    tracing::debug!("Kill request for {} ignored: {}", label, e);
                }
            }
            status = child.wait() => {
                break match status {
                    Ok(status) => status.code(),
                    Err(e) => {
                        tracing::warn!("Failed to wait for {}: {}", label, e);
                        None
                    }
                };
            }
        }
    };

    // Output written just before exit may still be sitting in the pipes.
    // A grandchild holding them open must not stall the exit record.
    if tokio::time::timeout(KILL_WAIT, drain(&label, &mut stdout, &mut stderr))
        .await
        .is_err()
    {
        tracing::debug!("{} output still open after exit, no longer reading it", label);
    }

    tracing::info!("{} process ended with return code: {:?}", label, code);
    exit_tx.send_replace(Some(ExitRecord { code }));
}

/// Log whatever is left on both streams until each reaches EOF
async fn drain<O, E>(
    label: &str,
    stdout: &mut Option<Lines<BufReader<O>>>,
    stderr: &mut Option<Lines<BufReader<E>>>,
) where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    loop {
        tokio::select! {
            Some(line) = next_line(stdout), if stdout.is_some() => {
                tracing::debug!("{} output: {}", label, line.trim());
            }
            Some(line) = next_line(stderr), if stderr.is_some() => {
                tracing::warn!("{} error: {}", label, line.trim());
            }
            else => break,
        }
    }
}

/// Next line from an optional reader; pending forever once the stream ends
async fn next_line<R>(lines: &mut Option<Lines<BufReader<R>>>) -> Option<String>
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = lines.as_mut() else {
        return std::future::pending().await;
    };

    match reader.next_line().await {
        Ok(Some(line)) => Some(line),
        _ => {
            *lines = None;
            None
        }
    }
}
