// Supervised OS process.

use parking_lot::Mutex;
use std::ffi::OsStr;
use std::fmt;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use super::error::{LaunchError, StopError};

/// Signals the supervisor can forward to a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
    Terminate,
}

impl Signal {
    #[cfg(unix)]
    fn as_raw(self) -> libc::c_int {
        match self {
            Signal::Interrupt => libc::SIGINT,
            Signal::Terminate => libc::SIGTERM,
        }
    }
}

/// Terminal status of a process. Set exactly once when the OS reports the exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitState {
    pub code: Option<i32>,
    pub signal: Option<i32>,
    pub error: Option<String>,
}

impl ExitState {
    fn from_wait(result: io::Result<std::process::ExitStatus>) -> Self {
        match result {
            Ok(status) => {
                #[cfg(unix)]
                let signal = std::os::unix::process::ExitStatusExt::signal(&status);
                #[cfg(not(unix))]
                let signal = None;
                Self {
                    code: status.code(),
                    signal,
                    error: None,
                }
            }
            Err(err) => Self {
                code: None,
                signal: None,
                error: Some(err.to_string()),
            },
        }
    }

    fn lost() -> Self {
        Self {
            code: None,
            signal: None,
            error: Some("exit notification lost".to_string()),
        }
    }

    /// True when the process exited on its own with code 0.
    pub fn success(&self) -> bool {
        self.error.is_none() && self.code == Some(0)
    }
}

impl fmt::Display for ExitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error, self.code, self.signal) {
            (Some(err), _, _) => write!(f, "wait failed: {err}"),
            (None, Some(code), _) => write!(f, "exit code {code}"),
            (None, None, Some(signal)) => write!(f, "killed by signal {signal}"),
            (None, None, None) => write!(f, "unknown exit status"),
        }
    }
}

type Reply = oneshot::Sender<io::Result<()>>;

enum Control {
    Signal(Signal, Reply),
    Kill(Reply),
}

/// Handle over one child process.
///
/// The `Child` itself is owned by a background monitor task which is the only
/// place the exit status is collected, so `wait` and `stop` can be called any
/// number of times from any number of tasks.
/// Dropping the last handle kills the process group and reaps the child.
pub struct Process {
    name: String,
    pid: u32,
    control: mpsc::UnboundedSender<Control>,
    exit: watch::Receiver<Option<ExitState>>,
    stdout: Mutex<Option<ChildStdout>>,
    stderr: Mutex<Option<ChildStderr>>,
}

impl Process {
    /// Resolves `command` on `PATH` and starts it with stdin closed and
    /// stdout/stderr piped. The child inherits the supervisor's environment
    /// plus `env`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn launch<I, S>(
        name: impl Into<String>,
        command: &str,
        args: I,
        env: &[(String, String)],
    ) -> Result<Self, LaunchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let name = name.into();
        let program = which::which(command).map_err(|source| LaunchError::NotFound {
            command: command.to_string(),
            source,
        })?;

        let mut cmd = Command::new(&program);
        cmd.args(args)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group: a terminal ^C must reach the supervisor only.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|source| LaunchError::Spawn {
            command: command.to_string(),
            source,
        })?;

        let pid = child.id().unwrap_or_default();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = watch::channel(None);

        let monitor_name = name.clone();
        tokio::spawn(async move {
            let state = monitor(child, control_rx).await;
            debug!(
                component = "process",
                event = "exited",
                process = %monitor_name,
                pid,
                status = %state,
                "process exited"
            );
            exit_tx.send_replace(Some(state));
        });

        info!(
            component = "process",
            event = "started",
            process = %name,
            pid,
            program = ?program,
            "process started"
        );

        Ok(Self {
            name,
            pid,
            control: control_tx,
            exit: exit_rx,
            stdout: Mutex::new(stdout),
            stderr: Mutex::new(stderr),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Takes the line-buffered stdout reader. Returns `None` on the second call.
    pub fn take_stdout(&self) -> Option<BufReader<ChildStdout>> {
        self.stdout.lock().take().map(BufReader::new)
    }

    /// Takes the line-buffered stderr reader. Returns `None` on the second call.
    pub fn take_stderr(&self) -> Option<BufReader<ChildStderr>> {
        self.stderr.lock().take().map(BufReader::new)
    }

    /// Exit status if the process already exited.
    pub fn exit_state(&self) -> Option<ExitState> {
        self.exit.borrow().clone()
    }

    pub fn is_exited(&self) -> bool {
        self.exit.borrow().is_some()
    }

    /// Blocks until the process exits and returns its status.
    pub async fn wait(&self) -> ExitState {
        let mut exit = self.exit.clone();
        let state = match exit.wait_for(Option::is_some).await {
            Ok(state) => state.clone().unwrap_or_else(ExitState::lost),
            Err(_) => ExitState::lost(),
        };
        state
    }

    /// Forwards a signal to the process group. A process that is already
    /// gone is not an error.
    pub async fn signal(&self, signal: Signal) -> io::Result<()> {
        self.request(|reply| Control::Signal(signal, reply)).await
    }

    /// Forcefully kills the process group.
    pub async fn kill(&self) -> io::Result<()> {
        self.request(Control::Kill).await
    }

    /// Interrupts the process, then kills it if it is still running once
    /// `timeout` elapsed. Idempotent: stopping an exited process succeeds
    /// immediately.
    pub async fn stop(&self, timeout: Duration) -> Result<(), StopError> {
        if self.is_exited() {
            return Ok(());
        }

        let graceful = self.signal(Signal::Interrupt).await;
        if let Err(err) = &graceful {
            warn!(
                component = "process",
                event = "signal_failed",
                process = %self.name,
                pid = self.pid,
                error = %err,
                "failed to interrupt process"
            );
        }

        tokio::select! {
            _ = self.wait() => return Ok(()),
            _ = tokio::time::sleep(timeout) => {}
        }

        warn!(
            component = "process",
            event = "kill",
            process = %self.name,
            pid = self.pid,
            timeout = ?timeout,
            "process did not stop in time, killing"
        );

        match (self.kill().await, graceful) {
            (Ok(()), _) => {
                self.wait().await;
                Ok(())
            }
            (Err(kill), Err(signal)) => Err(StopError::Unreachable {
                pid: self.pid,
                signal,
                kill,
            }),
            (Err(kill), Ok(())) => {
                warn!(
                    component = "process",
                    event = "kill_failed",
                    process = %self.name,
                    pid = self.pid,
                    error = %kill,
                    "failed to kill process after interrupt"
                );
                // The interrupt got through; give it one more deadline.
                match tokio::time::timeout(timeout, self.wait()).await {
                    Ok(_) => Ok(()),
                    Err(_) => Err(StopError::StillRunning {
                        pid: self.pid,
                        kill,
                    }),
                }
            }
        }
    }

    async fn request(&self, make: impl FnOnce(Reply) -> Control) -> io::Result<()> {
        let (tx, rx) = oneshot::channel();
        if self.control.send(make(tx)).is_err() {
            // Monitor finished: the process has been reaped.
            return Ok(());
        }
        rx.await.unwrap_or(Ok(()))
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("name", &self.name)
            .field("pid", &self.pid)
            .field("exit", &*self.exit.borrow())
            .finish()
    }
}

async fn monitor(mut child: Child, mut control: mpsc::UnboundedReceiver<Control>) -> ExitState {
    loop {
        tokio::select! {
            result = child.wait() => return ExitState::from_wait(result),
            msg = control.recv() => match msg {
                Some(Control::Signal(signal, reply)) => {
                    let _ = reply.send(send_signal(&mut child, signal));
                }
                Some(Control::Kill(reply)) => {
                    let _ = reply.send(send_kill(&mut child));
                }
                None => {
                    // Every handle is gone, nothing can stop the child anymore.
                    if let Err(err) = send_kill(&mut child) {
                        warn!(
                            component = "process",
                            event = "orphan_kill_failed",
                            pid = child.id(),
                            error = %err,
                            "failed to kill orphaned process"
                        );
                    }
                    return ExitState::from_wait(child.wait().await);
                }
            },
        }
    }
}

#[cfg(unix)]
fn send_signal(child: &mut Child, signal: Signal) -> io::Result<()> {
    signal_group(child, signal.as_raw())
}

#[cfg(not(unix))]
fn send_signal(child: &mut Child, _signal: Signal) -> io::Result<()> {
    child.start_kill()
}

#[cfg(unix)]
fn send_kill(child: &mut Child) -> io::Result<()> {
    signal_group(child, libc::SIGKILL)
}

#[cfg(not(unix))]
fn send_kill(child: &mut Child) -> io::Result<()> {
    child.start_kill()
}

/// Signals the child's process group. `child.id()` is `None` once the child
/// was reaped, which keeps a recycled pid from being signalled.
#[cfg(unix)]
fn signal_group(child: &Child, raw: libc::c_int) -> io::Result<()> {
    let Some(pid) = child.id() else {
        return Ok(());
    };
    let rc = unsafe { libc::kill(-(pid as libc::pid_t), raw) };
    if rc == 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Ok(())
    } else {
        Err(err)
    }
}
