// Error definitions for supervised processes.

use std::io;

/// Returned when a child process cannot be started.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("executable {command:?} not found")]
    NotFound {
        command: String,
        #[source]
        source: which::Error,
    },
    #[error("failed to start {command:?}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
}

/// Returned when `stop` could not confirm the process is gone.
#[derive(Debug, thiserror::Error)]
pub enum StopError {
    /// Neither the graceful signal nor the forced kill reached the OS.
    #[error("failed to stop process {pid} (signal: {signal}, kill: {kill})")]
    Unreachable {
        pid: u32,
        signal: io::Error,
        kill: io::Error,
    },
    #[error("process {pid} still running after interrupt, kill failed: {kill}")]
    StillRunning { pid: u32, kill: io::Error },
}
