// Tasks shared by every supervised child: exit watch, output forwarding
// and stop on cancellation.

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempPath;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, error, info, warn};

use super::error::ExitError;
use crate::nursery::Nursery;
use crate::process::{forward_lines, Process};

/// How long the exit watcher keeps waiting past the stop timeout.
const EXIT_GRACE: Duration = Duration::from_secs(2);
/// How long output is drained after the child exited.
const OUTPUT_GRACE: Duration = Duration::from_millis(500);

/// Registers the supervision tasks of `process` in `n`. `keep` is dropped
/// once the process is gone.
pub(super) fn supervise(
    n: &Nursery,
    process: Process,
    stop_timeout: Duration,
    keep: Option<TempPath>,
) {
    let process = Arc::new(process);
    let name = process.name().to_string();
    let prefix = format!("{name} | ");

    n.spawn(
        format!("{name}-exit"),
        watch_exit(n.clone(), process.clone(), stop_timeout + EXIT_GRACE, keep),
    );

    if let Some(out) = process.take_stdout() {
        n.spawn(
            format!("{name}-stdout"),
            forward(process.clone(), out, tokio::io::stdout(), prefix.clone()),
        );
    }
    if let Some(err) = process.take_stderr() {
        n.spawn(
            format!("{name}-stderr"),
            forward(process.clone(), err, tokio::io::stderr(), prefix),
        );
    }

    let scope = n.clone();
    n.spawn(format!("{name}-stop"), async move {
        scope.cancelled().await;
        debug!(component = "app", event = "stopping", process = %name, "gracefully stopping");
        match process.stop(stop_timeout).await {
            Ok(()) => info!(component = "app", event = "stopped", process = %name, "gracefully stopped"),
            Err(err) => error!(
                component = "app",
                event = "stop_failed",
                process = %name,
                error = %err,
                "failed to stop process"
            ),
        }
        Ok(())
    });
}

async fn watch_exit(
    n: Nursery,
    process: Arc<Process>,
    grace: Duration,
    keep: Option<TempPath>,
) -> anyhow::Result<()> {
    let state = tokio::select! {
        state = process.wait() => Some(state),
        _ = async {
            n.cancelled().await;
            tokio::time::sleep(grace).await;
        } => None,
    };
    drop(keep);

    match state {
        Some(state) if !n.is_cancelled() => Err(ExitError {
            name: process.name().to_string(),
            state,
        }
        .into()),
        Some(state) => {
            debug!(
                component = "app",
                event = "exited",
                process = %process.name(),
                status = %state
            );
            Ok(())
        }
        None => {
            warn!(
                component = "app",
                event = "exit_timeout",
                process = %process.name(),
                pid = process.pid(),
                "process still running after stop, giving up on it"
            );
            Ok(())
        }
    }
}

async fn forward<R, W>(process: Arc<Process>, reader: R, writer: W, prefix: String) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    tokio::select! {
        res = forward_lines(reader, writer, &prefix) => {
            if let Err(err) = res {
                debug!(
                    component = "app",
                    event = "forward_failed",
                    process = %process.name(),
                    error = %err
                );
            }
        }
        _ = async {
            process.wait().await;
            tokio::time::sleep(OUTPUT_GRACE).await;
        } => {}
    }
    Ok(())
}
