// Package shutdown turns OS termination signals into scope cancellation.

use std::io;
use tokio_util::sync::CancellationToken;
use tracing::info;


/// Listens for SIGINT and SIGTERM. Handlers are registered by
/// [`SignalWatcher::install`], so signals delivered after it returns are
/// never lost.
pub struct SignalWatcher {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl SignalWatcher {
    pub fn install() -> io::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            Ok(Self {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
            })
        }
        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Cancels `token` on the first signal. Returns early, without touching
    /// the token, if it gets cancelled some other way.
    pub async fn run(mut self, token: CancellationToken) -> anyhow::Result<()> {
        let signal = tokio::select! {
            name = self.next() => name,
            _ = token.cancelled() => {
                info!(
                    component = "graceful-shutdown",
                    event = "ctx_done",
                    "signal watcher stopped"
                );
                return Ok(());
            }
        };

        info!(
            component = "graceful-shutdown",
            event = "os_signal",
            signal = signal,
            "cancellation started"
        );
        token.cancel();
        Ok(())
    }

    #[cfg(unix)]
    async fn next(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }

    #[cfg(not(unix))]
    async fn next(&mut self) -> &'static str {
        let _ = tokio::signal::ctrl_c().await;
        "SIGINT"
    }
}
