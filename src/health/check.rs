// Package health provides the health check state machine.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Probe, ProbeError};

/// Health of a monitored target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Starting,
    Healthy,
    Unhealthy,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            State::Starting => "starting",
            State::Healthy => "healthy",
            State::Unhealthy => "unhealthy",
        })
    }
}

/// Emitted on every actual state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: State,
    pub to: State,
    /// Last probe failure, set when moving to `Unhealthy`.
    pub reason: Option<String>,
}

/// Health check timings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheck {
    /// Delay between two rounds once the first round completed.
    pub interval: Duration,
    /// Bound on a single probe.
    pub timeout: Duration,
    /// Extra attempts per round before the target is reported unhealthy.
    pub retries: u32,
    /// Delay before the very first probe.
    pub start_period: Duration,
    /// Spacing between attempts of the first round.
    pub start_interval: Duration,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(3),
            retries: 3,
            start_period: Duration::from_secs(1),
            start_interval: Duration::from_secs(1),
        }
    }
}

/// Runs a probe loop against one target and reports transitions on a channel.
pub struct Monitor {
    name: String,
    check: HealthCheck,
    probe: Arc<dyn Probe>,
    events: mpsc::UnboundedSender<Transition>,
}

impl Monitor {
    /// Creates a monitor and the receiving end of its transition stream.
    /// The stream ends once the monitor returns.
    pub fn new(
        name: impl Into<String>,
        check: HealthCheck,
        probe: Arc<dyn Probe>,
    ) -> (Self, mpsc::UnboundedReceiver<Transition>) {
        let (events, rx) = mpsc::unbounded_channel();
        let monitor = Self {
            name: name.into(),
            check,
            probe,
            events,
        };
        (monitor, rx)
    }

    /// Probes until `token` is cancelled. Cancellation never produces a
    /// transition.
    pub async fn run(self, token: CancellationToken) {
        let mut state = State::Starting;

        if !sleep(&token, self.check.start_period).await {
            return;
        }
        let Some(outcome) = self.round(&token, self.check.start_interval).await else {
            return;
        };
        self.apply(&mut state, outcome);

        loop {
            if !sleep(&token, self.check.interval).await {
                return;
            }
            let Some(outcome) = self.round(&token, self.check.interval).await else {
                return;
            };
            self.apply(&mut state, outcome);
        }
    }

    /// Up to `retries + 1` attempts, `spacing` apart, stopping on the first
    /// success. `None` when cancelled.
    async fn round(
        &self,
        token: &CancellationToken,
        spacing: Duration,
    ) -> Option<Result<(), ProbeError>> {
        let mut last_err = None;

        for attempt in 0..=self.check.retries {
            if attempt > 0 && !sleep(token, spacing).await {
                return None;
            }
            if token.is_cancelled() {
                return None;
            }

            let result = tokio::select! {
                _ = token.cancelled() => return None,
                res = tokio::time::timeout(self.check.timeout, self.probe.probe()) => {
                    res.unwrap_or(Err(ProbeError::Timeout(self.check.timeout)))
                }
            };

            match result {
                Ok(()) => return Some(Ok(())),
                Err(err) => {
                    debug!(
                        component = "health",
                        event = "probe_failed",
                        target = %self.name,
                        attempt = attempt + 1,
                        error = %err,
                        "health probe failed"
                    );
                    last_err = Some(err);
                }
            }
        }

        if token.is_cancelled() {
            return None;
        }
        Some(match last_err {
            Some(err) => Err(err),
            None => Ok(()),
        })
    }

    fn apply(&self, state: &mut State, outcome: Result<(), ProbeError>) {
        let (next, reason) = match outcome {
            Ok(()) => (State::Healthy, None),
            Err(err) => (State::Unhealthy, Some(err.to_string())),
        };
        if *state == next {
            return;
        }

        let transition = Transition {
            from: *state,
            to: next,
            reason,
        };
        *state = next;
        let _ = self.events.send(transition);
    }
}

/// Sleeps for `dur`. Returns false if `token` got cancelled first.
async fn sleep(token: &CancellationToken, dur: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(dur) => true,
    }
}
