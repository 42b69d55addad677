// Error definitions for health probes

use std::time::Duration;

/// Failure of a single probe attempt. Absorbed by the health state machine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("probe request failed: {0}")]
    Request(String),
    #[error("unexpected status code {0}")]
    Status(u16),
    #[error("{0}")]
    Failed(String),
}
