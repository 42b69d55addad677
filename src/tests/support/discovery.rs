// Discovery endpoint double that records every submission.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Notify;

use crate::xds::{DiscoveryEndpoint, Snapshot, SubmitError};

#[derive(Default)]
pub struct RecordingEndpoint {
    submitted: Mutex<Vec<(String, Snapshot)>>,
    rejections: Mutex<VecDeque<SubmitError>>,
    delay: Mutex<Option<Duration>>,
    notify: Notify,
}

impl RecordingEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next submission fail with `err`.
    pub fn reject_next(&self, err: SubmitError) {
        self.rejections.lock().push_back(err);
    }

    /// Delays every submission by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.submitted.lock().iter().map(|(_, s)| s.clone()).collect()
    }

    pub fn versions(&self) -> Vec<String> {
        self.submitted
            .lock()
            .iter()
            .map(|(_, s)| s.version().to_string())
            .collect()
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.submitted.lock().iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn last(&self) -> Option<Snapshot> {
        self.submitted.lock().last().map(|(_, s)| s.clone())
    }

    /// Waits until at least `count` snapshots were accepted.
    pub async fn wait_for(&self, count: usize) {
        loop {
            let notified = self.notify.notified();
            if self.submitted.lock().len() >= count {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl DiscoveryEndpoint for RecordingEndpoint {
    async fn submit_snapshot(&self, node_id: &str, snapshot: Snapshot) -> Result<(), SubmitError> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let rejection = self.rejections.lock().pop_front();
        if let Some(err) = rejection {
            return Err(err);
        }
        self.submitted.lock().push((node_id.to_string(), snapshot));
        self.notify.notify_waiters();
        Ok(())
    }
}
