// Discovery endpoint seam and the in-memory snapshot cache behind it.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use super::error::SubmitError;
use super::snapshot::Snapshot;

/// Receives complete configuration snapshots for a proxy node.
#[async_trait]
pub trait DiscoveryEndpoint: Send + Sync {
    async fn submit_snapshot(&self, node_id: &str, snapshot: Snapshot) -> Result<(), SubmitError>;
}

type Slot = watch::Sender<Option<Arc<Snapshot>>>;

/// Holds the latest accepted snapshot per node and wakes watchers when it
/// changes. Resubmitting the current version is accepted without waking
/// anyone.
#[derive(Default)]
pub struct SnapshotCache {
    nodes: Mutex<HashMap<String, Slot>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self, node_id: &str) -> Option<Arc<Snapshot>> {
        self.nodes
            .lock()
            .get(node_id)
            .and_then(|slot| slot.borrow().clone())
    }

    /// Subscribes to snapshot changes for `node_id`, registering the node if
    /// nothing was submitted for it yet.
    pub fn watch(&self, node_id: &str) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.nodes
            .lock()
            .entry(node_id.to_string())
            .or_insert_with(|| watch::channel(None).0)
            .subscribe()
    }

    fn validate(snapshot: &Snapshot) -> Result<(), SubmitError> {
        if snapshot.version().is_empty() {
            return Err(SubmitError::EmptyVersion);
        }
        for (kind, resources) in snapshot.iter() {
            let mut seen = HashSet::new();
            for res in resources {
                if res.kind != kind {
                    return Err(SubmitError::WrongType {
                        expected: kind,
                        found: res.kind,
                        name: res.name.clone(),
                    });
                }
                if res.name.is_empty() {
                    return Err(SubmitError::EmptyName { kind });
                }
                if !seen.insert(res.name.as_str()) {
                    return Err(SubmitError::DuplicateName {
                        kind,
                        name: res.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DiscoveryEndpoint for SnapshotCache {
    async fn submit_snapshot(&self, node_id: &str, snapshot: Snapshot) -> Result<(), SubmitError> {
        Self::validate(&snapshot)?;

        let version = snapshot.version().to_string();
        let snapshot = Arc::new(snapshot);
        let mut nodes = self.nodes.lock();
        let slot = nodes
            .entry(node_id.to_string())
            .or_insert_with(|| watch::channel(None).0);

        let changed = slot.send_if_modified(|current| {
            if current
                .as_ref()
                .is_some_and(|cur| cur.version() == snapshot.version())
            {
                return false;
            }
            *current = Some(snapshot);
            true
        });

        debug!(
            component = "xds",
            event = "snapshot_accepted",
            node_id = %node_id,
            version = %version,
            changed
        );
        Ok(())
    }
}
