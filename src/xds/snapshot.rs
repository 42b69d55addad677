// Versioned snapshots and their publication to a discovery endpoint.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::cache::DiscoveryEndpoint;
use super::error::PublishError;
use super::resource::{Resource, ResourceType, ToResource};
use super::store::{ClusterStore, ListenerStore};

/// Immutable set of resources grouped by type, tagged with a version.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    version: String,
    resources: BTreeMap<ResourceType, Vec<Resource>>,
}

impl Snapshot {
    pub fn new(
        version: impl Into<String>,
        resources: impl IntoIterator<Item = (ResourceType, Vec<Resource>)>,
    ) -> Self {
        Self {
            version: version.into(),
            resources: resources.into_iter().collect(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn resources(&self, kind: ResourceType) -> &[Resource] {
        self.resources.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn find(&self, kind: ResourceType, name: &str) -> Option<&Resource> {
        self.resources(kind).iter().find(|r| r.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceType, &[Resource])> {
        self.resources.iter().map(|(kind, list)| (*kind, list.as_slice()))
    }
}

/// Builds snapshots from the stores and hands them to the endpoint.
///
/// Versions come from a monotonic counter starting at 1 and are never
/// reused, even when a submission fails. Publishes are serialized so the
/// endpoint receives versions in increasing order.
pub struct Publisher {
    node_id: String,
    version: AtomicU64,
    gate: tokio::sync::Mutex<()>,
    endpoint: Arc<dyn DiscoveryEndpoint>,
}

impl Publisher {
    pub fn new(node_id: impl Into<String>, endpoint: Arc<dyn DiscoveryEndpoint>) -> Self {
        Self {
            node_id: node_id.into(),
            version: AtomicU64::new(0),
            gate: tokio::sync::Mutex::new(()),
            endpoint,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Last version handed out, 0 before the first publish.
    pub fn last_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    pub async fn publish(
        &self,
        listeners: &ListenerStore,
        clusters: &ClusterStore,
    ) -> Result<String, PublishError> {
        let _gate = self.gate.lock().await;

        let version = (self.version.fetch_add(1, Ordering::SeqCst) + 1).to_string();
        let listeners = listeners.list_all();
        let clusters = clusters.list_all();

        let known: HashSet<&str> = clusters.iter().map(|c| c.name.as_str()).collect();
        for listener in &listeners {
            for cluster in listener.referenced_clusters() {
                if !known.contains(cluster) {
                    warn!(
                        component = "xds",
                        event = "dangling_cluster",
                        version = %version,
                        listener = %listener.name,
                        cluster = %cluster,
                        "listener routes to a cluster missing from the snapshot"
                    );
                }
            }
        }

        let snapshot = Snapshot::new(
            version.clone(),
            [
                (
                    ResourceType::Listener,
                    listeners.iter().map(|l| l.to_resource()).collect(),
                ),
                (
                    ResourceType::Cluster,
                    clusters.iter().map(|c| c.to_resource()).collect(),
                ),
            ],
        );
        debug!(
            component = "xds",
            event = "snapshot_built",
            version = %version,
            listeners = listeners.len(),
            clusters = clusters.len()
        );

        self.endpoint
            .submit_snapshot(&self.node_id, snapshot)
            .await
            .map_err(|source| PublishError::Rejected {
                version: version.clone(),
                source,
            })?;

        info!(
            component = "xds",
            event = "snapshot_published",
            node_id = %self.node_id,
            version = %version,
            "published configuration snapshot"
        );
        Ok(version)
    }
}
