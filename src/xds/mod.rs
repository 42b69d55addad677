//! Proxy configuration model and its publication.
//!
//! Listeners and clusters live in name-keyed stores. [`ControlPlane::publish`]
//! turns the current contents into a versioned [`Snapshot`] and submits it to
//! a [`DiscoveryEndpoint`], which the proxy polls through its aggregated
//! discovery stream.

mod address;
mod cache;
mod cluster;
mod error;
mod listener;
mod resource;
mod snapshot;
mod store;

#[cfg(test)]
mod cache_test;
#[cfg(test)]
mod resource_test;
#[cfg(test)]
mod snapshot_test;
#[cfg(test)]
mod store_test;

pub use address::SocketAddress;
pub use cache::{DiscoveryEndpoint, SnapshotCache};
pub use cluster::{Cluster, LbPolicy, TcpKeepAlive};
pub use error::{AddressError, PublishError, SubmitError};
pub use listener::{Filter, HttpFilter, HttpProxy, Listener, RouteConfig, VirtualHost};
pub use resource::{Resource, ResourceType, ToResource};
pub use snapshot::{Publisher, Snapshot};
pub use store::{ClusterStore, ListenerStore, ResourceStore};

use std::sync::Arc;
use std::time::Duration;

/// Owns both resource stores and the publisher for one proxy node.
pub struct ControlPlane {
    listeners: ListenerStore,
    clusters: ClusterStore,
    publisher: Publisher,
    publish_timeout: Duration,
}

impl ControlPlane {
    pub fn new(
        node_id: impl Into<String>,
        endpoint: Arc<dyn DiscoveryEndpoint>,
        publish_timeout: Duration,
    ) -> Self {
        Self {
            listeners: ListenerStore::new(),
            clusters: ClusterStore::new(),
            publisher: Publisher::new(node_id, endpoint),
            publish_timeout,
        }
    }

    pub fn node_id(&self) -> &str {
        self.publisher.node_id()
    }

    /// Last snapshot version handed out, 0 before the first publish.
    pub fn last_version(&self) -> u64 {
        self.publisher.last_version()
    }

    pub fn listeners(&self) -> &ListenerStore {
        &self.listeners
    }

    pub fn clusters(&self) -> &ClusterStore {
        &self.clusters
    }

    pub fn set_listener(&self, listener: Listener) -> bool {
        self.listeners.set(listener)
    }

    pub fn remove_listener(&self, name: &str) -> bool {
        self.listeners.remove(name)
    }

    pub fn set_cluster(&self, cluster: Cluster) -> bool {
        self.clusters.set(cluster)
    }

    pub fn remove_cluster(&self, name: &str) -> bool {
        self.clusters.remove(name)
    }

    /// Publishes the current store contents. A timed-out publish still
    /// consumes its version.
    pub async fn publish(&self) -> Result<String, PublishError> {
        tokio::time::timeout(
            self.publish_timeout,
            self.publisher.publish(&self.listeners, &self.clusters),
        )
        .await
        .map_err(|_| PublishError::Timeout(self.publish_timeout))?
    }
}
