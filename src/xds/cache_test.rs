//! Tests for the in-memory snapshot cache.

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::xds::{DiscoveryEndpoint, Resource, ResourceType, Snapshot, SnapshotCache, SubmitError};

    fn cluster(name: &str) -> Resource {
        Resource {
            name: name.to_string(),
            kind: ResourceType::Cluster,
            body: json!({ "name": name }),
        }
    }

    fn snapshot(version: &str, clusters: Vec<Resource>) -> Snapshot {
        Snapshot::new(
            version,
            [(ResourceType::Cluster, clusters), (ResourceType::Listener, vec![])],
        )
    }

    #[tokio::test]
    async fn test_serves_latest_snapshot() {
        let cache = SnapshotCache::new();
        assert!(cache.latest("edgeward").is_none());

        cache
            .submit_snapshot("edgeward", snapshot("1", vec![cluster("a")]))
            .await
            .expect("accepted");
        cache
            .submit_snapshot("edgeward", snapshot("2", vec![cluster("b")]))
            .await
            .expect("accepted");

        let latest = cache.latest("edgeward").expect("snapshot");
        assert_eq!(latest.version(), "2");
        assert!(latest.find(ResourceType::Cluster, "b").is_some());
        assert!(cache.latest("other-node").is_none());
    }

    #[tokio::test]
    async fn test_watchers_wake_on_new_version_only() {
        let cache = SnapshotCache::new();
        let mut rx = cache.watch("edgeward");
        assert!(rx.borrow().is_none());

        cache
            .submit_snapshot("edgeward", snapshot("1", vec![cluster("a")]))
            .await
            .expect("accepted");
        assert!(rx.has_changed().expect("sender alive"));
        let seen = rx.borrow_and_update().clone().expect("snapshot");
        assert_eq!(seen.version(), "1");

        // Same version again: accepted, nobody woken, first content kept.
        cache
            .submit_snapshot("edgeward", snapshot("1", vec![cluster("z")]))
            .await
            .expect("accepted");
        assert!(!rx.has_changed().expect("sender alive"));
        let latest = cache.latest("edgeward").expect("snapshot");
        assert!(latest.find(ResourceType::Cluster, "a").is_some());
    }

    #[tokio::test]
    async fn test_rejects_malformed_snapshots() {
        let cache = SnapshotCache::new();

        let err = cache
            .submit_snapshot("n", snapshot("", vec![]))
            .await
            .unwrap_err();
        assert_eq!(err, SubmitError::EmptyVersion);

        let err = cache
            .submit_snapshot("n", snapshot("1", vec![cluster("")]))
            .await
            .unwrap_err();
        assert_eq!(err, SubmitError::EmptyName { kind: ResourceType::Cluster });

        let err = cache
            .submit_snapshot("n", snapshot("1", vec![cluster("a"), cluster("a")]))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SubmitError::DuplicateName {
                kind: ResourceType::Cluster,
                name: "a".into()
            }
        );

        let mixed = Snapshot::new("1", [(ResourceType::Listener, vec![cluster("a")])]);
        let err = cache.submit_snapshot("n", mixed).await.unwrap_err();
        assert!(matches!(err, SubmitError::WrongType { .. }));

        assert!(cache.latest("n").is_none());
    }
}
