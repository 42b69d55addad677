//! Tests for snapshot versioning and publication.

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::support::RecordingEndpoint;
    use crate::xds::{
        Cluster, ControlPlane, Listener, PublishError, ResourceType, SocketAddress, SubmitError,
    };

    fn plane(endpoint: Arc<RecordingEndpoint>) -> ControlPlane {
        ControlPlane::new("edgeward", endpoint, Duration::from_secs(3))
    }

    fn addr(port: u16) -> SocketAddress {
        SocketAddress::from(SocketAddr::from(([127, 0, 0, 1], port)))
    }

    #[tokio::test]
    async fn test_sequential_publishes_count_up_from_one() {
        let endpoint = Arc::new(RecordingEndpoint::new());
        let cp = plane(endpoint.clone());
        cp.set_cluster(Cluster::new("service", vec![addr(9000)]));
        assert_eq!(cp.last_version(), 0);

        for expected in 1..=5 {
            let version = cp.publish().await.expect("publish");
            assert_eq!(version, expected.to_string());
        }
        assert_eq!(endpoint.versions(), vec!["1", "2", "3", "4", "5"]);
        assert_eq!(endpoint.node_ids(), vec!["edgeward"; 5]);
        assert_eq!(cp.last_version(), 5);
    }

    #[tokio::test]
    async fn test_concurrent_publishes_arrive_in_order() {
        let endpoint = Arc::new(RecordingEndpoint::new());
        endpoint.set_delay(Duration::from_millis(2));
        let cp = Arc::new(plane(endpoint.clone()));

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let cp = cp.clone();
                tokio::spawn(async move {
                    cp.set_cluster(Cluster::new(format!("c{i}"), vec![addr(9000 + i)]));
                    cp.publish().await
                })
            })
            .collect();
        for t in tasks {
            t.await.expect("join").expect("publish");
        }

        let delivered: Vec<u64> = endpoint
            .versions()
            .iter()
            .map(|v| v.parse().expect("numeric version"))
            .collect();
        assert_eq!(delivered, (1..=16).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn test_rejected_version_is_not_reused() {
        let endpoint = Arc::new(RecordingEndpoint::new());
        let cp = plane(endpoint.clone());
        endpoint.reject_next(SubmitError::EmptyVersion);

        let err = cp.publish().await.expect_err("first publish is rejected");
        match err {
            PublishError::Rejected { version, source } => {
                assert_eq!(version, "1");
                assert_eq!(source, SubmitError::EmptyVersion);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(cp.publish().await.expect("publish"), "2");
        assert_eq!(endpoint.versions(), vec!["2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_times_out() {
        let endpoint = Arc::new(RecordingEndpoint::new());
        endpoint.set_delay(Duration::from_secs(10));
        let cp = ControlPlane::new("edgeward", endpoint.clone(), Duration::from_millis(500));

        let err = cp.publish().await.expect_err("must time out");
        assert!(matches!(err, PublishError::Timeout(d) if d == Duration::from_millis(500)));
        assert!(endpoint.versions().is_empty());

        endpoint.set_delay(Duration::ZERO);
        assert_eq!(cp.publish().await.expect("publish"), "2");
    }

    #[tokio::test]
    async fn test_snapshot_carries_both_stores() {
        let endpoint = Arc::new(RecordingEndpoint::new());
        let cp = plane(endpoint.clone());
        cp.set_cluster(Cluster::new("service", vec![addr(9000)]));
        cp.set_listener(Listener::http(
            "entrypoint",
            SocketAddress::from(SocketAddr::from(([0, 0, 0, 0], 8080))),
            vec!["*".into()],
            "service",
        ));
        cp.publish().await.expect("publish");

        cp.remove_cluster("service");
        cp.publish().await.expect("publish");

        let snapshots = endpoint.snapshots();
        assert_eq!(snapshots[0].resources(ResourceType::Cluster).len(), 1);
        assert_eq!(snapshots[0].resources(ResourceType::Listener).len(), 1);
        assert!(snapshots[1].resources(ResourceType::Cluster).is_empty());
        assert!(snapshots[1].find(ResourceType::Listener, "entrypoint").is_some());
    }
}
