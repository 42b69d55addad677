//! Tests for the wire form of listeners, clusters and addresses.

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use crate::xds::resource::proto_duration;
    use crate::xds::{
        AddressError, Cluster, Filter, LbPolicy, Listener, ResourceType, SocketAddress,
        TcpKeepAlive, ToResource,
    };

    #[test]
    fn test_proto_duration() {
        assert_eq!(proto_duration(Duration::from_secs(1)), "1s");
        assert_eq!(proto_duration(Duration::from_millis(250)), "0.250s");
        assert_eq!(proto_duration(Duration::from_millis(1500)), "1.500s");
        assert_eq!(proto_duration(Duration::from_micros(1500)), "0.001500s");
        assert_eq!(proto_duration(Duration::from_nanos(1)), "0.000000001s");
    }

    #[test]
    fn test_cluster_wire_form() {
        let mut c = Cluster::new(
            "service",
            vec![SocketAddress::from(SocketAddr::from(([127, 0, 0, 1], 9000)))],
        );
        c.lb_policy = LbPolicy::LeastRequest;
        let res = c.to_resource();

        assert_eq!(res.kind, ResourceType::Cluster);
        assert_eq!(res.name, "service");
        assert_eq!(res.body["@type"], ResourceType::Cluster.type_url());
        assert_eq!(res.body["connect_timeout"], "1s");
        assert_eq!(res.body["lb_policy"], "LEAST_REQUEST");
        let socket = &res.body["load_assignment"]["endpoints"][0]["lb_endpoints"][0]["endpoint"]
            ["address"]["socket_address"];
        assert_eq!(socket["address"], "127.0.0.1");
        assert_eq!(socket["port_value"], 9000);
        assert_eq!(socket["ipv4_compat"], true);
        assert!(res.body.get("upstream_connection_options").is_none());
    }

    #[test]
    fn test_cluster_keepalive() {
        let mut c = Cluster::new("service", vec![]);
        c.tcp_keepalive = Some(TcpKeepAlive::default());
        let body = c.to_resource().body;

        let ka = &body["upstream_connection_options"]["tcp_keepalive"];
        assert_eq!(ka["keepalive_probes"], 9);
        assert_eq!(ka["keepalive_time"], 7200);
        assert_eq!(ka["keepalive_interval"], 75);
    }

    #[test]
    fn test_http_listener_routes_everything_to_cluster() {
        let l = Listener::http(
            "entrypoint",
            SocketAddress::from(SocketAddr::from(([0, 0, 0, 0], 8080))),
            vec!["*".into()],
            "service",
        );
        assert_eq!(l.referenced_clusters(), vec!["service"]);

        let body = l.to_resource().body;
        assert_eq!(body["address"]["socket_address"]["address"], "0.0.0.0");
        assert_eq!(body["address"]["socket_address"]["port_value"], 8080);

        let hcm = &body["filter_chains"][0]["filters"][0];
        assert_eq!(hcm["name"], "envoy.filters.network.http_connection_manager");
        let cfg = &hcm["typed_config"];
        assert_eq!(cfg["http_filters"][0]["name"], "envoy.filters.http.router");
        assert_eq!(cfg["access_log"][0]["name"], "envoy.access_loggers.stdout");

        let vh = &cfg["route_config"]["virtual_hosts"][0];
        assert_eq!(vh["domains"][0], "*");
        assert_eq!(vh["routes"][0]["match"]["prefix"], "/");
        assert_eq!(vh["routes"][0]["route"]["cluster"], "service");
    }

    #[test]
    fn test_tcp_listener_and_empty_chains() {
        let l = Listener {
            name: "tcp".into(),
            address: SocketAddress::Host {
                host: "localhost".into(),
                port: 5432,
            },
            filter_chains: vec![
                vec![],
                vec![Filter::TcpProxy {
                    cluster: "db".into(),
                }],
            ],
        };
        let body = l.to_resource().body;

        let chains = body["filter_chains"].as_array().expect("chains");
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0]["filters"][0]["typed_config"]["cluster"], "db");
        assert_eq!(body["address"]["socket_address"]["address"], "localhost");
    }

    #[tokio::test]
    async fn test_resolve_known_and_unknown_hosts() {
        let addr = SocketAddress::resolve("localhost", 80).await.expect("localhost resolves");
        assert_eq!(addr.host_port(), ("localhost".to_string(), 80));
        assert_eq!(addr.to_string(), "localhost:80");

        let err = SocketAddress::resolve("no-such-host.invalid", 80)
            .await
            .expect_err("reserved TLD must not resolve");
        assert!(matches!(
            err,
            AddressError::Lookup { .. } | AddressError::NoAddresses(_)
        ));
    }
}
