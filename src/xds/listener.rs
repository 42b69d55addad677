// Listener definitions and their filter chains.

use serde_json::{json, Value};

use super::address::SocketAddress;
use super::resource::{Resource, ResourceType, ToResource};

const TCP_PROXY: &str = "envoy.filters.network.tcp_proxy";
const HTTP_CONNECTION_MANAGER: &str = "envoy.filters.network.http_connection_manager";
const ROUTER: &str = "envoy.filters.http.router";
const STDOUT_ACCESS_LOG: &str = "envoy.access_loggers.stdout";

/// A named network listener with ordered filter chains.
#[derive(Debug, Clone, PartialEq)]
pub struct Listener {
    pub name: String,
    pub address: SocketAddress,
    pub filter_chains: Vec<Vec<Filter>>,
}

/// Network filters. The set is closed: every variant has a wire form.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    TcpProxy { cluster: String },
    HttpProxy(HttpProxy),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpProxy {
    pub http_filters: Vec<HttpFilter>,
    pub route_config: RouteConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpFilter {
    Router,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteConfig {
    pub name: String,
    pub virtual_hosts: Vec<VirtualHost>,
}

/// Routes every path of the matching domains to one cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualHost {
    pub name: String,
    pub domains: Vec<String>,
    pub cluster: String,
}

impl Listener {
    /// An HTTP listener with a single virtual host forwarding `domains` to
    /// `cluster`.
    pub fn http(
        name: impl Into<String>,
        address: SocketAddress,
        domains: Vec<String>,
        cluster: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let cluster = cluster.into();
        let proxy = HttpProxy {
            http_filters: vec![HttpFilter::Router],
            route_config: RouteConfig {
                name: format!("{name}-routes"),
                virtual_hosts: vec![VirtualHost {
                    name: cluster.clone(),
                    domains,
                    cluster,
                }],
            },
        };
        Self {
            name,
            address,
            filter_chains: vec![vec![Filter::HttpProxy(proxy)]],
        }
    }

    /// Names of every cluster this listener forwards to, in chain order.
    pub fn referenced_clusters(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for filter in self.filter_chains.iter().flatten() {
            match filter {
                Filter::TcpProxy { cluster } => names.push(cluster.as_str()),
                Filter::HttpProxy(proxy) => names.extend(
                    proxy
                        .route_config
                        .virtual_hosts
                        .iter()
                        .map(|vh| vh.cluster.as_str()),
                ),
            }
        }
        names
    }
}

impl Filter {
    fn to_wire(&self) -> Value {
        match self {
            Filter::TcpProxy { cluster } => json!({
                "name": TCP_PROXY,
                "typed_config": {
                    "@type": "type.googleapis.com/envoy.extensions.filters.network.tcp_proxy.v3.TcpProxy",
                    "stat_prefix": cluster,
                    "cluster": cluster,
                },
            }),
            Filter::HttpProxy(proxy) => json!({
                "name": HTTP_CONNECTION_MANAGER,
                "typed_config": {
                    "@type": "type.googleapis.com/envoy.extensions.filters.network.http_connection_manager.v3.HttpConnectionManager",
                    "stat_prefix": "ingress_http",
                    "codec_type": "AUTO",
                    "access_log": [{
                        "name": STDOUT_ACCESS_LOG,
                        "typed_config": {
                            "@type": "type.googleapis.com/envoy.extensions.access_loggers.stream.v3.StdoutAccessLog",
                        },
                    }],
                    "http_filters": proxy.http_filters.iter().map(HttpFilter::to_wire).collect::<Vec<_>>(),
                    "route_config": proxy.route_config.to_wire(),
                },
            }),
        }
    }
}

impl HttpFilter {
    fn to_wire(&self) -> Value {
        match self {
            HttpFilter::Router => json!({
                "name": ROUTER,
                "typed_config": {
                    "@type": "type.googleapis.com/envoy.extensions.filters.http.router.v3.Router",
                },
            }),
        }
    }
}

impl RouteConfig {
    fn to_wire(&self) -> Value {
        let hosts: Vec<Value> = self
            .virtual_hosts
            .iter()
            .map(|vh| {
                json!({
                    "name": vh.name,
                    "domains": vh.domains,
                    "routes": [{
                        "match": { "prefix": "/" },
                        "route": { "cluster": vh.cluster },
                    }],
                })
            })
            .collect();
        json!({
            "name": self.name,
            "virtual_hosts": hosts,
        })
    }
}

impl ToResource for Listener {
    const KIND: ResourceType = ResourceType::Listener;

    fn name(&self) -> &str {
        &self.name
    }

    fn to_resource(&self) -> Resource {
        // Chains without filters carry nothing for the proxy.
        let chains: Vec<Value> = self
            .filter_chains
            .iter()
            .filter(|chain| !chain.is_empty())
            .map(|chain| {
                json!({ "filters": chain.iter().map(Filter::to_wire).collect::<Vec<_>>() })
            })
            .collect();

        Resource {
            name: self.name.clone(),
            kind: Self::KIND,
            body: json!({
                "@type": Self::KIND.type_url(),
                "name": self.name,
                "address": self.address.to_wire(false),
                "filter_chains": chains,
            }),
        }
    }
}
