// Upstream cluster definitions.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use super::address::SocketAddress;
use super::resource::{proto_duration, Resource, ResourceType, ToResource};

/// Load-balancing policy across a cluster's endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LbPolicy {
    #[default]
    RoundRobin,
    LeastRequest,
    RingHash,
    Random,
    Maglev,
}

impl LbPolicy {
    fn wire_name(self) -> &'static str {
        match self {
            LbPolicy::RoundRobin => "ROUND_ROBIN",
            LbPolicy::LeastRequest => "LEAST_REQUEST",
            LbPolicy::RingHash => "RING_HASH",
            LbPolicy::Random => "RANDOM",
            LbPolicy::Maglev => "MAGLEV",
        }
    }
}

/// Keepalive settings for upstream connections. Times are in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TcpKeepAlive {
    pub probes: u32,
    pub time: u32,
    pub interval: u32,
}

impl Default for TcpKeepAlive {
    fn default() -> Self {
        Self {
            probes: 9,
            time: 7200,
            interval: 75,
        }
    }
}

/// A named group of upstream endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub name: String,
    pub connect_timeout: Duration,
    pub lb_policy: LbPolicy,
    pub endpoints: Vec<SocketAddress>,
    pub tcp_keepalive: Option<TcpKeepAlive>,
}

impl Cluster {
    pub fn new(name: impl Into<String>, endpoints: Vec<SocketAddress>) -> Self {
        Self {
            name: name.into(),
            connect_timeout: Duration::from_secs(1),
            lb_policy: LbPolicy::default(),
            endpoints,
            tcp_keepalive: None,
        }
    }
}

impl ToResource for Cluster {
    const KIND: ResourceType = ResourceType::Cluster;

    fn name(&self) -> &str {
        &self.name
    }

    fn to_resource(&self) -> Resource {
        let lb_endpoints: Vec<Value> = self
            .endpoints
            .iter()
            .map(|addr| json!({ "endpoint": { "address": addr.to_wire(true) } }))
            .collect();

        let mut body = json!({
            "@type": Self::KIND.type_url(),
            "name": self.name,
            "connect_timeout": proto_duration(self.connect_timeout),
            "lb_policy": self.lb_policy.wire_name(),
            "load_assignment": {
                "cluster_name": self.name,
                "endpoints": [{ "lb_endpoints": lb_endpoints }],
            },
        });

        if let Some(ka) = self.tcp_keepalive {
            body["upstream_connection_options"] = json!({
                "tcp_keepalive": {
                    "keepalive_probes": ka.probes,
                    "keepalive_time": ka.time,
                    "keepalive_interval": ka.interval,
                }
            });
        }

        Resource {
            name: self.name.clone(),
            kind: Self::KIND,
            body,
        }
    }
}
