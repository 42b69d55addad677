// Wire-level resource representation shared by listeners and clusters.

use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Resource types served by the discovery endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceType {
    Cluster,
    Listener,
}

impl ResourceType {
    pub fn type_url(self) -> &'static str {
        match self {
            ResourceType::Cluster => "type.googleapis.com/envoy.config.cluster.v3.Cluster",
            ResourceType::Listener => "type.googleapis.com/envoy.config.listener.v3.Listener",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceType::Cluster => "cluster",
            ResourceType::Listener => "listener",
        })
    }
}

/// A named resource in the proxy's v3 JSON form.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub name: String,
    pub kind: ResourceType,
    pub body: Value,
}

/// Conversion from the in-memory model to the wire form.
pub trait ToResource: Send + Sync {
    const KIND: ResourceType;

    fn name(&self) -> &str;

    fn to_resource(&self) -> Resource;
}

/// Formats a duration the way proto3 JSON expects it ("1s", "0.250s").
pub(crate) fn proto_duration(d: Duration) -> String {
    let nanos = d.subsec_nanos();
    if nanos == 0 {
        return format!("{}s", d.as_secs());
    }
    let secs = d.as_secs();
    if nanos % 1_000_000 == 0 {
        format!("{secs}.{:03}s", nanos / 1_000_000)
    } else if nanos % 1_000 == 0 {
        format!("{secs}.{:06}s", nanos / 1_000)
    } else {
        format!("{secs}.{nanos:09}s")
    }
}
