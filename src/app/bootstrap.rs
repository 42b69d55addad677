// Proxy bootstrap file generation.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::io::Write;
use tempfile::TempPath;

const XDS_CLUSTER: &str = "xds_cluster";

/// Static part of the proxy configuration: who the node is, where the
/// aggregated discovery stream lives, and where the admin endpoint listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bootstrap {
    pub node_id: String,
    pub discovery_port: u16,
    pub admin_port: u16,
}

impl Bootstrap {
    pub fn to_value(&self) -> Value {
        let ads = json!({ "resource_api_version": "V3", "ads": {} });
        json!({
            "node": {
                "id": self.node_id,
                "cluster": self.node_id,
            },
            "dynamic_resources": {
                "ads_config": {
                    "api_type": "GRPC",
                    "transport_api_version": "V3",
                    "grpc_services": [{ "envoy_grpc": { "cluster_name": XDS_CLUSTER } }],
                },
                "lds_config": ads,
                "cds_config": ads,
            },
            "static_resources": {
                "clusters": [{
                    "name": XDS_CLUSTER,
                    "type": "STATIC",
                    "connect_timeout": "1s",
                    "typed_extension_protocol_options": {
                        "envoy.extensions.upstreams.http.v3.HttpProtocolOptions": {
                            "@type": "type.googleapis.com/envoy.extensions.upstreams.http.v3.HttpProtocolOptions",
                            "explicit_http_config": { "http2_protocol_options": {} },
                        },
                    },
                    "load_assignment": {
                        "cluster_name": XDS_CLUSTER,
                        "endpoints": [{
                            "lb_endpoints": [{
                                "endpoint": { "address": loopback(self.discovery_port) },
                            }],
                        }],
                    },
                }],
            },
            "admin": {
                "address": loopback(self.admin_port),
            },
        })
    }

    pub fn render(&self) -> Result<String> {
        serde_yaml::to_string(&self.to_value()).context("failed to render proxy bootstrap")
    }

    /// Writes the bootstrap to a temporary file. The file is removed when the
    /// returned path is dropped.
    pub fn write_temp(&self) -> Result<TempPath> {
        let mut file = tempfile::Builder::new()
            .prefix("edgeward-proxy-")
            .suffix(".yml")
            .tempfile()
            .context("failed to create temporary file for proxy bootstrap")?;
        file.write_all(self.render()?.as_bytes())
            .and_then(|()| file.flush())
            .context("failed to write proxy bootstrap")?;
        Ok(file.into_temp_path())
    }
}

fn loopback(port: u16) -> Value {
    json!({ "socket_address": { "address": "127.0.0.1", "port_value": port } })
}
