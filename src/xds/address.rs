// Socket addresses for listeners and upstream endpoints.

use serde_json::{json, Value};
use std::fmt;
use std::net::SocketAddr;

use super::error::AddressError;

/// Either a literal IP socket address or a host name the proxy resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketAddress {
    Ip(SocketAddr),
    Host { host: String, port: u16 },
}

impl SocketAddress {
    /// Accepts `host` only if it currently resolves to at least one address.
    pub async fn resolve(host: &str, port: u16) -> Result<Self, AddressError> {
        let mut addrs = tokio::net::lookup_host((host, port))
            .await
            .map_err(|source| AddressError::Lookup {
                host: host.to_string(),
                source,
            })?;
        if addrs.next().is_none() {
            return Err(AddressError::NoAddresses(host.to_string()));
        }
        Ok(SocketAddress::Host {
            host: host.to_string(),
            port,
        })
    }

    pub fn host_port(&self) -> (String, u16) {
        match self {
            SocketAddress::Ip(addr) => (addr.ip().to_string(), addr.port()),
            SocketAddress::Host { host, port } => (host.clone(), *port),
        }
    }

    pub(crate) fn to_wire(&self, ipv4_compat: bool) -> Value {
        let (host, port) = self.host_port();
        let mut socket = json!({
            "address": host,
            "port_value": port,
        });
        if ipv4_compat {
            socket["ipv4_compat"] = Value::Bool(true);
        }
        json!({ "socket_address": socket })
    }
}

impl From<SocketAddr> for SocketAddress {
    fn from(addr: SocketAddr) -> Self {
        SocketAddress::Ip(addr)
    }
}

impl fmt::Display for SocketAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketAddress::Ip(addr) => write!(f, "{addr}"),
            SocketAddress::Host { host, port } => write!(f, "{host}:{port}"),
        }
    }
}
