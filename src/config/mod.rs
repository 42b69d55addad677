// Configuration loading and management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::health::HealthCheck;
use crate::xds::{LbPolicy, TcpKeepAlive};

pub const PROD: &str = "prod";
pub const DEV: &str = "dev";
pub const TEST: &str = "test";

/// Config files tried, in order, when no path is given on the command line.
pub const DEFAULT_PATHS: &[&str] = &["cfg/edgeward.cfg.local.yaml", "cfg/edgeward.cfg.yaml"];

const MAX_RETRIES: u32 = 100;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown env {0:?}, expected one of prod, dev, test")]
    UnknownEnv(String),
    #[error("{0} must be a non-zero port")]
    ZeroPort(&'static str),
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("{0} must be a non-zero duration")]
    ZeroDuration(&'static str),
    #[error("proxy.health.retries must be at most 100, got {0}")]
    TooManyRetries(u32),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub supervisor: Supervisor,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Supervisor {
    pub env: String,
    pub logs: Logs,
    pub listener: Listener,
    pub proxy: Proxy,
    pub service: Service,
    pub discovery: Discovery,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self {
            env: DEV.to_string(),
            logs: Logs::default(),
            listener: Listener::default(),
            proxy: Proxy::default(),
            service: Service::default(),
            discovery: Discovery::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Logs {
    pub level: String,
}

impl Default for Logs {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Public data-plane listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Listener {
    pub name: String,
    pub port: u16,
    pub domain: String,
}

impl Default for Listener {
    fn default() -> Self {
        Self {
            name: "entrypoint".to_string(),
            port: 8080,
            domain: "*".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Proxy {
    pub binary: String,
    pub admin_port: u16,
    #[serde(with = "humantime_serde")]
    pub stop_timeout: Duration,
    pub health: Health,
}

impl Default for Proxy {
    fn default() -> Self {
        Self {
            binary: "envoy".to_string(),
            admin_port: 9901,
            stop_timeout: Duration::from_secs(1),
            health: Health::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Health {
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub retries: u32,
    #[serde(with = "humantime_serde")]
    pub start_period: Duration,
    #[serde(with = "humantime_serde")]
    pub start_interval: Duration,
}

impl Default for Health {
    fn default() -> Self {
        let check = HealthCheck::default();
        Self {
            interval: check.interval,
            timeout: check.timeout,
            retries: check.retries,
            start_period: check.start_period,
            start_interval: check.start_interval,
        }
    }
}

impl From<&Health> for HealthCheck {
    fn from(h: &Health) -> Self {
        HealthCheck {
            interval: h.interval,
            timeout: h.timeout,
            retries: h.retries,
            start_period: h.start_period,
            start_interval: h.start_interval,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Service {
    /// Environment variable carrying the allocated port to the service.
    pub port_env: String,
    #[serde(with = "humantime_serde")]
    pub stop_timeout: Duration,
    pub cluster: ServiceCluster,
}

impl Default for Service {
    fn default() -> Self {
        Self {
            port_env: "PORT".to_string(),
            stop_timeout: Duration::from_secs(1),
            cluster: ServiceCluster::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceCluster {
    pub name: String,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    pub lb_policy: LbPolicy,
    pub tcp_keepalive: Option<TcpKeepAlive>,
}

impl Default for ServiceCluster {
    fn default() -> Self {
        Self {
            name: "service".to_string(),
            connect_timeout: Duration::from_secs(1),
            lb_policy: LbPolicy::RoundRobin,
            tcp_keepalive: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Discovery {
    pub node_id: String,
    /// 0 allocates a free loopback port at startup.
    pub port: u16,
    #[serde(with = "humantime_serde")]
    pub publish_timeout: Duration,
}

impl Default for Discovery {
    fn default() -> Self {
        Self {
            node_id: "edgeward".to_string(),
            port: 0,
            publish_timeout: Duration::from_secs(3),
        }
    }
}

impl Config {
    /// Loads configuration from a YAML file. Missing fields take defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let abs_path = path
            .canonicalize()
            .with_context(|| format!("failed to resolve absolute config filepath: {:?}", path))?;

        let data = std::fs::read_to_string(&abs_path)
            .with_context(|| format!("read config yaml file {:?}", abs_path))?;

        let cfg: Config = serde_yaml::from_str(&data)
            .with_context(|| format!("unmarshal yaml from {:?}", abs_path))?;

        cfg.validate()
            .with_context(|| format!("invalid config {:?}", abs_path))?;
        Ok(cfg)
    }

    /// Loads `explicit` if given, otherwise the first of [`DEFAULT_PATHS`]
    /// found under `dir`, otherwise the built-in defaults.
    pub fn discover(dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        match Self::locate(dir, explicit) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn locate(dir: &Path, explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        DEFAULT_PATHS
            .iter()
            .map(|p| dir.join(p))
            .find(|p| p.is_file())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.supervisor;
        if ![PROD, DEV, TEST].contains(&s.env.as_str()) {
            return Err(ConfigError::UnknownEnv(s.env.clone()));
        }
        if s.listener.port == 0 {
            return Err(ConfigError::ZeroPort("listener.port"));
        }
        if s.proxy.admin_port == 0 {
            return Err(ConfigError::ZeroPort("proxy.admin_port"));
        }
        for (field, value) in [
            ("listener.name", &s.listener.name),
            ("listener.domain", &s.listener.domain),
            ("proxy.binary", &s.proxy.binary),
            ("service.port_env", &s.service.port_env),
            ("service.cluster.name", &s.service.cluster.name),
            ("discovery.node_id", &s.discovery.node_id),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Empty(field));
            }
        }
        for (field, value) in [
            ("proxy.stop_timeout", s.proxy.stop_timeout),
            ("proxy.health.interval", s.proxy.health.interval),
            ("proxy.health.timeout", s.proxy.health.timeout),
            ("service.stop_timeout", s.service.stop_timeout),
            ("service.cluster.connect_timeout", s.service.cluster.connect_timeout),
            ("discovery.publish_timeout", s.discovery.publish_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration(field));
            }
        }
        if s.proxy.health.retries > MAX_RETRIES {
            return Err(ConfigError::TooManyRetries(s.proxy.health.retries));
        }
        Ok(())
    }

    /// Applies command-line overrides on top of the file values.
    pub fn with_overrides(mut self, port: Option<u16>, domain: Option<String>) -> Self {
        if let Some(port) = port {
            self.supervisor.listener.port = port;
        }
        if let Some(domain) = domain {
            self.supervisor.listener.domain = domain;
        }
        self
    }

    pub fn is_prod(&self) -> bool {
        self.supervisor.env == PROD
    }

    pub fn is_test(&self) -> bool {
        self.supervisor.env == TEST
    }

    pub fn health_check(&self) -> HealthCheck {
        HealthCheck::from(&self.supervisor.proxy.health)
    }
}


// Test config is always available for integration tests
mod test_config;
#[allow(dead_code)]
pub use test_config::new_test_config;
