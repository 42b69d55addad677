// Supervisor application: one proxy, one service, one configuration.

use anyhow::{Context, Result};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::command::ServiceCommand;
use super::{proxy, service};
use crate::config::{self, Config};
use crate::net;
use crate::nursery;
use crate::shutdown::SignalWatcher;
use crate::xds::{Cluster, ControlPlane, DiscoveryEndpoint, Listener, SocketAddress};

/// Encapsulates everything one supervisor run needs.
pub struct App {
    cfg: Config,
    command: ServiceCommand,
    endpoint: Arc<dyn DiscoveryEndpoint>,
}

impl App {
    pub fn new(cfg: Config, service: &str, endpoint: Arc<dyn DiscoveryEndpoint>) -> Result<Self> {
        cfg.validate().context("invalid configuration")?;
        let command = ServiceCommand::parse(service)?;
        Ok(Self {
            cfg,
            command,
            endpoint,
        })
    }

    /// Runs until `parent` is cancelled, a signal arrives, or a task fails.
    /// Children are always stopped before this returns.
    pub async fn run(self, parent: &CancellationToken, signals: Option<SignalWatcher>) -> Result<()> {
        let App {
            cfg,
            command,
            endpoint,
        } = self;
        let s = &cfg.supervisor;
        let discovery_port = match s.discovery.port {
            0 => net::random_port().context("failed to allocate discovery port")?,
            port => port,
        };
        let plane = Arc::new(ControlPlane::new(
            s.discovery.node_id.clone(),
            endpoint,
            s.discovery.publish_timeout,
        ));

        info!(
            component = "app",
            event = "starting",
            node_id = %s.discovery.node_id,
            discovery_port,
            admin_port = s.proxy.admin_port,
            listener_port = s.listener.port,
            "application lifecycle"
        );

        let result = nursery::block(parent, |n| async move {
            if let Some(signals) = signals {
                n.spawn("signals", signals.run(n.token()));
            }

            proxy::start(&n, &s.proxy, plane.clone(), discovery_port)
                .context("failed to start proxy")?;
            let port = service::start(&n, &s.service, &command)
                .context("failed to start service process")?;

            populate(&plane, s, port);
            let version = plane
                .publish()
                .await
                .context("failed to create initial configuration snapshot")?;
            info!(
                component = "app",
                event = "started",
                version = %version,
                service_port = port,
                "application lifecycle"
            );
            Ok(())
        })
        .await;

        info!(component = "app", event = "stopped", "application lifecycle");
        result
    }
}

/// One cluster for the service and one HTTP listener routing the configured
/// domain to it.
fn populate(plane: &ControlPlane, s: &config::Supervisor, service_port: u16) {
    let c = &s.service.cluster;
    plane.set_cluster(Cluster {
        name: c.name.clone(),
        connect_timeout: c.connect_timeout,
        lb_policy: c.lb_policy,
        endpoints: vec![SocketAddress::from(SocketAddr::from((
            Ipv4Addr::LOCALHOST,
            service_port,
        )))],
        tcp_keepalive: c.tcp_keepalive,
    });
    plane.set_listener(Listener::http(
        s.listener.name.clone(),
        SocketAddress::from(SocketAddr::from((Ipv4Addr::UNSPECIFIED, s.listener.port))),
        vec![s.listener.domain.clone()],
        c.name.clone(),
    ));
}
