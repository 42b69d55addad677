// Proxy process startup and health supervision.

use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

use super::bootstrap::Bootstrap;
use super::child::supervise;
use crate::config;
use crate::health::{HealthCheck, HttpProbe, Monitor, State, Transition};
use crate::nursery::Nursery;
use crate::process::Process;
use crate::xds::ControlPlane;

/// Starts the proxy with a generated bootstrap and registers its exit watch,
/// health monitor, log forwarding and stop tasks.
pub(super) fn start(
    n: &Nursery,
    cfg: &config::Proxy,
    plane: Arc<ControlPlane>,
    discovery_port: u16,
) -> Result<()> {
    let bootstrap = Bootstrap {
        node_id: plane.node_id().to_string(),
        discovery_port,
        admin_port: cfg.admin_port,
    }
    .write_temp()?;

    let name = Path::new(&cfg.binary)
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "proxy".to_string());
    let process = Process::launch(
        name.clone(),
        &cfg.binary,
        [OsStr::new("-c"), bootstrap.as_os_str()],
        &[],
    )?;

    let probe = HttpProbe::loopback(cfg.admin_port).context("invalid proxy admin address")?;
    let (monitor, transitions) =
        Monitor::new(name.clone(), HealthCheck::from(&cfg.health), Arc::new(probe));

    supervise(n, process, cfg.stop_timeout, Some(bootstrap));

    let token = n.token();
    n.spawn(format!("{name}-health"), async move {
        monitor.run(token).await;
        Ok(())
    });
    n.spawn(format!("{name}-transitions"), on_transitions(name, transitions, plane));

    Ok(())
}

/// Healthy republishes the current configuration so a restarted proxy picks
/// it up. Publication failures are reported and left for the next transition.
async fn on_transitions(
    name: String,
    mut transitions: mpsc::UnboundedReceiver<Transition>,
    plane: Arc<ControlPlane>,
) -> Result<()> {
    while let Some(t) = transitions.recv().await {
        match t.to {
            State::Healthy => {
                info!(
                    component = "app",
                    event = "healthy",
                    process = %name,
                    from = %t.from,
                    "proxy is healthy"
                );
                if let Err(err) = plane.publish().await {
                    error!(
                        component = "app",
                        event = "publish_failed",
                        process = %name,
                        last_version = plane.last_version(),
                        error = %err,
                        "failed to republish configuration"
                    );
                }
            }
            State::Unhealthy => error!(
                component = "app",
                event = "unhealthy",
                process = %name,
                from = %t.from,
                reason = t.reason.as_deref().unwrap_or("unknown"),
                "proxy is not healthy"
            ),
            State::Starting => {}
        }
    }
    Ok(())
}
