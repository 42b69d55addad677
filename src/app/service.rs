// Service process startup.

use anyhow::{Context, Result};
use tracing::info;

use super::child::supervise;
use super::command::ServiceCommand;
use crate::config;
use crate::net;
use crate::nursery::Nursery;
use crate::process::Process;

/// Allocates a port, starts the service with it and registers its
/// supervision tasks. Returns the allocated port.
pub(super) fn start(n: &Nursery, cfg: &config::Service, command: &ServiceCommand) -> Result<u16> {
    let port = net::random_port().context("failed to listen on random TCP port")?;
    let resolved = command.resolve(&cfg.port_env, port);

    let process = Process::launch("service", &resolved.program, &resolved.args, &resolved.env)
        .with_context(|| format!("failed to launch {:?}", command.raw()))?;
    info!(
        component = "app",
        event = "service_started",
        pid = process.pid(),
        port,
        command = %command.raw(),
        "service started"
    );

    supervise(n, process, cfg.stop_timeout, None);
    Ok(port)
}
