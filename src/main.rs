// Main entrypoint for the edgeward supervisor.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use edgeward::app::App;
use edgeward::config::Config;
use edgeward::shutdown::SignalWatcher;
use edgeward::xds::SnapshotCache;

/// edgeward - runs a service behind a reverse proxy and keeps the proxy
/// configured for it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:\n  edgeward 'deno run -A ./main.ts --port=$PORT'\n  edgeward -p 80 -d example.com 'LOG=debug python main.py'")]
struct Args {
    /// Custom config file path
    #[arg(long, value_name = "FILE")]
    cfg: Option<PathBuf>,

    /// Enable debug logs
    #[arg(long)]
    debug: bool,

    /// Listening port
    #[arg(short, long)]
    port: Option<u16>,

    /// Service domain name
    #[arg(short, long)]
    domain: Option<String>,

    /// Service command line; $PORT expands to the port allocated to it
    #[arg(value_name = "SERVICE", required = true, num_args = 1)]
    service: String,
}

/// Loads the configuration: explicit file, then local file, then shared
/// file, then built-in defaults.
fn load_cfg(path: Option<&Path>) -> Result<(Config, Option<PathBuf>)> {
    let found = Config::locate(Path::new("."), path);
    let cfg = match &found {
        Some(p) => Config::load(p).with_context(|| format!("failed to load config from {:?}", p))?,
        None => Config::default(),
    };
    Ok((cfg, found))
}

/// Configures structured logging based on configuration.
fn configure_logger(cfg: &Config, debug: bool) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let log_level = if debug {
        "debug"
    } else {
        cfg.supervisor.logs.level.as_str()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if cfg.is_prod() {
        // Production: JSON format
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        // Development: Pretty console format
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .init();
    }
}

fn main() {
    let args = Args::parse();

    let (cfg, path) = match load_cfg(args.cfg.as_deref()) {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("edgeward: {err:#}");
            std::process::exit(1);
        }
    };
    let cfg = cfg.with_overrides(args.port, args.domain.clone());

    // Logger needs the config for level and format.
    configure_logger(&cfg, args.debug);
    info!(
        component = "config",
        event = "load_success",
        path = ?path,
        "config loaded"
    );

    let result = tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")
        .and_then(|rt| rt.block_on(async_main(cfg, args.service)));

    if let Err(err) = result {
        error!(
            component = "main",
            event = "run_failed",
            error = %format!("{err:#}"),
            "unexpected error occurred"
        );
        std::process::exit(1);
    }
}

async fn async_main(cfg: Config, service: String) -> Result<()> {
    let shutdown_token = CancellationToken::new();
    let signals = SignalWatcher::install().context("failed to install signal handlers")?;

    let cache = Arc::new(SnapshotCache::new());
    let node_id = cfg.supervisor.discovery.node_id.clone();

    // Reports every snapshot the discovery endpoint starts serving.
    let mut updates = cache.watch(&node_id);
    let watch_token = shutdown_token.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = updates.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    if let Some(snapshot) = updates.borrow_and_update().clone() {
                        debug!(
                            component = "xds",
                            event = "snapshot_served",
                            node_id = %node_id,
                            version = %snapshot.version()
                        );
                    }
                }
                _ = watch_token.cancelled() => return,
            }
        }
    });

    let app = App::new(cfg, &service, cache)?;
    let result = app.run(&shutdown_token, Some(signals)).await;
    shutdown_token.cancel();
    result
}
