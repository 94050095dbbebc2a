//! Registrator daemon entry point.

use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};
use tokio::signal;
use tokio::sync::mpsc;

mod config;
mod dispatcher;
mod error;
mod metadata;
mod naming;
mod ports;
mod registration;
mod runtime;
mod transport;
mod types;

use config::{version_banner, Cli, Config};
use dispatcher::Dispatcher;
use runtime::{ContainerRuntime, DockerRuntime};
use transport::HttpRegistry;

const EVENT_CHANNEL_CAPACITY: usize = 128;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("{}", version_banner());
        return Ok(());
    }

    // Load configuration
    let cfg = Config::load(&cli)?;

    // Initialize logging
    let default_level = if cfg.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    info!("{}", version_banner().replace('\n', ", "));
    info!("Starting registrator with config: {:?}", cfg);
    if cfg.address.is_empty() {
        warn!("No advertised address configured, registrations will carry an empty ip");
    }

    // Container Runtime (Docker); failing here is fatal
    let runtime = match DockerRuntime::connect(cfg.docker_socket.as_deref(), cfg.register_existing).await {
        Ok(runtime) => Arc::new(runtime),
        Err(e) => {
            error!("Unable to start client: {}", e);
            return Err(e.into());
        }
    };

    let registry = HttpRegistry::new(&cfg)?;

    // Event channel
    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

    let monitor_runtime = Arc::clone(&runtime);
    let monitor_handle = tokio::spawn(async move {
        if let Err(e) = monitor_runtime.monitor(event_tx).await {
            error!("Container runtime failed: {}", e);
        }
    });

    let dispatcher = Dispatcher::new(runtime, registry, cfg.address.clone());
    let dispatch_handle = tokio::spawn(dispatcher.run(event_rx));

    // Graceful Shutdown
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl+C, shutting down...");
        }
        Err(err) => {
            error!("Unable to listen for shutdown signal: {}", err);
        }
    }

    // Abort tasks; an in-flight registration is abandoned
    monitor_handle.abort();
    dispatch_handle.abort();

    info!("Shutdown complete.");
    Ok(())
}
