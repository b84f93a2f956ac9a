//! Hephaestus daemon: serves the HTTP API and runs the background
//! queue-sweep loop.

use std::sync::Arc;

use anyhow::{Context, Result};
use hp_core::config::Config;
use tracing::info;

mod daemon;

use daemon::Daemon;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    hp_telemetry::logging::init_logging("hp-daemon", &config.general.log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = std::process::id(),
        "hephaestus daemon starting"
    );

    let daemon = Arc::new(match &config.general.db_path {
        Some(path) => Daemon::open(config.clone(), path)
            .await
            .context("failed to open store")?,
        None => Daemon::new(config.clone())
            .await
            .context("failed to initialize store")?,
    });

    let router = daemon.api_router();

    let addr = format!("{}:{}", config.http.host, config.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    let background = tokio::spawn(daemon.clone().run_background_loop());

    let shutdown = daemon.shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received ctrl-c, shutting down");
        shutdown.trigger();
    });

    let shutdown_signal = daemon.shutdown.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_signal.subscribe().recv().await;
        })
        .await
        .context("server error")?;

    background.await.ok();
    Ok(())
}
