//! Trend poller
//!
//! Entry point. Loads configuration, initialises structured logging,
//! connects to Redis (fatal if unreachable), and runs the poll loop until
//! SIGINT/SIGTERM.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

use trend_poller::config::{self, AppConfig};
use trend_poller::engine::orchestrator::FetchOrchestrator;
use trend_poller::engine::publisher::SnapshotPublisher;
use trend_poller::engine::scheduler::Scheduler;
use trend_poller::providers;
use trend_poller::store::redis_store::RedisStore;
use trend_poller::store::Keyspace;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let config_path = std::env::var("TREND_POLLER_CONFIG")
        .unwrap_or_else(|_| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = AppConfig::load(&config_path)?;

    info!(
        poll_interval_secs = cfg.poller.poll_interval_secs,
        fetch_limit = cfg.poller.fetch_limit,
        provider_timeout_secs = cfg.poller.provider_timeout_secs,
        "Trend poller starting up"
    );

    // -- Store (fatal if unreachable) --------------------------------------

    let store = match RedisStore::connect(&cfg.store.redis_url).await {
        Ok(store) => store,
        Err(e) => {
            error!(error = %format!("{e:#}"), url = %cfg.store.redis_url, "Cannot reach Redis");
            return Err(e).context("store unreachable at startup");
        }
    };
    info!(url = %cfg.store.redis_url, "Connected to Redis");

    // -- Pipeline ----------------------------------------------------------

    let publisher = SnapshotPublisher::new(
        Arc::new(store),
        Keyspace::from_config(&cfg.store),
        Duration::from_secs(cfg.store.ttl_secs),
    );

    let orchestrator = FetchOrchestrator::new(
        providers::build_enabled(&cfg.providers),
        publisher,
        cfg.poller.fetch_limit,
        cfg.poller.provider_timeout(),
    );

    let scheduler = Scheduler::new(Arc::new(orchestrator), cfg.poller.poll_interval());

    // -- Shutdown wiring ---------------------------------------------------

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received.");
        let _ = shutdown_tx.send(true);
    });

    let cycles = scheduler.run(shutdown_rx).await;
    info!(cycles, "Trend poller shut down cleanly.");

    Ok(())
}

/// Resolve on ctrl-c, or SIGTERM on Unix.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler, using ctrl-c only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trend_poller=info"));

    let json_logging = std::env::var("TREND_POLLER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
