//! rsched random scheduler
//!
//! Watches for unplaced units addressed to `random-scheduler`, binds each to
//! a uniformly chosen host and records a `Scheduled` event.
//!
//! Exits non-zero when the unit watch cannot be opened or is lost; the
//! process supervisor is expected to restart it. SIGINT or SIGTERM stops the
//! loop once the unit in flight is done.

use std::sync::Arc;

use anyhow::{Context, Result};
use rsched_scheduler::{
    Config, HttpClusterClient, RandomSelector, Scheduler, ShutdownSignals, SCHEDULER_NAME,
};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str())),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    info!(
        scheduler = SCHEDULER_NAME,
        api_server_url = %config.api_server_url,
        request_timeout_secs = config.request_timeout.as_secs(),
        "Starting rsched scheduler"
    );

    let client = Arc::new(HttpClusterClient::new(&config)?);
    let mut scheduler = Scheduler::new(
        SCHEDULER_NAME,
        client,
        Box::new(RandomSelector::from_os_rng()),
    );

    // Install signal handlers before any work starts
    let mut signals = ShutdownSignals::new().context("failed to install signal handlers")?;

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    let result = tokio::select! {
        result = &mut handle => result,
        signal = signals.recv() => {
            info!(signal, "Received shutdown signal");
            let _ = shutdown_tx.send(true);
            handle.await
        }
    };

    match result {
        Ok(Ok(stats)) => {
            info!(
                units_placed = stats.units_placed,
                units_failed = stats.units_failed,
                "Scheduler shutdown complete"
            );
            Ok(())
        }
        Ok(Err(e)) => {
            error!(error = %e, "Scheduler stopped");
            Err(e.into())
        }
        Err(e) => {
            error!(error = %e, "Scheduler task panicked");
            Err(e.into())
        }
    }
}
