//! Geofence gateway - vehicle zone membership tracking service
//!
//! Ingests per-vehicle GPS fixes over HTTP, tracks which circular zone each
//! vehicle is in, and records enter/exit events.
//!
//! Module structure:
//! - `domain/` - Core types (Zone, Coordinate, VehicleStatus, ZoneEvent)
//! - `services/` - Zone catalog, containment, transitions, state store, event log
//! - `io/` - HTTP API and Prometheus formatting
//! - `infra/` - Config and metrics

use anyhow::Context;
use clap::Parser;
use geofence_gateway::infra::{Config, Metrics};
use geofence_gateway::io::{start_http_server, AppState};
use geofence_gateway::services::GeofenceService;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Geofence gateway - vehicle zone enter/exit detection
#[derive(Parser, Debug)]
#[command(name = "geofence-gateway", version, about)]
struct Args {
    /// Path to TOML configuration file (falls back to CONFIG_FILE, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default: INFO, use RUST_LOG=debug for per-update visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(version = %env!("CARGO_PKG_VERSION"), "geofence-gateway starting");

    let args = Args::parse();
    let config = Config::load(args.config.as_deref()).context("failed to load config")?;

    info!(
        config_file = %config.config_file(),
        site_id = %config.site_id(),
        bind_address = %config.bind_address(),
        port = %config.port(),
        zones = %config.zones().len(),
        events_max_retained = %config.events_max_retained(),
        events_default_limit = %config.events_default_limit(),
        "config_loaded"
    );

    // Invalid zone definitions abort startup
    let metrics = Arc::new(Metrics::new());
    let service = GeofenceService::from_config(&config, metrics.clone())
        .context("failed to load zone catalog")?;

    let state = Arc::new(AppState { service, site_id: config.site_id().to_string() });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Periodic metrics log line
    let report_state = state.clone();
    let metrics_interval = config.metrics_interval_secs().max(1);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            metrics.report(report_state.service.gauges()).log();
        }
    });

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    start_http_server(config.bind_address(), config.port(), state, shutdown_rx)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("http server failed")?;

    info!("geofence-gateway shutdown complete");
    Ok(())
}
