//! Multi-venue funding-rate arbitrage and hedge engine - entry point.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use hedge_venue::{MockAdapter, VenueAdapter};

/// Multi-venue funding-rate arbitrage and hedge engine.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via HEDGE_CONFIG env var).
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    hedge_telemetry::init_logging()?;
    info!("starting hedge-bot v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config_path = args
        .config
        .or_else(|| std::env::var("HEDGE_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    let config = if std::path::Path::new(&config_path).exists() {
        hedge_bot::AppConfig::from_file(&config_path)?
    } else {
        warn!(path = %config_path, "config file not found, using defaults");
        hedge_bot::AppConfig::default()
    };
    config.validate()?;
    info!(trade_asset = %config.trade_asset, auto_hedge = config.engine.auto_hedge, "configuration loaded");

    if config.venues.is_empty() {
        error!("no venues configured; at least two are required for cross-venue arbitrage");
        std::process::exit(1);
    }

    // Concrete venue SDKs are out of scope for this workspace;
    // every configured venue is backed by the in-memory MockAdapter until a
    // real integration is wired in by the embedding deployment.
    let adapters: Vec<Arc<dyn VenueAdapter>> = config
        .venues
        .keys()
        .map(|name| {
            warn!(venue = %name, "no concrete adapter wired for this venue, using MockAdapter");
            Arc::new(MockAdapter::new(name.as_str())) as Arc<dyn VenueAdapter>
        })
        .collect();

    let engine = Arc::new(hedge_bot::Engine::new(config.clone(), adapters));
    if config.engine.auto_hedge {
        engine.start_hedging();
    }

    let dashboard_state = engine.dashboard_state();
    let dashboard_config = config.dashboard.clone();
    tokio::spawn(async move {
        if let Err(err) = hedge_eventbus::run_server(dashboard_state, dashboard_config).await {
            error!(%err, "dashboard server failed");
        }
    });

    let run_engine = engine.clone();
    let run_handle = tokio::spawn(async move { run_engine.run().await });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    engine.request_shutdown();

    run_handle
        .await
        .map_err(|err| anyhow::anyhow!("engine task panicked: {err}"))??;

    Ok(())
}
