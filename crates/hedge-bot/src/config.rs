//! Top-level application configuration.
//!
//! One struct with `#[serde(default)]` nested sections, loaded from TOML
//! via `HEDGE_CONFIG` (falling back to `config/default.toml`, then to pure
//! defaults if even that is missing).

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use hedge_detector::DetectorConfig;
use hedge_engine::EngineConfig;
use hedge_eventbus::DashboardConfig;
use hedge_rebalancer::RebalancerConfig;
use hedge_risk::RiskConfig;

use crate::error::{AppError, AppResult};

fn default_history_cap() -> usize {
    200
}

fn default_trade_asset() -> String {
    "USDT".to_string()
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

fn default_polling_interval_ms() -> u64 {
    30_000
}

/// Per-venue credentials. Concrete venue SDKs are out of scope for this
/// workspace; these fields exist so a deployment's TOML can
/// name its venues and secrets even though this workspace only ships a
/// `MockAdapter` to stand in for them.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VenueCredentialsConfig {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub proxy: Option<String>,
}

/// Best-effort notification delivery endpoints. Never gates
/// engine behavior; delivery is a collaborator concern outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NotificationConfig {
    pub webhook: Option<String>,
    pub chat: Option<String>,
}

/// Aggregator poll cadence, expressed in milliseconds as
/// `polling_interval_ms` (the `hedge_market::AggregatorConfig` type itself
/// uses `Duration` and is built from this at startup).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorSettings {
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            polling_interval_ms: default_polling_interval_ms(),
        }
    }
}

impl AggregatorSettings {
    #[must_use]
    pub fn to_aggregator_config(&self) -> hedge_market::AggregatorConfig {
        let poll_interval = std::time::Duration::from_millis(self.polling_interval_ms);
        hedge_market::AggregatorConfig {
            poll_interval,
            per_call_timeout: poll_interval / 2,
        }
    }
}

/// Startup history preload, an optional collaborator. Disabled by default;
/// failures are always tolerated.
/// `symbols` lists the (venue, symbol) pairs worth backfilling before the
/// first live poll — the store has no symbols to iterate until then.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PersistenceSettings {
    pub enabled: bool,
    pub history_url: Option<String>,
    pub symbols: Vec<String>,
}

/// Application configuration, assembled from every component's own
/// `#[serde(default)]` config type plus the ambient top-level knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Bounded history retained per (venue, symbol) in the `MarketStore`.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    /// Default settlement asset for balance rebalancing.
    #[serde(default = "default_trade_asset")]
    pub trade_asset: String,
    /// Grace period for in-flight I/O on cancellation.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    #[serde(default)]
    pub aggregator: AggregatorSettings,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub rebalancer: RebalancerConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub persistence: PersistenceSettings,
    #[serde(default)]
    pub venues: HashMap<String, VenueCredentialsConfig>,
    #[serde(default)]
    pub notification: NotificationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            history_cap: default_history_cap(),
            trade_asset: default_trade_asset(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            aggregator: AggregatorSettings::default(),
            detector: DetectorConfig::default(),
            engine: EngineConfig::default(),
            risk: RiskConfig::default(),
            rebalancer: RebalancerConfig::default(),
            dashboard: DashboardConfig::default(),
            persistence: PersistenceSettings::default(),
            venues: HashMap::new(),
            notification: NotificationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads from `HEDGE_CONFIG` (default `config/default.toml`); a missing
    /// file falls back to pure defaults with a warning, matching the
    /// teacher's `AppConfig::load()`.
    pub fn load() -> AppResult<Self> {
        let config_path =
            std::env::var("HEDGE_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("failed to read config: {e}")))?;
        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("failed to parse config: {e}")))
    }

    /// Overrides `rebalancer.asset` with `trade_asset` unless the TOML set
    /// an explicit value for it, so the top-level `trade_asset` default
    /// ("USDT") governs unless a deployment opts into something more
    /// specific for the rebalancer alone.
    pub fn resolved_rebalancer_config(&self) -> RebalancerConfig {
        let mut cfg = self.rebalancer.clone();
        cfg.asset = self.trade_asset.clone();
        cfg
    }

    pub fn validate(&self) -> AppResult<()> {
        self.detector
            .validate()
            .map_err(|e| AppError::Config(format!("detector config: {e}")))?;
        self.engine
            .validate()
            .map_err(|e| AppError::Config(format!("engine config: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.trade_asset, "USDT");
        assert_eq!(cfg.history_cap, 200);
    }

    #[test]
    fn test_toml_round_trip_with_partial_overrides() {
        let toml_src = r#"
            trade_asset = "USDC"

            [risk]
            max_exposure = "0.2"
        "#;
        let cfg: AppConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(cfg.trade_asset, "USDC");
        assert_eq!(cfg.risk.max_exposure, rust_decimal_macros::dec!(0.2));
        // Untouched sections still carry their own defaults.
        assert_eq!(cfg.detector.warning, rust_decimal_macros::dec!(0.0005));
    }

    #[test]
    fn test_resolved_rebalancer_config_uses_trade_asset() {
        let mut cfg = AppConfig::default();
        cfg.trade_asset = "USDC".to_string();
        assert_eq!(cfg.resolved_rebalancer_config().asset, "USDC");
    }
}
