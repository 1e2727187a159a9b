//! Configuration management
//!
//! Loads the JSON configuration file, injects API credentials from the
//! environment, and resolves the execution mode. The resulting [`Config`]
//! is set once at startup and immutable for the process lifetime.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::FeeSchedule;

/// Token that must accompany a live-mode request; anything else forces
/// simulated execution.
pub const LIVE_CONFIRM_TOKEN: &str = "I-UNDERSTAND";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

impl Config {
    /// Load configuration from a JSON file, then pull API credentials from
    /// the environment when not set in the file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        config.load_env_credentials();
        Ok(config)
    }

    pub fn load_env_credentials(&mut self) {
        if let Ok(api_key) = std::env::var("KRAKEN_API_KEY") {
            self.exchange.api_key = Some(api_key);
        }
        if let Ok(api_secret) = std::env::var("KRAKEN_API_SECRET") {
            self.exchange.api_secret = Some(api_secret);
        }
    }

    /// Quote asset of the configured pair: the part after the slash
    pub fn quote_asset(&self) -> &str {
        self.trading
            .pair
            .rsplit('/')
            .next()
            .unwrap_or(&self.trading.pair)
    }

    /// Reject configurations the planner and scheduler cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.trading.budget_usd < 0.0 {
            bail!("budget_usd must be >= 0");
        }
        if self.trading.spacing_fraction <= 0.0 {
            bail!("spacing_fraction must be > 0");
        }
        if self.trading.min_net_fraction < 0.0 {
            bail!("min_net_fraction must be >= 0");
        }
        if self.trading.pair.split('/').count() != 2 {
            bail!("pair must be BASE/QUOTE, e.g. BTC/USD");
        }
        Ok(())
    }
}

/// Resolve simulated-vs-live: live requires the explicit confirmation token,
/// and absent confirmation forces simulated mode.
pub fn resolve_simulated(live_requested: bool, confirm: &str) -> bool {
    if live_requested && confirm == LIVE_CONFIRM_TOKEN {
        false
    } else {
        true
    }
}

/// Exchange configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
    /// Sticky manual fee override; suppresses the per-cycle fee refresh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_fees: Option<FeeSchedule>,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        ExchangeConfig {
            id: "kraken".to_string(),
            api_key: None,
            api_secret: None,
            manual_fees: None,
        }
    }
}

/// Trading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    pub pair: String,
    pub budget_usd: f64,
    pub grid_levels: usize,
    pub spacing_fraction: f64,
    pub min_net_fraction: f64,
    pub tick_seconds: u64,
    pub simulated: bool,
}

impl Default for TradingConfig {
    fn default() -> Self {
        TradingConfig {
            pair: "BTC/USD".to_string(),
            budget_usd: 50.0,
            grid_levels: 8,
            spacing_fraction: 0.005,  // 0.5% between levels
            min_net_fraction: 0.002,  // 0.20% after both maker legs
            tick_seconds: 15,
            simulated: true,
        }
    }
}

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub path: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            path: "trades.csv".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.exchange.id, "kraken");
        assert_eq!(config.trading.pair, "BTC/USD");
        assert!(config.trading.simulated);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_quote_asset() {
        let mut config = Config::default();
        assert_eq!(config.quote_asset(), "USD");
        config.trading.pair = "ETH/USDT".to_string();
        assert_eq!(config.quote_asset(), "USDT");
    }

    #[test]
    fn test_validate_rejects_bad_geometry() {
        let mut config = Config::default();
        config.trading.spacing_fraction = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.trading.budget_usd = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.trading.pair = "BTCUSD".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_live_requires_confirmation_token() {
        assert!(resolve_simulated(false, ""));
        assert!(resolve_simulated(true, ""));
        assert!(resolve_simulated(true, "yes"));
        assert!(!resolve_simulated(true, LIVE_CONFIRM_TOKEN));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"trading": {"pair": "SOL/USD", "budget_usd": 25.0,
                "grid_levels": 4, "spacing_fraction": 0.01, "min_net_fraction": 0.002,
                "tick_seconds": 30, "simulated": true}}"#)
                .unwrap();
        assert_eq!(config.trading.pair, "SOL/USD");
        assert_eq!(config.exchange.id, "kraken");
        assert_eq!(config.ledger.path, "trades.csv");
    }
}
