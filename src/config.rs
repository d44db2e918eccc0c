// src/config.rs

use crate::core::executor::ConfirmPolicy;
use crate::error::{RebalanceError, Result};
use crate::types::TradingPair;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

/// Env var overriding the settings file base name.
pub const SETTINGS_ENV: &str = "REBALANCER_SETTINGS";

fn default_rest_url() -> String {
    "https://www.okx.com".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

#[derive(Deserialize, Clone)]
pub struct AppConfig {
    pub symbol: String,
    #[serde(alias = "apiKey", alias = "apikey")]
    pub api_key: String,
    #[serde(alias = "secret")]
    pub secret_key: String,
    #[serde(alias = "password")]
    pub passphrase: String,
    /// Share of total notional one side may reach before rebalancing. Must be in (0.5, 1.0).
    pub unbalance_ratio: Decimal,
    /// Seconds between cycles.
    pub monitor_interval: u64,
    /// Seconds to wait after a market order before checking for residuals.
    pub order_wait_time: u64,
    /// Heartbeat every N cycles.
    pub log_interval: u64,
    /// When set, open orders are polled at this interval until `order_wait_time` runs out.
    #[serde(default)]
    pub order_poll_interval_ms: Option<u64>,
    #[serde(default = "default_rest_url")]
    pub rest_url: String,
    #[serde(default)]
    pub simulated: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("symbol", &self.symbol)
            .field("unbalance_ratio", &self.unbalance_ratio)
            .field("monitor_interval", &self.monitor_interval)
            .field("order_wait_time", &self.order_wait_time)
            .field("log_interval", &self.log_interval)
            .field("order_poll_interval_ms", &self.order_poll_interval_ms)
            .field("rest_url", &self.rest_url)
            .field("simulated", &self.simulated)
            .field("log_dir", &self.log_dir)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Loads `Settings.*` (or the file named by `REBALANCER_SETTINGS`), overlaid with `APP_*` env vars.
    pub fn new() -> Result<Self> {
        let file = std::env::var(SETTINGS_ENV).unwrap_or_else(|_| "Settings".to_string());
        let builder = Config::builder()
            .add_source(File::with_name(&file))
            .add_source(config::Environment::with_prefix("APP"));

        Self::from_builder(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config = builder.build()?;
        let app: AppConfig = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<()> {
        self.pair()?;

        let half = Decimal::new(5, 1);
        if self.unbalance_ratio <= half || self.unbalance_ratio >= Decimal::ONE {
            return Err(RebalanceError::Config(format!(
                "unbalance_ratio must be in (0.5, 1.0), got {}",
                self.unbalance_ratio
            )));
        }
        if self.monitor_interval == 0 {
            return Err(RebalanceError::Config(
                "monitor_interval must be at least 1 second".into(),
            ));
        }
        if self.log_interval == 0 {
            return Err(RebalanceError::Config("log_interval must be positive".into()));
        }
        if self.order_poll_interval_ms == Some(0) {
            return Err(RebalanceError::Config(
                "order_poll_interval_ms must be positive when set".into(),
            ));
        }
        for (name, value) in [
            ("api_key", &self.api_key),
            ("secret_key", &self.secret_key),
            ("passphrase", &self.passphrase),
        ] {
            if value.trim().is_empty() {
                return Err(RebalanceError::Config(format!("{} is required", name)));
            }
        }
        Ok(())
    }

    pub fn pair(&self) -> Result<TradingPair> {
        self.symbol.parse()
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval)
    }

    pub fn confirm_policy(&self) -> ConfirmPolicy {
        let wait = Duration::from_secs(self.order_wait_time);
        match self.order_poll_interval_ms {
            Some(ms) => ConfirmPolicy::Poll {
                interval: Duration::from_millis(ms),
                deadline: wait,
            },
            None => ConfirmPolicy::FixedWait(wait),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use rust_decimal_macros::dec;

    const TOML: &str = r#"
        symbol = "BTC/USDT"
        api_key = "k"
        secret_key = "s"
        passphrase = "p"
        unbalance_ratio = 0.8
        monitor_interval = 60
        order_wait_time = 10
        log_interval = 30
    "#;

    fn load(text: &str, format: FileFormat) -> Result<AppConfig> {
        AppConfig::from_builder(Config::builder().add_source(File::from_str(text, format)))
    }

    fn valid() -> AppConfig {
        load(TOML, FileFormat::Toml).unwrap()
    }

    #[test]
    fn loads_toml_with_defaults() {
        let cfg = valid();
        assert_eq!(cfg.unbalance_ratio, dec!(0.8));
        assert_eq!(cfg.monitor_interval(), Duration::from_secs(60));
        assert_eq!(cfg.rest_url, "https://www.okx.com");
        assert_eq!(cfg.log_dir, "logs");
        assert!(!cfg.simulated);
        assert_eq!(cfg.pair().unwrap().quote, "USDT");
    }

    #[test]
    fn accepts_exchange_style_credential_keys() {
        let json = r#"{
            "symbol": "ETH/USDT",
            "apiKey": "k",
            "secret": "s",
            "password": "p",
            "unbalance_ratio": 0.75,
            "monitor_interval": 30,
            "order_wait_time": 5,
            "log_interval": 10
        }"#;
        let cfg = load(json, FileFormat::Json).unwrap();
        assert_eq!(cfg.api_key, "k");
        assert_eq!(cfg.secret_key, "s");
        assert_eq!(cfg.passphrase, "p");
    }

    #[test]
    fn rejects_ratio_outside_open_interval() {
        for ratio in [dec!(0.5), dec!(0.4), dec!(1.0), dec!(1.2)] {
            let mut cfg = valid();
            cfg.unbalance_ratio = ratio;
            let err = cfg.validate().unwrap_err();
            assert!(matches!(err, RebalanceError::Config(ref m) if m.contains("unbalance_ratio")));
        }
    }

    #[test]
    fn rejects_bad_symbol_and_zero_intervals() {
        let mut cfg = valid();
        cfg.symbol = "BTCUSDT".into();
        assert!(cfg.validate().is_err());

        let mut cfg = valid();
        cfg.log_interval = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = valid();
        cfg.monitor_interval = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = valid();
        cfg.order_poll_interval_ms = Some(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_blank_credentials() {
        let mut cfg = valid();
        cfg.passphrase = "  ".into();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("passphrase"));
    }

    #[test]
    fn missing_required_field_fails_load() {
        let err = load("symbol = \"BTC/USDT\"", FileFormat::Toml).unwrap_err();
        assert!(matches!(err, RebalanceError::ConfigLoad(_)));
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn confirm_policy_follows_poll_setting() {
        let mut cfg = valid();
        assert_eq!(
            cfg.confirm_policy(),
            ConfirmPolicy::FixedWait(Duration::from_secs(10))
        );

        cfg.order_poll_interval_ms = Some(500);
        assert_eq!(
            cfg.confirm_policy(),
            ConfirmPolicy::Poll {
                interval: Duration::from_millis(500),
                deadline: Duration::from_secs(10),
            }
        );
    }

    #[test]
    fn debug_output_hides_credentials() {
        let text = format!("{:?}", valid());
        assert!(text.contains("BTC/USDT"));
        assert!(!text.contains("secret_key"));
    }
}
