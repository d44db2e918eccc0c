// src/error.rs

/// Everything that can abort a rebalance cycle or prevent startup.
#[derive(Debug, thiserror::Error)]
pub enum RebalanceError {
    /// Malformed or empty balance/price data. The cycle is abandoned.
    #[error("data error: {0}")]
    Data(String),

    /// Any failure reported by the exchange gateway (transport, auth, rate limit, rejection).
    #[error("exchange error: {0:#}")]
    Exchange(#[from] anyhow::Error),

    /// Invalid configuration detected at startup. Fatal.
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to load config: {0}")]
    ConfigLoad(#[from] config::ConfigError),
}

impl RebalanceError {
    /// Short label used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            RebalanceError::Data(_) => "data",
            RebalanceError::Exchange(_) => "exchange",
            RebalanceError::Config(_) | RebalanceError::ConfigLoad(_) => "config",
        }
    }
}

pub type Result<T> = std::result::Result<T, RebalanceError>;
