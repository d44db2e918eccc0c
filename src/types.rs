// src/types.rs
use crate::error::RebalanceError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Asset symbol -> total quantity held.
pub type Balances = HashMap<String, Decimal>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// A spot trading pair parsed from a `BASE/QUOTE` symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TradingPair {
    pub base: String,
    pub quote: String,
}

impl TradingPair {
    pub fn symbol(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }
}

impl FromStr for TradingPair {
    type Err = RebalanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s
            .split_once('/')
            .ok_or_else(|| RebalanceError::Config(format!("symbol '{}' is not BASE/QUOTE", s)))?;
        let (base, quote) = (base.trim(), quote.trim());
        if base.is_empty() || quote.is_empty() || quote.contains('/') {
            return Err(RebalanceError::Config(format!(
                "symbol '{}' is not BASE/QUOTE",
                s
            )));
        }
        Ok(Self {
            base: base.to_string(),
            quote: quote.to_string(),
        })
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Order as reported by the exchange, either on submission or in the open-order list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    pub symbol: String,
    pub status: String,
}

/// Point-in-time valuation of the pair's holdings. Built once per cycle, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSnapshot {
    pub pair: TradingPair,
    pub base_amount: Decimal,
    pub quote_amount: Decimal,
    pub mark_price: Decimal,
    pub base_notional: Decimal,
    pub quote_notional: Decimal,
    pub total_notional: Decimal,
    pub base_ratio: Decimal,
    pub quote_ratio: Decimal,
}

impl fmt::Display for PositionSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}:{}  =  {}:{} @ {}",
            self.pair.base, self.base_amount, self.pair.quote, self.base_notional, self.mark_price
        )?;
        writeln!(f, "{}:{}", self.pair.quote, self.quote_amount)?;
        write!(
            f,
            "percent: {}:{:.4}  {}:{:.4}",
            self.pair.base, self.base_ratio, self.pair.quote, self.quote_ratio
        )
    }
}

/// What the detector wants done this cycle. Notionals are in quote currency, never negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CorrectiveAction {
    Sell(Decimal),
    Buy(Decimal),
    Hold,
}

impl CorrectiveAction {
    pub fn side(&self) -> Option<Side> {
        match self {
            CorrectiveAction::Sell(_) => Some(Side::Sell),
            CorrectiveAction::Buy(_) => Some(Side::Buy),
            CorrectiveAction::Hold => None,
        }
    }

    pub fn notional(&self) -> Decimal {
        match self {
            CorrectiveAction::Sell(n) | CorrectiveAction::Buy(n) => *n,
            CorrectiveAction::Hold => Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// No open orders remained after the confirmation window.
    Filled,
    /// Orders were still open; each id was cancelled once. `failed` lists cancels the exchange rejected.
    ResidualCancelled {
        cancelled: Vec<String>,
        failed: Vec<String>,
    },
}
