use crate::types::{Balances, OrderResponse, TradingPair};
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Everything the rebalancer needs from an exchange account.
///
/// Implementations are authoritative for fill state. Every call may fail transiently;
/// callers treat all failures the same way.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    async fn fetch_mark_price(&self, pair: &TradingPair) -> Result<Decimal>;

    async fn fetch_last_price(&self, pair: &TradingPair) -> Result<Decimal>;

    /// Total quantity per asset symbol.
    async fn fetch_balances(&self) -> Result<Balances>;

    async fn fetch_open_orders(&self, pair: &TradingPair) -> Result<Vec<OrderResponse>>;

    /// Market sell sized by quote-currency cost.
    async fn submit_market_sell_by_notional(
        &self,
        pair: &TradingPair,
        quote_notional: Decimal,
    ) -> Result<OrderResponse>;

    /// Market buy sized by quote-currency cost.
    async fn submit_market_buy_by_notional(
        &self,
        pair: &TradingPair,
        quote_notional: Decimal,
    ) -> Result<OrderResponse>;

    async fn cancel_order(&self, order_id: &str, pair: &TradingPair) -> Result<()>;
}
