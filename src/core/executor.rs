// src/core/executor.rs
use crate::connectors::traits::ExchangeGateway;
use crate::error::Result;
use crate::types::{ExecutionResult, OrderResponse, Side, TradingPair};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// How long to give the exchange before deciding an order is stuck.
///
/// Both variants end the same way: either nothing is left open, or every residual
/// order gets one cancel request before `execute` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmPolicy {
    /// Wait once, then look at the open orders.
    FixedWait(Duration),
    /// Look every `interval` until nothing is open or `deadline` has passed.
    Poll { interval: Duration, deadline: Duration },
}

pub struct OrderExecutor<'a> {
    gateway: &'a dyn ExchangeGateway,
    pair: &'a TradingPair,
    policy: ConfirmPolicy,
}

impl<'a> OrderExecutor<'a> {
    pub fn new(gateway: &'a dyn ExchangeGateway, pair: &'a TradingPair, policy: ConfirmPolicy) -> Self {
        Self {
            gateway,
            pair,
            policy,
        }
    }

    /// Places a market order for `notional` quote currency and reconciles it.
    ///
    /// Submit and open-order failures propagate. A failed cancel does not: the order
    /// may have filled in the meantime, so it is logged and reported in `failed`.
    pub async fn execute(&self, side: Side, notional: Decimal) -> Result<ExecutionResult> {
        let order = match side {
            Side::Sell => {
                self.gateway
                    .submit_market_sell_by_notional(self.pair, notional)
                    .await?
            }
            Side::Buy => {
                self.gateway
                    .submit_market_buy_by_notional(self.pair, notional)
                    .await?
            }
        };
        debug!(order_id = %order.id, %side, %notional, "Market order accepted");

        let open_orders = self.await_confirmation().await?;

        if open_orders.is_empty() {
            info!(
                direction = %side,
                amount = %notional,
                quote = %self.pair.quote,
                "Order executed successfully"
            );
            return Ok(ExecutionResult::Filled);
        }

        Ok(self.cancel_residuals(open_orders).await)
    }

    async fn await_confirmation(&self) -> Result<Vec<OrderResponse>> {
        match self.policy {
            ConfirmPolicy::FixedWait(wait) => {
                sleep(wait).await;
                Ok(self.gateway.fetch_open_orders(self.pair).await?)
            }
            ConfirmPolicy::Poll { interval, deadline } => {
                let started = Instant::now();
                loop {
                    sleep(interval).await;
                    let open = self.gateway.fetch_open_orders(self.pair).await?;
                    if open.is_empty() || started.elapsed() >= deadline {
                        return Ok(open);
                    }
                    debug!(open = open.len(), "Order still working");
                }
            }
        }
    }

    async fn cancel_residuals(&self, open_orders: Vec<OrderResponse>) -> ExecutionResult {
        let mut seen = HashSet::new();
        let mut cancelled = Vec::new();
        let mut failed = Vec::new();

        for order in open_orders {
            if !seen.insert(order.id.clone()) {
                continue;
            }
            match self.gateway.cancel_order(&order.id, self.pair).await {
                Ok(()) => cancelled.push(order.id),
                Err(e) => {
                    warn!(order_id = %order.id, error = %e, "Cancel failed, order may have just filled");
                    failed.push(order.id);
                }
            }
        }

        warn!(
            ?cancelled,
            ?failed,
            pair = %self.pair,
            "Residual orders cancelled, position will be re-evaluated next cycle"
        );

        ExecutionResult::ResidualCancelled { cancelled, failed }
    }
}
