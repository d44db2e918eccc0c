//! Scripted in-memory gateway for tests.
//!
//! ```ignore
//! let gateway = MockGateway::builder()
//!     .balance("BTC", dec!(10))
//!     .balance("USDT", dec!(200))
//!     .mark_price(dec!(100))
//!     .open_orders_after_submit(vec![order("7")])
//!     .build();
//! ```

use crate::connectors::traits::ExchangeGateway;
use crate::types::{Balances, OrderResponse, Side, TradingPair};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

/// A recorded order submission for assertion in tests.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedOrder {
    pub side: Side,
    pub notional: Decimal,
}

#[derive(Default)]
struct MockState {
    balances: Balances,
    mark_price: Decimal,
    last_price: Decimal,
    /// Each `fetch_open_orders` pops one response; an empty queue means no open orders.
    open_orders: VecDeque<Vec<OrderResponse>>,
    fail_balances: usize,
    fail_mark_price: usize,
    fail_submit: usize,
    fail_open_orders: usize,
    fail_cancel_ids: HashSet<String>,
    balance_calls: usize,
    open_order_calls: usize,
    submitted: Vec<RecordedOrder>,
    cancelled: Vec<String>,
    cancel_attempts: Vec<String>,
}

pub struct MockGateway {
    state: Mutex<MockState>,
}

#[derive(Default)]
pub struct MockGatewayBuilder {
    state: MockState,
}

impl MockGatewayBuilder {
    pub fn balance(mut self, asset: &str, amount: Decimal) -> Self {
        self.state.balances.insert(asset.to_string(), amount);
        self
    }

    pub fn mark_price(mut self, price: Decimal) -> Self {
        self.state.mark_price = price;
        self
    }

    pub fn last_price(mut self, price: Decimal) -> Self {
        self.state.last_price = price;
        self
    }

    pub fn open_orders_after_submit(mut self, orders: Vec<OrderResponse>) -> Self {
        self.state.open_orders.push_back(orders);
        self
    }

    pub fn fail_balances(mut self, times: usize) -> Self {
        self.state.fail_balances = times;
        self
    }

    pub fn fail_mark_price(mut self, times: usize) -> Self {
        self.state.fail_mark_price = times;
        self
    }

    pub fn fail_submit(mut self, times: usize) -> Self {
        self.state.fail_submit = times;
        self
    }

    pub fn fail_open_orders(mut self, times: usize) -> Self {
        self.state.fail_open_orders = times;
        self
    }

    pub fn fail_cancel(mut self, order_id: &str) -> Self {
        self.state.fail_cancel_ids.insert(order_id.to_string());
        self
    }

    pub fn build(self) -> MockGateway {
        MockGateway {
            state: Mutex::new(self.state),
        }
    }
}

pub fn order(id: &str) -> OrderResponse {
    OrderResponse {
        id: id.to_string(),
        symbol: "BTC-USDT".to_string(),
        status: "live".to_string(),
    }
}

fn take_failure(counter: &mut usize) -> bool {
    if *counter > 0 {
        *counter -= 1;
        true
    } else {
        false
    }
}

impl MockGateway {
    pub fn builder() -> MockGatewayBuilder {
        MockGatewayBuilder::default()
    }

    /// Changes a balance mid-test, e.g. to let a loop recover.
    pub fn set_balance(&self, asset: &str, amount: Decimal) {
        self.state
            .lock()
            .unwrap()
            .balances
            .insert(asset.to_string(), amount);
    }

    pub fn submitted(&self) -> Vec<RecordedOrder> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.state.lock().unwrap().cancelled.clone()
    }

    pub fn cancel_attempts(&self) -> Vec<String> {
        self.state.lock().unwrap().cancel_attempts.clone()
    }

    pub fn balance_calls(&self) -> usize {
        self.state.lock().unwrap().balance_calls
    }

    pub fn open_order_calls(&self) -> usize {
        self.state.lock().unwrap().open_order_calls
    }

    fn record_submit(&self, side: Side, notional: Decimal) -> Result<OrderResponse> {
        let mut state = self.state.lock().unwrap();
        if take_failure(&mut state.fail_submit) {
            return Err(anyhow!("mock: order rejected"));
        }
        state.submitted.push(RecordedOrder { side, notional });
        Ok(order(&format!("mock-{}", state.submitted.len())))
    }
}

#[async_trait]
impl ExchangeGateway for MockGateway {
    async fn fetch_mark_price(&self, _pair: &TradingPair) -> Result<Decimal> {
        let mut state = self.state.lock().unwrap();
        if take_failure(&mut state.fail_mark_price) {
            return Err(anyhow!("mock: mark price unavailable"));
        }
        Ok(state.mark_price)
    }

    async fn fetch_last_price(&self, _pair: &TradingPair) -> Result<Decimal> {
        Ok(self.state.lock().unwrap().last_price)
    }

    async fn fetch_balances(&self) -> Result<Balances> {
        let mut state = self.state.lock().unwrap();
        state.balance_calls += 1;
        if take_failure(&mut state.fail_balances) {
            return Err(anyhow!("mock: connection reset"));
        }
        Ok(state.balances.clone())
    }

    async fn fetch_open_orders(&self, _pair: &TradingPair) -> Result<Vec<OrderResponse>> {
        let mut state = self.state.lock().unwrap();
        state.open_order_calls += 1;
        if take_failure(&mut state.fail_open_orders) {
            return Err(anyhow!("mock: open orders unavailable"));
        }
        Ok(state.open_orders.pop_front().unwrap_or_default())
    }

    async fn submit_market_sell_by_notional(
        &self,
        _pair: &TradingPair,
        quote_notional: Decimal,
    ) -> Result<OrderResponse> {
        self.record_submit(Side::Sell, quote_notional)
    }

    async fn submit_market_buy_by_notional(
        &self,
        _pair: &TradingPair,
        quote_notional: Decimal,
    ) -> Result<OrderResponse> {
        self.record_submit(Side::Buy, quote_notional)
    }

    async fn cancel_order(&self, order_id: &str, _pair: &TradingPair) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.cancel_attempts.push(order_id.to_string());
        if state.fail_cancel_ids.contains(order_id) {
            return Err(anyhow!("mock: order {} already filled", order_id));
        }
        state.cancelled.push(order_id.to_string());
        Ok(())
    }
}
