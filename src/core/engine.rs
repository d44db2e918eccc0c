// src/core/engine.rs
use crate::config::AppConfig;
use crate::connectors::traits::ExchangeGateway;
use crate::core::detector::detect;
use crate::core::executor::{ConfirmPolicy, OrderExecutor};
use crate::core::snapshot::build_snapshot;
use crate::error::Result;
use crate::types::{ExecutionResult, PositionSnapshot, TradingPair};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, info_span, Instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Deciding,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Balanced,
    Executed(ExecutionResult),
}

/// The slice of [`AppConfig`] the loop needs, already parsed.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub pair: TradingPair,
    pub unbalance_ratio: Decimal,
    pub monitor_interval: Duration,
    pub log_interval: u64,
    pub confirm_policy: ConfirmPolicy,
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            pair: config.pair()?,
            unbalance_ratio: config.unbalance_ratio,
            monitor_interval: config.monitor_interval(),
            log_interval: config.log_interval,
            confirm_policy: config.confirm_policy(),
        })
    }
}

pub struct RebalanceEngine {
    settings: EngineSettings,
    gateway: Arc<dyn ExchangeGateway>,
    cycle: u64,
    state: LoopState,
}

impl RebalanceEngine {
    pub fn new(settings: EngineSettings, gateway: Arc<dyn ExchangeGateway>) -> Self {
        Self {
            settings,
            gateway,
            cycle: 0,
            state: LoopState::Idle,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Number of completed ticks, failed ones included.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    fn heartbeat_due(&self) -> bool {
        self.cycle % self.settings.log_interval.max(1) == 0
    }

    /// Logs the pair, both prices and the current position once before trading starts.
    pub async fn startup_report(&self) -> Result<PositionSnapshot> {
        let pair = &self.settings.pair;
        let mark_price = self.gateway.fetch_mark_price(pair).await?;
        let last_price = self.gateway.fetch_last_price(pair).await?;
        let balances = self.gateway.fetch_balances().await?;
        let snapshot = build_snapshot(pair, &balances, mark_price)?;

        info!(
            symbol = %pair,
            base = %pair.base,
            quote = %pair.quote,
            %mark_price,
            %last_price,
            "Connected to exchange"
        );
        info!("Current position\n{}", snapshot);

        Ok(snapshot)
    }

    /// Runs cycles until `shutdown` flips to true or its sender is dropped.
    ///
    /// Shutdown is only observed between cycles, so a submitted order is always
    /// confirmed or cancelled before the loop exits.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            pair = %self.settings.pair,
            unbalance_ratio = %self.settings.unbalance_ratio,
            interval_secs = self.settings.monitor_interval.as_secs_f64(),
            "Rebalance loop running"
        );

        while !*shutdown.borrow() {
            let span = info_span!("cycle", n = self.cycle);
            match self.tick().instrument(span).await {
                Ok(TickOutcome::Balanced) => debug!("Within threshold"),
                Ok(TickOutcome::Executed(result)) => debug!(?result, "Cycle executed"),
                Err(e) => error!(kind = e.kind(), error = %e, "Rebalance cycle failed"),
            }

            tokio::select! {
                _ = sleep(self.settings.monitor_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(cycles = self.cycle(), state = ?self.state(), "Rebalance loop stopped");
    }

    /// One fetch -> detect -> execute pass. Always leaves the engine `Idle`.
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        self.state = LoopState::Deciding;
        let outcome = self.decide().await;
        self.state = LoopState::Idle;
        self.cycle = self.cycle.wrapping_add(1);
        outcome
    }

    async fn decide(&self) -> Result<TickOutcome> {
        let pair = &self.settings.pair;
        let balances = self.gateway.fetch_balances().await?;
        let mark_price = self.gateway.fetch_mark_price(pair).await?;
        let snapshot = build_snapshot(pair, &balances, mark_price)?;

        if self.heartbeat_due() {
            info!("\n{}", snapshot);
        }

        let action = detect(&snapshot, self.settings.unbalance_ratio);
        let Some(side) = action.side() else {
            return Ok(TickOutcome::Balanced);
        };

        info!(
            %side,
            notional = %action.notional(),
            base_ratio = %snapshot.base_ratio.round_dp(4),
            quote_ratio = %snapshot.quote_ratio.round_dp(4),
            "Imbalance detected"
        );

        let executor = OrderExecutor::new(self.gateway.as_ref(), pair, self.settings.confirm_policy);
        let result = executor.execute(side, action.notional()).await?;

        Ok(TickOutcome::Executed(result))
    }
}
