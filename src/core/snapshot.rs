// src/core/snapshot.rs
use crate::error::{RebalanceError, Result};
use crate::types::{Balances, PositionSnapshot, TradingPair};
use rust_decimal::Decimal;

/// Values both legs of the pair at `mark_price` and derives their share of the total.
///
/// Fails with [`RebalanceError::Data`] when a balance entry is missing or negative, when the
/// mark price is not positive, when a notional overflows, or when the account is worth
/// nothing. None of those may reach
/// the trading logic.
pub fn build_snapshot(
    pair: &TradingPair,
    balances: &Balances,
    mark_price: Decimal,
) -> Result<PositionSnapshot> {
    if mark_price <= Decimal::ZERO {
        return Err(RebalanceError::Data(format!(
            "mark price for {} must be positive, got {}",
            pair, mark_price
        )));
    }

    let base_amount = holding(balances, &pair.base)?;
    let quote_amount = holding(balances, &pair.quote)?;

    let base_notional = mark_price
        .checked_mul(base_amount)
        .ok_or_else(|| overflow(pair, "base notional"))?;
    let quote_notional = quote_amount;
    let total_notional = base_notional
        .checked_add(quote_notional)
        .ok_or_else(|| overflow(pair, "total notional"))?;

    if total_notional <= Decimal::ZERO {
        return Err(RebalanceError::Data(format!(
            "total notional of {} is {}, account is empty",
            pair, total_notional
        )));
    }

    let base_ratio = base_notional / total_notional;

    Ok(PositionSnapshot {
        pair: pair.clone(),
        base_amount,
        quote_amount,
        mark_price,
        base_notional,
        quote_notional,
        total_notional,
        base_ratio,
        quote_ratio: quote_notional / total_notional,
    })
}

fn overflow(pair: &TradingPair, what: &str) -> RebalanceError {
    RebalanceError::Data(format!("{} of {} overflows", what, pair))
}

fn holding(balances: &Balances, asset: &str) -> Result<Decimal> {
    let amount = *balances
        .get(asset)
        .ok_or_else(|| RebalanceError::Data(format!("no balance entry for {}", asset)))?;
    if amount < Decimal::ZERO {
        return Err(RebalanceError::Data(format!(
            "negative balance for {}: {}",
            asset, amount
        )));
    }
    Ok(amount)
}
