// src/core/detector.rs
use crate::types::{CorrectiveAction, PositionSnapshot};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const TARGET_SHARE: Decimal = dec!(0.5);

/// Decides whether the snapshot has drifted past `unbalance_ratio`.
///
/// A triggered action always sizes the order to restore an exact 50/50 split, so the
/// position has to drift all the way back past the threshold before trading again.
/// `unbalance_ratio` must be above 0.5 for the two branches to be exclusive; config
/// validation enforces that.
pub fn detect(snapshot: &PositionSnapshot, unbalance_ratio: Decimal) -> CorrectiveAction {
    let target_notional = snapshot.total_notional * TARGET_SHARE;

    if snapshot.base_ratio > unbalance_ratio {
        CorrectiveAction::Sell(snapshot.base_notional - target_notional)
    } else if snapshot.quote_ratio > unbalance_ratio {
        CorrectiveAction::Buy(snapshot.quote_notional - target_notional)
    } else {
        CorrectiveAction::Hold
    }
}
