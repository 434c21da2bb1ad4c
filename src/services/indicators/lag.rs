//! Lagged and derivative features.

use super::Indicator;
use crate::types::PriceChangeKind;

/// The close one observation before the most recent.
pub fn lag_close(closes: &[f64]) -> Option<f64> {
    closes.len().checked_sub(2).map(|i| closes[i])
}

/// The indicator as of one observation ago: computed with the most recent close excluded.
pub fn lagged<I: Indicator + ?Sized>(indicator: &I, closes: &[f64]) -> Option<f64> {
    let (_, previous) = closes.split_last()?;
    indicator.calculate(previous)
}

/// Change from `previous` to `current`.
///
/// The percentage form is undefined when `previous` is zero.
pub fn price_change(current: f64, previous: f64, kind: PriceChangeKind) -> Option<f64> {
    let change = match kind {
        PriceChangeKind::Absolute => current - previous,
        PriceChangeKind::Percent => (current / previous - 1.0) * 100.0,
    };
    change.is_finite().then_some(change)
}
