//! Technical indicator implementations.
//!
//! Every indicator is a pure function of a closing-price slice (most recent last) and
//! returns `None` when the slice is too short or the result is not a finite number.

pub mod lag;
pub mod rsi;
pub mod sma;

pub use lag::{lag_close, lagged, price_change};
pub use rsi::Rsi;
pub use sma::Sma;

/// Trait for closing-price indicators.
pub trait Indicator: Send + Sync {
    /// Unique identifier for this indicator.
    fn id(&self) -> &str;

    /// Minimum number of closes required for calculation.
    fn min_periods(&self) -> usize;

    /// Calculate the indicator value.
    /// Returns None if there is insufficient data.
    fn calculate(&self, closes: &[f64]) -> Option<f64>;
}
