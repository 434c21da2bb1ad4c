//! Relative Strength Index (RSI) indicator.

use super::Indicator;

/// RSI (Relative Strength Index) indicator.
///
/// Sum-based variant: gains and losses are summed over every consecutive difference in the
/// supplied closes and divided by `period`. There is no Wilder smoothing, so the value is
/// recomputed from scratch each time. Models are trained against this exact formula.
///
/// Values range from 0-100.
pub struct Rsi {
    period: usize,
}

impl Default for Rsi {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Rsi {
    fn id(&self) -> &str {
        "rsi"
    }

    fn min_periods(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, closes: &[f64]) -> Option<f64> {
        if self.period == 0 || closes.len() < self.min_periods() {
            return None;
        }

        let mut gains = 0.0;
        let mut losses = 0.0;
        for pair in closes.windows(2) {
            let change = pair[1] - pair[0];
            if change > 0.0 {
                gains += change;
            } else if change < 0.0 {
                losses -= change;
            }
        }

        let avg_gain = gains / self.period as f64;
        let avg_loss = losses / self.period as f64;

        if avg_loss == 0.0 {
            return Some(100.0);
        }

        let rs = avg_gain / avg_loss;
        let rsi = 100.0 - (100.0 / (1.0 + rs));
        rsi.is_finite().then_some(rsi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uptrend(count: usize) -> Vec<f64> {
        (0..count).map(|i| 100.0 + i as f64 * 1.5).collect()
    }

    fn downtrend(count: usize) -> Vec<f64> {
        (0..count).map(|i| 200.0 - i as f64 * 1.5).collect()
    }

    #[test]
    fn test_rsi_min_periods() {
        assert_eq!(Rsi::default().min_periods(), 15);
        assert_eq!(Rsi::new(7).min_periods(), 8);
    }

    #[test]
    fn test_rsi_insufficient_data() {
        let rsi = Rsi::default();
        for len in 0..15 {
            assert_eq!(rsi.calculate(&uptrend(len)), None, "len {}", len);
        }
    }

    #[test]
    fn test_rsi_strictly_increasing_is_100() {
        let rsi = Rsi::default();
        assert_eq!(rsi.calculate(&uptrend(15)), Some(100.0));
    }

    #[test]
    fn test_rsi_flat_is_100() {
        let rsi = Rsi::default();
        assert_eq!(rsi.calculate(&[100.0; 200]), Some(100.0));
    }

    #[test]
    fn test_rsi_strictly_decreasing_is_0() {
        let rsi = Rsi::default();
        let value = rsi.calculate(&downtrend(15)).unwrap();
        assert!(value.abs() < 1e-12, "got {}", value);
    }

    #[test]
    fn test_rsi_known_value() {
        // gains = 2 + 2 = 4, losses = 1 + 1 = 2, rs = 2, rsi = 100 - 100/3
        let rsi = Rsi::new(4);
        let value = rsi.calculate(&[10.0, 12.0, 11.0, 13.0, 12.0]).unwrap();
        assert!((value - (100.0 - 100.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_sums_over_whole_slice() {
        // A loss outside the last period+1 closes still counts.
        let rsi = Rsi::new(2);
        let mut closes = vec![10.0, 5.0];
        closes.extend([6.0, 7.0, 8.0]);
        // gains = 3, losses = 5, rs = 0.6
        let value = rsi.calculate(&closes).unwrap();
        assert!((value - (100.0 - 100.0 / 1.6)).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_value_range() {
        let rsi = Rsi::default();
        let closes: Vec<f64> = (0..60)
            .map(|i| 100.0 + ((i * 7) % 11) as f64 - 5.0)
            .collect();
        let value = rsi.calculate(&closes).unwrap();
        assert!((0.0..=100.0).contains(&value));
    }

    #[test]
    fn test_rsi_zero_period_is_undefined() {
        assert_eq!(Rsi::new(0).calculate(&uptrend(20)), None);
    }
}
