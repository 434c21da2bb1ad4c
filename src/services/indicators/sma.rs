//! Simple Moving Average (SMA) indicator.

use super::Indicator;

/// SMA (Simple Moving Average) indicator.
///
/// Arithmetic mean of the last `period` closes.
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Sma {
    fn id(&self) -> &str {
        match self.period {
            50 => "sma50",
            200 => "sma200",
            _ => "sma",
        }
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn calculate(&self, closes: &[f64]) -> Option<f64> {
        if self.period == 0 || closes.len() < self.period {
            return None;
        }

        let sma = closes.iter().rev().take(self.period).sum::<f64>() / self.period as f64;
        sma.is_finite().then_some(sma)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma_id() {
        assert_eq!(Sma::new(50).id(), "sma50");
        assert_eq!(Sma::new(200).id(), "sma200");
        assert_eq!(Sma::new(20).id(), "sma");
    }

    #[test]
    fn test_sma_insufficient_data() {
        let sma = Sma::new(50);
        let closes: Vec<f64> = (0..49).map(|i| i as f64).collect();
        assert_eq!(sma.calculate(&closes), None);
        assert_eq!(sma.calculate(&[]), None);
    }

    #[test]
    fn test_sma_exact_length_is_mean_of_all() {
        let sma = Sma::new(4);
        assert_eq!(sma.calculate(&[1.0, 2.0, 3.0, 4.0]), Some(2.5));
    }

    #[test]
    fn test_sma_uses_most_recent() {
        let sma = Sma::new(2);
        assert_eq!(sma.calculate(&[100.0, 1.0, 2.0, 4.0]), Some(3.0));
    }

    #[test]
    fn test_sma_flat() {
        let sma = Sma::new(200);
        assert_eq!(sma.calculate(&[100.0; 200]), Some(100.0));
    }
}
