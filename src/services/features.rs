//! Feature assembly from the rolling window.

use crate::error::InsufficientData;
use crate::services::indicators::{lag_close, lagged, price_change, Indicator, Rsi, Sma};
use crate::types::{FeatureKind, FeatureSchema, FeatureVector, PriceChangeKind, RawFeature};

/// Builds the classifier input in the exact column order of a [`FeatureSchema`].
pub struct FeatureAssembler {
    schema: FeatureSchema,
    price_change: PriceChangeKind,
    rsi: Rsi,
    sma_short: Sma,
    sma_long: Sma,
}

impl FeatureAssembler {
    pub fn new(schema: FeatureSchema, price_change: PriceChangeKind) -> Self {
        Self {
            schema,
            price_change,
            rsi: Rsi::default(),
            sma_short: Sma::new(50),
            sma_long: Sma::new(200),
        }
    }

    pub fn schema(&self) -> FeatureSchema {
        self.schema
    }

    pub fn column_names(&self) -> Vec<String> {
        self.schema.column_names()
    }

    /// Closes needed before a column can be computed.
    fn required(&self, kind: FeatureKind) -> usize {
        match kind {
            FeatureKind::Rsi => self.rsi.min_periods(),
            FeatureKind::Lag1Rsi => self.rsi.min_periods() + 1,
            FeatureKind::Sma50 => self.sma_short.min_periods(),
            FeatureKind::Sma200 => self.sma_long.min_periods(),
            FeatureKind::PriceChange | FeatureKind::Lag1Close => 1,
        }
    }

    /// Window length at which every column in the schema is computable.
    pub fn min_length(&self) -> usize {
        self.schema
            .columns()
            .iter()
            .map(|kind| self.required(*kind))
            .max()
            .unwrap_or(0)
    }

    /// Compute the feature vector for `closes` (oldest first).
    ///
    /// `previous_close` is the close threaded from the previous cycle; without one, the
    /// second-to-last close in the window is used. Values that cannot be computed are left
    /// undefined for [`FeatureVector::resolve_undefined`].
    pub fn assemble(
        &self,
        closes: &[f64],
        previous_close: Option<f64>,
    ) -> Result<FeatureVector, InsufficientData> {
        let need = self.min_length();
        if closes.len() < need {
            return Err(InsufficientData {
                have: closes.len(),
                need,
            });
        }

        let current = closes.last().copied();
        let lag_1_close = previous_close.or_else(|| lag_close(closes));

        let columns = self
            .schema
            .columns()
            .iter()
            .map(|kind| {
                let value = match kind {
                    FeatureKind::Rsi => self.rsi.calculate(closes),
                    FeatureKind::Lag1Rsi => lagged(&self.rsi, closes),
                    FeatureKind::Sma50 => self.sma_short.calculate(closes),
                    FeatureKind::Sma200 => self.sma_long.calculate(closes),
                    FeatureKind::Lag1Close => lag_1_close,
                    FeatureKind::PriceChange => match (current, lag_1_close) {
                        (Some(current), Some(previous)) => {
                            price_change(current, previous, self.price_change)
                        }
                        _ => None,
                    },
                };
                RawFeature { kind: *kind, value }
            })
            .collect();

        Ok(FeatureVector { columns })
    }
}
