//! Feature schema and feature vector types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single named column of the classifier input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    #[serde(rename = "RSI")]
    Rsi,
    #[serde(rename = "SMA_50")]
    Sma50,
    #[serde(rename = "SMA_200")]
    Sma200,
    #[serde(rename = "Price_Change")]
    PriceChange,
    #[serde(rename = "Lag_1_Close")]
    Lag1Close,
    #[serde(rename = "Lag_1_RSI")]
    Lag1Rsi,
}

impl FeatureKind {
    /// Column name used in the training data.
    pub fn column_name(&self) -> &'static str {
        match self {
            FeatureKind::Rsi => "RSI",
            FeatureKind::Sma50 => "SMA_50",
            FeatureKind::Sma200 => "SMA_200",
            FeatureKind::PriceChange => "Price_Change",
            FeatureKind::Lag1Close => "Lag_1_Close",
            FeatureKind::Lag1Rsi => "Lag_1_RSI",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Ordered column layout a classifier was trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureSchema {
    /// `[RSI, SMA_50, SMA_200, Price_Change, Lag_1_Close]`
    Momentum,
    /// `[Lag_1_RSI, SMA_50, SMA_200, Lag_1_Close]`
    Lagged,
}

impl FeatureSchema {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "momentum" => Some(FeatureSchema::Momentum),
            "lagged" => Some(FeatureSchema::Lagged),
            _ => None,
        }
    }

    /// Columns in classifier order.
    pub fn columns(&self) -> &'static [FeatureKind] {
        match self {
            FeatureSchema::Momentum => &[
                FeatureKind::Rsi,
                FeatureKind::Sma50,
                FeatureKind::Sma200,
                FeatureKind::PriceChange,
                FeatureKind::Lag1Close,
            ],
            FeatureSchema::Lagged => &[
                FeatureKind::Lag1Rsi,
                FeatureKind::Sma50,
                FeatureKind::Sma200,
                FeatureKind::Lag1Close,
            ],
        }
    }

    /// Column names in classifier order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns()
            .iter()
            .map(|k| k.column_name().to_string())
            .collect()
    }
}

/// How `Price_Change` is expressed. Fixed per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceChangeKind {
    /// `current - previous`
    Absolute,
    /// `(current / previous - 1) * 100`
    Percent,
}

impl PriceChangeKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "absolute" | "abs" => Some(PriceChangeKind::Absolute),
            "percent" | "pct" | "percentage" => Some(PriceChangeKind::Percent),
            _ => None,
        }
    }
}

/// A feature column whose value may still be undefined (`None`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawFeature {
    pub kind: FeatureKind,
    pub value: Option<f64>,
}

/// Feature columns as computed from the window, before the undefined fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub columns: Vec<RawFeature>,
}

impl FeatureVector {
    /// Columns whose value is undefined.
    pub fn undefined(&self) -> Vec<FeatureKind> {
        self.columns
            .iter()
            .filter(|c| c.value.is_none())
            .map(|c| c.kind)
            .collect()
    }

    pub fn get(&self, kind: FeatureKind) -> Option<f64> {
        self.columns
            .iter()
            .find(|c| c.kind == kind)
            .and_then(|c| c.value)
    }

    /// Replace every undefined value with `0.0`.
    ///
    /// This is the only place undefined features are handled; the classifier never
    /// sees a missing value.
    pub fn resolve_undefined(&self) -> ResolvedFeatures {
        let mut substituted = Vec::new();
        let values = self
            .columns
            .iter()
            .map(|c| {
                let value = match c.value {
                    Some(v) => v,
                    None => {
                        substituted.push(c.kind);
                        0.0
                    }
                };
                FeatureValue {
                    name: c.kind,
                    value,
                }
            })
            .collect();

        ResolvedFeatures {
            values,
            substituted,
        }
    }
}

/// A resolved feature column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureValue {
    pub name: FeatureKind,
    pub value: f64,
}

/// Feature vector ready for inference: every column holds a finite-or-zero value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedFeatures {
    pub values: Vec<FeatureValue>,
    /// Columns that were undefined and replaced with zero.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub substituted: Vec<FeatureKind>,
}

impl ResolvedFeatures {
    /// Values in column order, as one row of the classifier input matrix.
    pub fn row(&self) -> Vec<f64> {
        self.values.iter().map(|v| v.value).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.values
            .iter()
            .map(|v| v.name.column_name().to_string())
            .collect()
    }

    pub fn get(&self, kind: FeatureKind) -> Option<f64> {
        self.values.iter().find(|v| v.name == kind).map(|v| v.value)
    }
}
