use super::features::ResolvedFeatures;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Predicted direction of the next move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// Class `0`: price expected to fall or stay flat.
    Down,
    /// Class `1`: price expected to rise.
    Up,
}

impl Label {
    /// Map a raw class label to a direction. Only `0` and `1` are valid.
    pub fn from_class(class: i64) -> Option<Self> {
        match class {
            0 => Some(Label::Down),
            1 => Some(Label::Up),
            _ => None,
        }
    }

    pub fn as_class(&self) -> u8 {
        match self {
            Label::Down => 0,
            Label::Up => 1,
        }
    }
}

/// One emitted signal. Created once per successful cycle and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    /// Unique record ID.
    pub id: Uuid,
    /// When the cycle produced this record.
    pub timestamp: DateTime<Utc>,
    /// Features exactly as passed to the classifier.
    pub features: ResolvedFeatures,
    /// Predicted label.
    pub label: Label,
    /// Most recent close at prediction time.
    pub actual_price: f64,
    /// Close the lag features were computed against.
    pub previous_close: f64,
    /// Version string of the classifier artifact.
    pub model_version: String,
}

impl PredictionRecord {
    pub fn new(
        features: ResolvedFeatures,
        label: Label,
        actual_price: f64,
        previous_close: f64,
        model_version: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            features,
            label,
            actual_price,
            previous_close,
            model_version,
        }
    }
}
