use std::time::Duration;
use thiserror::Error;

/// Failures while fetching prices from a market-data endpoint.
///
/// All variants are recoverable: the cycle is skipped and the window is left untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("Endpoint error: {0}")]
    Endpoint(String),

    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("No valid close prices in response")]
    NoValidData,
}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FeedError::Malformed(e.to_string())
        } else {
            FeedError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        FeedError::Malformed(e.to_string())
    }
}

/// Classifier artifact and inference errors.
///
/// Everything except `Predict` can only happen while loading at startup.
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Classifier artifact not found: {0}")]
    Missing(String),

    #[error("Failed to read classifier artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt classifier artifact: {0}")]
    Corrupt(String),

    #[error("Feature schema mismatch: model expects {expected:?}, pipeline produces {actual:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Prediction failed: {0}")]
    Predict(String),
}

/// Signal sink write failures. Logged by the scheduler, never fatal.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

/// The window does not yet hold enough observations for every feature in the schema.
///
/// Expected during warm-up; reported as a state rather than a failure.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Insufficient data: have {have}, need {need}")]
pub struct InsufficientData {
    pub have: usize,
    pub need: usize,
}

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    InsufficientData(#[from] InsufficientData),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_error_messages() {
        assert_eq!(
            FeedError::Endpoint("EQuery:Unknown asset pair".to_string()).to_string(),
            "Endpoint error: EQuery:Unknown asset pair"
        );
        assert_eq!(
            FeedError::Timeout(Duration::from_secs(10)).to_string(),
            "Fetch timed out after 10s"
        );
        assert_eq!(
            FeedError::Timeout(Duration::from_millis(300)).to_string(),
            "Fetch timed out after 300ms"
        );
        assert_eq!(
            FeedError::NoValidData.to_string(),
            "No valid close prices in response"
        );
    }

    #[test]
    fn test_insufficient_data_message() {
        let err = InsufficientData { have: 42, need: 200 };
        assert_eq!(err.to_string(), "Insufficient data: have 42, need 200");
    }

    #[test]
    fn test_app_error_from_conversions() {
        let err: AppError = FeedError::NoValidData.into();
        assert!(matches!(err, AppError::Feed(FeedError::NoValidData)));

        let err: AppError = ClassifierError::Missing("model.json".to_string()).into();
        assert!(matches!(err, AppError::Classifier(ClassifierError::Missing(_))));
    }

    #[test]
    fn test_serde_error_maps_to_malformed() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: FeedError = parse_err.into();
        assert!(matches!(err, FeedError::Malformed(_)));
    }
}
