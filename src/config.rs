use crate::error::AppError;
use crate::types::{Exchange, FeatureSchema, FeedMode, PriceChangeKind};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_KRAKEN_API_URL: &str = "https://api.kraken.com/0/public";
const DEFAULT_BINANCE_API_URL: &str = "https://api.binance.com/api/v3";

/// Application configuration. Read once at startup and never reloaded.
#[derive(Debug, Clone)]
pub struct Config {
    /// Exchange adapter to use.
    pub exchange: Exchange,
    /// Trading pair in the exchange's notation.
    pub pair: String,
    /// Ticker price or OHLC candles per cycle.
    pub feed_mode: FeedMode,
    /// Candle interval in the exchange's notation (kraken minutes, binance "1m").
    pub candle_interval: String,
    /// Keep only the newest N candles of each fetched batch.
    pub candle_limit: Option<usize>,
    /// Fixed delay between prediction cycles (seconds).
    pub prediction_interval_secs: u64,
    /// Per-fetch timeout (seconds).
    pub fetch_timeout_secs: u64,
    /// Path to the classifier artifact.
    pub classifier_path: PathBuf,
    /// Feature columns the classifier was trained with.
    pub feature_schema: FeatureSchema,
    /// Encoding of the `Price_Change` column.
    pub price_change: PriceChangeKind,
    /// Pre-fill the window from the exchange's history endpoint at startup.
    pub seed_history: bool,
    /// Optional SQLite database for prediction records.
    pub sqlite_path: Option<PathBuf>,
    /// Kraken public API base URL.
    pub kraken_api_url: String,
    /// Binance API base URL.
    pub binance_api_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let exchange = match lookup("EXCHANGE") {
            Some(name) => Exchange::from_name(&name)
                .ok_or_else(|| AppError::Config(format!("unknown EXCHANGE: {}", name)))?,
            None => Exchange::Kraken,
        };

        let feed_mode = match lookup("FEED_MODE") {
            Some(name) => FeedMode::from_name(&name)
                .ok_or_else(|| AppError::Config(format!("unknown FEED_MODE: {}", name)))?,
            None => FeedMode::Candles,
        };

        let feature_schema = match lookup("FEATURE_SCHEMA") {
            Some(name) => FeatureSchema::from_name(&name)
                .ok_or_else(|| AppError::Config(format!("unknown FEATURE_SCHEMA: {}", name)))?,
            None => FeatureSchema::Momentum,
        };

        let price_change = match lookup("PRICE_CHANGE") {
            Some(name) => PriceChangeKind::from_name(&name)
                .ok_or_else(|| AppError::Config(format!("unknown PRICE_CHANGE: {}", name)))?,
            None => PriceChangeKind::Absolute,
        };

        let config = Self {
            exchange,
            pair: lookup("PAIR").unwrap_or_else(|| exchange.default_pair().to_string()),
            feed_mode,
            candle_interval: lookup("CANDLE_INTERVAL")
                .unwrap_or_else(|| exchange.default_candle_interval().to_string()),
            candle_limit: lookup("CANDLE_LIMIT").and_then(|v| v.parse().ok()),
            prediction_interval_secs: lookup("PREDICTION_INTERVAL_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            fetch_timeout_secs: lookup("FETCH_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            classifier_path: lookup("CLASSIFIER_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("random_forest_model.json")),
            feature_schema,
            price_change,
            seed_history: lookup("SEED_HISTORY")
                .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no"))
                .unwrap_or(true),
            sqlite_path: lookup("SQLITE_PATH")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            kraken_api_url: lookup("KRAKEN_API_URL")
                .unwrap_or_else(|| DEFAULT_KRAKEN_API_URL.to_string()),
            binance_api_url: lookup("BINANCE_API_URL")
                .unwrap_or_else(|| DEFAULT_BINANCE_API_URL.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.pair.trim().is_empty() {
            return Err(AppError::Config("PAIR must not be empty".to_string()));
        }
        if self.prediction_interval_secs == 0 {
            return Err(AppError::Config(
                "PREDICTION_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(AppError::Config(
                "FETCH_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        if self.candle_limit == Some(0) {
            return Err(AppError::Config(
                "CANDLE_LIMIT must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn prediction_interval(&self) -> Duration {
        Duration::from_secs(self.prediction_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Base URL for the configured exchange.
    pub fn api_url(&self) -> &str {
        match self.exchange {
            Exchange::Kraken => &self.kraken_api_url,
            Exchange::Binance => &self.binance_api_url,
        }
    }
}
