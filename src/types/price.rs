use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchange a price feed is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    Kraken,
    Binance,
}

impl Exchange {
    /// Parse an exchange from its configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "kraken" => Some(Exchange::Kraken),
            "binance" => Some(Exchange::Binance),
            _ => None,
        }
    }

    /// Default trading pair for this exchange.
    pub fn default_pair(&self) -> &'static str {
        match self {
            Exchange::Kraken => "XXBTZUSD",
            Exchange::Binance => "BTCUSDT",
        }
    }

    /// Default candle interval, in the exchange's own notation.
    pub fn default_candle_interval(&self) -> &'static str {
        match self {
            Exchange::Kraken => "1",
            Exchange::Binance => "1m",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exchange::Kraken => write!(f, "kraken"),
            Exchange::Binance => write!(f, "binance"),
        }
    }
}

/// Whether each cycle reads the latest ticker price or the latest OHLC candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    Ticker,
    Candles,
}

impl FeedMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "ticker" => Some(FeedMode::Ticker),
            "candles" | "ohlc" | "klines" => Some(FeedMode::Candles),
            _ => None,
        }
    }
}

/// A single closing-price observation. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

impl PriceObservation {
    pub fn new(timestamp: DateTime<Utc>, close: f64) -> Self {
        Self { timestamp, close }
    }
}

/// Candle closes from one response, oldest first, with invalid closes already removed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceBatch {
    pub observations: Vec<PriceObservation>,
    /// Number of candles dropped because their close was not a finite number.
    pub dropped: usize,
}

impl PriceBatch {
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Keep only the newest `limit` observations.
    pub fn truncate_to_latest(&mut self, limit: usize) {
        if self.observations.len() > limit {
            let excess = self.observations.len() - limit;
            self.observations.drain(..excess);
        }
    }
}

/// Result of a successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedData {
    Tick(PriceObservation),
    Batch(PriceBatch),
}

impl FeedData {
    /// Closing prices in observation order.
    pub fn closes(&self) -> Vec<f64> {
        match self {
            FeedData::Tick(obs) => vec![obs.close],
            FeedData::Batch(batch) => batch.observations.iter().map(|o| o.close).collect(),
        }
    }

    /// The most recent observation, if any.
    pub fn latest(&self) -> Option<&PriceObservation> {
        match self {
            FeedData::Tick(obs) => Some(obs),
            FeedData::Batch(batch) => batch.observations.last(),
        }
    }
}
