//! Market-data exchange adapters and the price feed built on top of them.

pub mod binance;
pub mod kraken;

pub use binance::BinanceAdapter;
pub use kraken::KrakenAdapter;

use crate::config::Config;
use crate::error::FeedError;
use crate::types::{Exchange, FeedData, FeedMode, PriceBatch, PriceObservation};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, warn};

/// Boxed future returned by exchange adapters.
pub type FeedFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, FeedError>> + Send + 'a>>;

/// Capability interface every exchange integration provides.
pub trait ExchangeAdapter: Send + Sync {
    /// Exchange name used in logs.
    fn name(&self) -> &str;

    /// Fetch the latest ticker price or the latest candle batch.
    fn fetch_latest(&self, mode: FeedMode) -> FeedFuture<'_, FeedData>;

    /// Fetch up to `limit` of the most recent candles, oldest first.
    fn fetch_history(&self, limit: usize) -> FeedFuture<'_, PriceBatch>;
}

/// Build the adapter selected by configuration.
pub fn adapter_from_config(config: &Config) -> Box<dyn ExchangeAdapter> {
    match config.exchange {
        Exchange::Kraken => Box::new(KrakenAdapter::new(
            config.api_url(),
            &config.pair,
            &config.candle_interval,
            config.fetch_timeout(),
        )),
        Exchange::Binance => Box::new(BinanceAdapter::new(
            config.api_url(),
            &config.pair,
            &config.candle_interval,
            config.fetch_timeout(),
        )),
    }
}

/// Price feed: one adapter plus the per-fetch timeout and batch policy.
///
/// Only fetches. The caller decides what to do with the returned prices.
pub struct PriceFeed {
    adapter: Box<dyn ExchangeAdapter>,
    mode: FeedMode,
    candle_limit: Option<usize>,
    timeout: Duration,
}

impl PriceFeed {
    pub fn new(
        adapter: Box<dyn ExchangeAdapter>,
        mode: FeedMode,
        candle_limit: Option<usize>,
        timeout: Duration,
    ) -> Self {
        Self {
            adapter,
            mode,
            candle_limit,
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            adapter_from_config(config),
            config.feed_mode,
            config.candle_limit,
            config.fetch_timeout(),
        )
    }

    pub fn name(&self) -> &str {
        self.adapter.name()
    }

    pub fn mode(&self) -> FeedMode {
        self.mode
    }

    /// Fetch the latest observation(s).
    pub async fn fetch(&self) -> Result<FeedData, FeedError> {
        let data = tokio::time::timeout(self.timeout, self.adapter.fetch_latest(self.mode))
            .await
            .map_err(|_| FeedError::Timeout(self.timeout))??;

        match data {
            FeedData::Batch(mut batch) => {
                if let Some(limit) = self.candle_limit {
                    batch.truncate_to_latest(limit);
                }
                if batch.is_empty() {
                    return Err(FeedError::NoValidData);
                }
                debug!(
                    "{} returned {} candles ({} dropped)",
                    self.adapter.name(),
                    batch.len(),
                    batch.dropped
                );
                Ok(FeedData::Batch(batch))
            }
            FeedData::Tick(obs) => {
                debug!("{} ticker: {}", self.adapter.name(), obs.close);
                Ok(FeedData::Tick(obs))
            }
        }
    }

    /// Fetch recent history used to pre-fill the window.
    pub async fn fetch_history(&self, limit: usize) -> Result<PriceBatch, FeedError> {
        let batch = tokio::time::timeout(self.timeout, self.adapter.fetch_history(limit))
            .await
            .map_err(|_| FeedError::Timeout(self.timeout))??;
        if batch.is_empty() {
            return Err(FeedError::NoValidData);
        }
        Ok(batch)
    }
}

/// Slack added to the client-level timeout so the feed deadline always fires first.
const CLIENT_TIMEOUT_GRACE: Duration = Duration::from_secs(1);

/// Longest slice of an error body quoted in an endpoint error.
const ERROR_BODY_PREVIEW: usize = 200;

/// Build the shared HTTP client for an adapter.
pub(crate) fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .user_agent("Trendcast/0.1")
        .timeout(timeout + CLIENT_TIMEOUT_GRACE)
        .build()
        .unwrap_or_else(|_| Client::new())
}

fn request_error(e: reqwest::Error, timeout: Duration) -> FeedError {
    if e.is_timeout() {
        FeedError::Timeout(timeout)
    } else {
        e.into()
    }
}

/// GET a URL and parse the body as JSON.
///
/// Non-success statuses are returned alongside the body so the adapter can look for an
/// error payload first; a non-JSON body on a failed status becomes an endpoint error.
pub(crate) async fn get_json(
    client: &Client,
    url: &str,
    timeout: Duration,
) -> Result<(u16, Value), FeedError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| request_error(e, timeout))?;
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| request_error(e, timeout))?;

    match serde_json::from_str::<Value>(&text) {
        Ok(body) => Ok((status.as_u16(), body)),
        Err(e) if status.is_success() => Err(FeedError::Malformed(e.to_string())),
        Err(_) => Err(FeedError::Endpoint(format!(
            "HTTP {}: {}",
            status,
            text.chars().take(ERROR_BODY_PREVIEW).collect::<String>()
        ))),
    }
}

/// Read a JSON string or number as a finite price.
pub(crate) fn value_as_price(value: &Value) -> Option<f64> {
    let price = match value {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }?;
    price.is_finite().then_some(price)
}

/// Unit of the candle open-time column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimestampUnit {
    Seconds,
    Millis,
}

fn value_as_timestamp(value: &Value, unit: TimestampUnit) -> Option<DateTime<Utc>> {
    let raw = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    match unit {
        TimestampUnit::Seconds => DateTime::from_timestamp(raw, 0),
        TimestampUnit::Millis => DateTime::from_timestamp_millis(raw),
    }
}

/// Convert `[timestamp, open, high, low, close, ...]` rows into a batch.
///
/// Rows with a non-numeric close are dropped one by one; the rest keep their order.
pub(crate) fn candles_to_batch(
    source: &str,
    rows: &[Value],
    unit: TimestampUnit,
) -> Result<PriceBatch, FeedError> {
    let fetched_at = Utc::now();
    let mut batch = PriceBatch::default();

    for row in rows {
        let close = row
            .as_array()
            .and_then(|cols| cols.get(4))
            .and_then(value_as_price);

        match close {
            Some(close) => {
                let timestamp = row
                    .as_array()
                    .and_then(|cols| cols.first())
                    .and_then(|ts| value_as_timestamp(ts, unit))
                    .unwrap_or(fetched_at);
                batch
                    .observations
                    .push(PriceObservation::new(timestamp, close));
            }
            None => {
                warn!("{}: invalid close in candle {}, skipping", source, row);
                batch.dropped += 1;
            }
        }
    }

    if batch.is_empty() {
        return Err(FeedError::NoValidData);
    }
    Ok(batch)
}
