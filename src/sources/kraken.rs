use super::{candles_to_batch, get_json, http_client, FeedFuture, TimestampUnit};
use super::ExchangeAdapter;
use crate::error::FeedError;
use crate::types::{FeedData, FeedMode, PriceBatch, PriceObservation};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Kraken ticker entry.
#[derive(Debug, Deserialize)]
struct KrakenTicker {
    /// Last trade closed [price, lot volume]
    c: Vec<String>,
}

/// Kraken public REST adapter (OHLC and Ticker endpoints).
pub struct KrakenAdapter {
    client: Client,
    timeout: Duration,
    base_url: String,
    pair: String,
    interval: String,
}

impl KrakenAdapter {
    /// Create a new Kraken adapter.
    pub fn new(base_url: &str, pair: &str, interval: &str, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            timeout,
            base_url: base_url.trim_end_matches('/').to_string(),
            pair: pair.to_string(),
            interval: interval.to_string(),
        }
    }

    fn ohlc_url(&self) -> String {
        format!(
            "{}/OHLC?pair={}&interval={}",
            self.base_url, self.pair, self.interval
        )
    }

    fn ticker_url(&self) -> String {
        format!("{}/Ticker?pair={}", self.base_url, self.pair)
    }

    async fn fetch_candles(&self) -> Result<PriceBatch, FeedError> {
        let (status, body) = get_json(&self.client, &self.ohlc_url(), self.timeout).await?;
        let batch = parse_ohlc(&self.pair, status, &body)?;
        debug!("Kraken OHLC: {} candles for {}", batch.len(), self.pair);
        Ok(batch)
    }

    async fn fetch_ticker(&self) -> Result<PriceObservation, FeedError> {
        let (status, body) = get_json(&self.client, &self.ticker_url(), self.timeout).await?;
        parse_ticker(&self.pair, status, &body)
    }
}

impl ExchangeAdapter for KrakenAdapter {
    fn name(&self) -> &str {
        "kraken"
    }

    fn fetch_latest(&self, mode: FeedMode) -> FeedFuture<'_, FeedData> {
        Box::pin(async move {
            match mode {
                FeedMode::Ticker => self.fetch_ticker().await.map(FeedData::Tick),
                FeedMode::Candles => self.fetch_candles().await.map(FeedData::Batch),
            }
        })
    }

    fn fetch_history(&self, limit: usize) -> FeedFuture<'_, PriceBatch> {
        Box::pin(async move {
            // OHLC has no limit parameter; it always returns up to 720 candles.
            let mut batch = self.fetch_candles().await?;
            batch.truncate_to_latest(limit);
            Ok(batch)
        })
    }
}

/// Kraken signals failures through a non-empty `error` array, even on HTTP 200.
fn check_error(status: u16, body: &Value) -> Result<(), FeedError> {
    match body.get("error") {
        Some(Value::Array(errors)) if !errors.is_empty() => {
            let messages: Vec<String> = errors
                .iter()
                .map(|e| e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string()))
                .collect();
            return Err(FeedError::Endpoint(messages.join(", ")));
        }
        Some(Value::String(message)) if !message.is_empty() => {
            return Err(FeedError::Endpoint(message.clone()));
        }
        _ => {}
    }

    if !(200..300).contains(&status) {
        return Err(FeedError::Endpoint(format!("HTTP {}", status)));
    }
    Ok(())
}

/// Locate the entry for `pair` in `result`.
///
/// Kraken may answer under an alternate pair name (`XBTUSD` -> `XXBTZUSD`), so fall back to
/// the first key that is not the `last` cursor.
fn pair_entry<'a>(pair: &str, body: &'a Value) -> Result<&'a Value, FeedError> {
    let result = body
        .get("result")
        .and_then(Value::as_object)
        .ok_or_else(|| FeedError::Malformed("missing result object".to_string()))?;

    result
        .get(pair)
        .or_else(|| {
            result
                .iter()
                .find(|(key, _)| key.as_str() != "last")
                .map(|(_, v)| v)
        })
        .ok_or_else(|| FeedError::Malformed(format!("no data for pair {}", pair)))
}

/// Decode an `OHLC` response into a batch of closes.
pub fn parse_ohlc(pair: &str, status: u16, body: &Value) -> Result<PriceBatch, FeedError> {
    check_error(status, body)?;
    let rows = pair_entry(pair, body)?
        .as_array()
        .ok_or_else(|| FeedError::Malformed("OHLC data is not an array".to_string()))?;
    candles_to_batch("kraken", rows, TimestampUnit::Seconds)
}

/// Decode a `Ticker` response; the price is the last trade `c[0]`.
pub fn parse_ticker(
    pair: &str,
    status: u16,
    body: &Value,
) -> Result<PriceObservation, FeedError> {
    check_error(status, body)?;
    let ticker: KrakenTicker = serde_json::from_value(pair_entry(pair, body)?.clone())?;
    let price = ticker
        .c
        .first()
        .and_then(|p| p.trim().parse::<f64>().ok())
        .filter(|p| p.is_finite())
        .ok_or_else(|| FeedError::Malformed(format!("non-numeric last trade: {:?}", ticker.c)))?;
    Ok(PriceObservation::new(chrono::Utc::now(), price))
}
