use super::{candles_to_batch, get_json, http_client, FeedFuture, TimestampUnit};
use super::ExchangeAdapter;
use crate::error::FeedError;
use crate::types::{FeedData, FeedMode, PriceBatch, PriceObservation};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Binance caps klines requests at 1000 candles.
const MAX_KLINES_LIMIT: usize = 1000;

/// Binance ticker price response.
#[derive(Debug, Deserialize)]
struct BinanceTickerPrice {
    price: String,
}

/// Binance spot REST adapter (klines and ticker/price endpoints).
pub struct BinanceAdapter {
    client: Client,
    timeout: Duration,
    base_url: String,
    symbol: String,
    interval: String,
}

impl BinanceAdapter {
    /// Create a new Binance adapter.
    pub fn new(base_url: &str, symbol: &str, interval: &str, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            timeout,
            base_url: base_url.trim_end_matches('/').to_string(),
            symbol: symbol.to_uppercase(),
            interval: interval.to_string(),
        }
    }

    fn klines_url(&self, limit: Option<usize>) -> String {
        let mut url = format!(
            "{}/klines?symbol={}&interval={}",
            self.base_url, self.symbol, self.interval
        );
        if let Some(limit) = limit {
            url.push_str(&format!("&limit={}", limit.clamp(1, MAX_KLINES_LIMIT)));
        }
        url
    }

    fn ticker_url(&self) -> String {
        format!("{}/ticker/price?symbol={}", self.base_url, self.symbol)
    }

    async fn fetch_klines(&self, limit: Option<usize>) -> Result<PriceBatch, FeedError> {
        let (status, body) = get_json(&self.client, &self.klines_url(limit), self.timeout).await?;
        let batch = parse_klines(status, &body)?;
        debug!("Binance klines: {} candles for {}", batch.len(), self.symbol);
        Ok(batch)
    }

    async fn fetch_ticker(&self) -> Result<PriceObservation, FeedError> {
        let (status, body) = get_json(&self.client, &self.ticker_url(), self.timeout).await?;
        parse_ticker(status, &body)
    }
}

impl ExchangeAdapter for BinanceAdapter {
    fn name(&self) -> &str {
        "binance"
    }

    fn fetch_latest(&self, mode: FeedMode) -> FeedFuture<'_, FeedData> {
        Box::pin(async move {
            match mode {
                FeedMode::Ticker => self.fetch_ticker().await.map(FeedData::Tick),
                FeedMode::Candles => self.fetch_klines(None).await.map(FeedData::Batch),
            }
        })
    }

    fn fetch_history(&self, limit: usize) -> FeedFuture<'_, PriceBatch> {
        Box::pin(async move {
            let mut batch = self.fetch_klines(Some(limit)).await?;
            batch.truncate_to_latest(limit);
            Ok(batch)
        })
    }
}

/// Binance reports failures as `{"code": <int>, "msg": <str>}`.
fn check_error(status: u16, body: &Value) -> Result<(), FeedError> {
    if let Some(msg) = body.get("msg") {
        let code = body.get("code").and_then(Value::as_i64).unwrap_or_default();
        let msg = msg.as_str().map(str::to_string).unwrap_or_else(|| msg.to_string());
        return Err(FeedError::Endpoint(format!("{} (code {})", msg, code)));
    }

    if !(200..300).contains(&status) {
        return Err(FeedError::Endpoint(format!("HTTP {}", status)));
    }
    Ok(())
}

/// Decode a `klines` response into a batch of closes.
pub fn parse_klines(status: u16, body: &Value) -> Result<PriceBatch, FeedError> {
    check_error(status, body)?;
    let rows = body
        .as_array()
        .ok_or_else(|| FeedError::Malformed("klines response is not an array".to_string()))?;
    candles_to_batch("binance", rows, TimestampUnit::Millis)
}

pub fn parse_ticker(status: u16, body: &Value) -> Result<PriceObservation, FeedError> {
    check_error(status, body)?;
    let ticker: BinanceTickerPrice = serde_json::from_value(body.clone())?;
    let price = ticker
        .price
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .ok_or_else(|| FeedError::Malformed(format!("non-numeric price: {}", ticker.price)))?;
    Ok(PriceObservation::new(chrono::Utc::now(), price))
}
