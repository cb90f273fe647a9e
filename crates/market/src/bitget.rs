use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use common::{Candle, Error, MarketData, Result, Timeframe};

const BASE_URL: &str = "https://api.bitget.com";

/// REST client for the Bitget public market-data API.
///
/// Only the spot candle endpoint is used; no credentials or request signing
/// are required for public data.
pub struct BitgetClient {
    http: Client,
    base_url: String,
}

impl BitgetClient {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    /// Point the client at a different host (test servers).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                .use_rustls_tls()
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.into(),
        }
    }
}

impl Default for BitgetClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketData for BitgetClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let url = format!(
            "{}/api/v2/spot/market/candles?symbol={}&granularity={}&limit={}",
            self.base_url,
            symbol,
            granularity(timeframe),
            limit
        );

        debug!(symbol = %symbol, timeframe = %timeframe, limit, "Fetching candles from Bitget");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Exchange(format!("HTTP {status}: {body}")));
        }

        parse_candles(&body, limit)
    }
}

/// Bitget granularity token for a timeframe.
fn granularity(timeframe: Timeframe) -> &'static str {
    match timeframe {
        Timeframe::M1 => "1min",
        Timeframe::M5 => "5min",
        Timeframe::M15 => "15min",
        Timeframe::H1 => "1h",
    }
}

// ─── Bitget candle JSON parsing ──────────────────────────────────────────────

/// Envelope around every Bitget v2 response.
/// Candle rows are arrays of strings:
/// `[ts_ms, open, high, low, close, base_vol, usdt_vol, quote_vol]`.
#[derive(Deserialize)]
struct CandlesResponse {
    code: String,
    msg: String,
    #[serde(default)]
    data: Vec<Vec<Value>>,
}

fn parse_candles(body: &str, limit: usize) -> Result<Vec<Candle>> {
    let resp: CandlesResponse = serde_json::from_str(body)?;
    if resp.code != "00000" {
        return Err(Error::Exchange(format!(
            "Bitget error {}: {}",
            resp.code, resp.msg
        )));
    }

    let mut candles = resp
        .data
        .iter()
        .map(|row| parse_row(row))
        .collect::<Result<Vec<Candle>>>()?;

    // The engine requires ascending timestamps and at most `limit` candles,
    // keeping the most recent ones.
    candles.sort_by_key(|c| c.timestamp);
    if candles.len() > limit {
        let excess = candles.len() - limit;
        candles.drain(..excess);
    }
    Ok(candles)
}

fn parse_row(row: &[Value]) -> Result<Candle> {
    let ts_ms = field(row, 0)?
        .parse::<i64>()
        .map_err(|_| Error::Exchange(format!("invalid candle timestamp: {:?}", row.first())))?;
    let timestamp = Utc
        .timestamp_millis_opt(ts_ms)
        .single()
        .ok_or_else(|| Error::Exchange(format!("candle timestamp out of range: {ts_ms}")))?;

    Ok(Candle {
        timestamp,
        open: field_f64(row, 1)?,
        high: field_f64(row, 2)?,
        low: field_f64(row, 3)?,
        close: field_f64(row, 4)?,
        volume: field_f64(row, 5)?,
    })
}

/// Bitget encodes numbers as JSON strings; tolerate plain numbers too.
fn field(row: &[Value], idx: usize) -> Result<String> {
    let value = row
        .get(idx)
        .ok_or_else(|| Error::Exchange(format!("candle row too short, missing field {idx}")))?;
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(Error::Exchange(format!(
            "unexpected candle field {idx}: {other}"
        ))),
    }
}

fn field_f64(row: &[Value], idx: usize) -> Result<f64> {
    field(row, idx)?
        .parse::<f64>()
        .map_err(|_| Error::Exchange(format!("non-numeric candle field {idx}")))
}
