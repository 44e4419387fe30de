//! OKX `history-candles` client feeding the price chart.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::Serialize;

use crate::error::FeedError;
use crate::types::OkxResponse;

const DEFAULT_BASE_URL: &str = "https://www.okx.com";
const HISTORY_CANDLES_PATH: &str = "api/v5/market/history-candles";
const ENDPOINT: &str = "okx history-candles";

/// One OHLCV bar. `time` is the bar open in unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug)]
pub struct OkxCandleClient {
    client: Client,
    base_url: Url,
}

impl OkxCandleClient {
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, FeedError> {
        Self::with_base_url(timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the `reqwest::Client` cannot be built, or
    /// [`FeedError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()
            .map_err(FeedError::Http)?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| FeedError::InvalidBaseUrl {
            base_url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self { client, base_url })
    }

    /// Fetches up to `limit` bars of size `bar` (e.g. `1H`) for `inst_id`
    /// (e.g. `BTC-USDT`), ascending by time with duplicate timestamps removed.
    ///
    /// # Errors
    ///
    /// - [`FeedError::UpstreamUnavailable`] on a non-2xx status.
    /// - [`FeedError::ApiError`] when OKX reports a non-zero `code`.
    /// - [`FeedError::Http`] or [`FeedError::Deserialize`] on transport or
    ///   shape failures.
    pub async fn fetch_candles(
        &self,
        inst_id: &str,
        bar: &str,
        limit: u32,
    ) -> Result<Vec<Candle>, FeedError> {
        let mut url =
            self.base_url
                .join(HISTORY_CANDLES_PATH)
                .map_err(|e| FeedError::InvalidBaseUrl {
                    base_url: self.base_url.to_string(),
                    reason: e.to_string(),
                })?;
        url.query_pairs_mut()
            .append_pair("instId", inst_id)
            .append_pair("bar", bar)
            .append_pair("limit", &limit.to_string());

        let response = self.client.get(url).send().await.map_err(FeedError::Http)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::UpstreamUnavailable {
                status: status.as_u16(),
                endpoint: ENDPOINT,
            });
        }

        let body = response.text().await.map_err(FeedError::Http)?;
        let envelope: OkxResponse =
            serde_json::from_str(&body).map_err(|e| FeedError::Deserialize {
                context: format!("{ENDPOINT} (instId={inst_id}, bar={bar})"),
                source: e,
            })?;

        if envelope.code != "0" {
            return Err(FeedError::ApiError {
                endpoint: ENDPOINT,
                message: format!("code {}: {}", envelope.code, envelope.msg),
            });
        }

        let candles = normalise_rows(&envelope.data);
        tracing::debug!(inst_id, bar, count = candles.len(), "okx: fetched candles");
        Ok(candles)
    }
}

/// Parses raw rows, sorts ascending by time and keeps the last row seen for
/// each timestamp.
fn normalise_rows(rows: &[Vec<String>]) -> Vec<Candle> {
    let mut candles: Vec<Candle> = rows.iter().filter_map(|row| parse_row(row)).collect();
    // Stable, so among equal timestamps the later upstream entry stays last.
    candles.sort_by_key(|c| c.time);

    let mut deduped: Vec<Candle> = Vec::with_capacity(candles.len());
    for candle in candles {
        match deduped.last_mut() {
            Some(last) if last.time == candle.time => *last = candle,
            _ => deduped.push(candle),
        }
    }
    deduped
}

fn parse_row(row: &[String]) -> Option<Candle> {
    let [ts, open, high, low, close, volume, ..] = row else {
        tracing::warn!(fields = row.len(), "okx: skipping short candle row");
        return None;
    };
    let parsed = parse_fields([ts, open, high, low, close, volume]);
    if parsed.is_none() {
        tracing::warn!(ts = %ts, "okx: skipping unparseable candle row");
    }
    parsed
}

fn parse_fields([ts, open, high, low, close, volume]: [&String; 6]) -> Option<Candle> {
    Some(Candle {
        time: ts.parse::<i64>().ok()? / 1000,
        open: open.parse().ok()?,
        high: high.parse().ok()?,
        low: low.parse().ok()?,
        close: close.parse().ok()?,
        volume: volume.parse().ok()?,
    })
}
