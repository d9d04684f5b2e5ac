//! Yahoo Finance chart provider.
//!
//! Daily closing prices per ticker, used for the optional price columns
//! on the rates sheet (commodities, equities). These are never critical:
//! a failed ticker fetch leaves its column absent.
//!
//! API: `https://query1.finance.yahoo.com/v8/finance/chart/{symbol}`
//! Null closes inside the payload are structurally absent dates and are
//! dropped at parse time; there is no in-band sentinel.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{fetch_err, send_with_retry, RetryPolicy, SeriesProvider};
use crate::types::{PipelineError, RawPoint, RawSeries};

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const PROVIDER_NAME: &str = "yahoo";

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Vec<ChartResult>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
    /// Present when `events=div|split` adjusted closes are available.
    #[serde(default)]
    adjclose: Vec<AdjClose>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

pub struct YahooProvider {
    http: Client,
    retry: RetryPolicy,
}

impl YahooProvider {
    pub fn new(retry: RetryPolicy) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .user_agent("macrofin/0.1.0")
            .build()
            .context("Failed to build Yahoo HTTP client")?;
        Ok(Self { http, retry })
    }

    /// Zip timestamps with closes, preferring adjusted closes when present.
    fn parse_chart(code: &str, result: ChartResult) -> Result<Vec<RawPoint>, PipelineError> {
        let closes: &[Option<f64>] = result
            .indicators
            .adjclose
            .first()
            .map(|a| a.adjclose.as_slice())
            .or_else(|| result.indicators.quote.first().map(|q| q.close.as_slice()))
            .ok_or_else(|| fetch_err(PROVIDER_NAME, code, "payload has no close series"))?;

        if closes.len() != result.timestamp.len() {
            return Err(fetch_err(
                PROVIDER_NAME,
                code,
                format!(
                    "timestamp/close length mismatch: {} vs {}",
                    result.timestamp.len(),
                    closes.len()
                ),
            ));
        }

        let mut points = Vec::with_capacity(closes.len());
        for (ts, close) in result.timestamp.iter().zip(closes) {
            let Some(value) = close else { continue };
            let date = DateTime::<Utc>::from_timestamp(*ts, 0)
                .ok_or_else(|| {
                    fetch_err(PROVIDER_NAME, code, format!("invalid timestamp {ts}"))
                })?
                .date_naive();
            points.push(RawPoint {
                date,
                value: *value,
            });
        }
        Ok(points)
    }
}

#[async_trait]
impl SeriesProvider for YahooProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    /// `code` is the Yahoo ticker, e.g. "GC=F".
    async fn fetch(
        &self,
        code: &str,
        start_date: NaiveDate,
    ) -> Result<RawSeries, PipelineError> {
        let period1 = start_date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0);
        let period2 = Utc::now().timestamp();

        let url = format!("{BASE_URL}/{code}");
        let request = self.http.get(&url).query(&[
            ("period1", period1.to_string()),
            ("period2", period2.to_string()),
            ("interval", "1d".to_string()),
        ]);

        let resp = send_with_retry(self.retry, request, PROVIDER_NAME, code).await?;

        let data: ChartResponse = resp.json().await.map_err(|e| {
            fetch_err(PROVIDER_NAME, code, format!("malformed payload: {e}"))
        })?;

        let result = data
            .chart
            .result
            .into_iter()
            .next()
            .ok_or_else(|| fetch_err(PROVIDER_NAME, code, "empty result"))?;

        let points = Self::parse_chart(code, result)?;
        debug!(code, points = points.len(), "Yahoo series fetched");

        Ok(RawSeries::new(PROVIDER_NAME, code, points, None))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"symbol": "GC=F"},
                "timestamp": [1704067200, 1704153600, 1704240000],
                "indicators": {
                    "quote": [{"close": [2062.4, null, 2050.1]}],
                    "adjclose": [{"adjclose": [2062.4, null, 2050.1]}]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_parse_chart_drops_null_closes() {
        let parsed: ChartResponse = serde_json::from_str(SAMPLE).unwrap();
        let result = parsed.chart.result.into_iter().next().unwrap();
        let points = YahooProvider::parse_chart("GC=F", result).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, 2062.4);
        assert_eq!(
            points[0].date,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert_eq!(points[1].value, 2050.1);
    }

    #[test]
    fn test_parse_chart_falls_back_to_quote_close() {
        let json = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1704067200],
                    "indicators": {"quote": [{"close": [100.0]}]}
                }]
            }
        }"#;
        let parsed: ChartResponse = serde_json::from_str(json).unwrap();
        let result = parsed.chart.result.into_iter().next().unwrap();
        let points = YahooProvider::parse_chart("ABNB", result).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value, 100.0);
    }

    #[test]
    fn test_length_mismatch_is_fetch_error() {
        let json = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1704067200, 1704153600],
                    "indicators": {"quote": [{"close": [100.0]}]}
                }]
            }
        }"#;
        let parsed: ChartResponse = serde_json::from_str(json).unwrap();
        let result = parsed.chart.result.into_iter().next().unwrap();
        let err = YahooProvider::parse_chart("ABNB", result).unwrap_err();
        assert!(matches!(err, PipelineError::Fetch { .. }));
    }

    #[test]
    fn test_no_close_series_is_fetch_error() {
        let json = r#"{
            "chart": {
                "result": [{
                    "timestamp": [],
                    "indicators": {}
                }]
            }
        }"#;
        let parsed: ChartResponse = serde_json::from_str(json).unwrap();
        let result = parsed.chart.result.into_iter().next().unwrap();
        let err = YahooProvider::parse_chart("GC=F", result).unwrap_err();
        assert!(err.to_string().contains("no close series"));
    }
}
