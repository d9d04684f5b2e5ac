//! FinMind exchange-rate provider.
//!
//! Fetches the Bank of Taiwan EUR/TWD cash quotes that every downstream
//! sheet keys off — this is the baseline currency series, so the runner
//! aborts the whole run if it cannot be fetched.
//!
//! API: `https://api.finmindtrade.com/api/v4/data`
//! Payload: `{ "data": [ { "date", "cash_sell", "cash_buy", ... } ] }`
//! Missing quotes are reported as the literal value `-1` in either leg —
//! an in-band sentinel, not an absent row. The mid price of a sentinel
//! row is emitted as `-1` and tagged so the imputer forward-fills it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{fetch_err, send_with_retry, RetryPolicy, SeriesProvider};
use crate::types::{PipelineError, RawPoint, RawSeries};

const BASE_URL: &str = "https://api.finmindtrade.com/api/v4/data";
const PROVIDER_NAME: &str = "finmind";

/// FinMind's in-band "missing quote" marker.
pub const SENTINEL: f64 = -1.0;

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FinMindResponse {
    #[serde(default)]
    data: Vec<FinMindRow>,
}

/// One daily quote row. We only deserialize the fields we need.
#[derive(Debug, Deserialize)]
struct FinMindRow {
    date: String,
    cash_sell: f64,
    cash_buy: f64,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

pub struct FinMindProvider {
    http: Client,
    dataset: String,
    retry: RetryPolicy,
}

impl FinMindProvider {
    pub fn new(dataset: String, retry: RetryPolicy) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .user_agent("macrofin/0.1.0")
            .build()
            .context("Failed to build FinMind HTTP client")?;
        Ok(Self {
            http,
            dataset,
            retry,
        })
    }

    /// Cash mid price for one row, or the sentinel if either leg is missing.
    fn mid(row: &FinMindRow) -> f64 {
        if row.cash_sell == SENTINEL || row.cash_buy == SENTINEL {
            SENTINEL
        } else {
            (row.cash_sell + row.cash_buy) / 2.0
        }
    }

    fn parse_rows(code: &str, rows: Vec<FinMindRow>) -> Result<Vec<RawPoint>, PipelineError> {
        let mut points = Vec::with_capacity(rows.len());
        for row in rows {
            let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d").map_err(|e| {
                fetch_err(
                    PROVIDER_NAME,
                    code,
                    format!("malformed date {:?}: {e}", row.date),
                )
            })?;
            points.push(RawPoint {
                date,
                value: Self::mid(&row),
            });
        }
        Ok(points)
    }
}

#[async_trait]
impl SeriesProvider for FinMindProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    /// `code` is the FinMind `data_id`, e.g. "EUR".
    async fn fetch(
        &self,
        code: &str,
        start_date: NaiveDate,
    ) -> Result<RawSeries, PipelineError> {
        let start = start_date.format("%Y-%m-%d").to_string();
        let request = self.http.get(BASE_URL).query(&[
            ("dataset", self.dataset.as_str()),
            ("data_id", code),
            ("start_date", start.as_str()),
        ]);

        let resp = send_with_retry(self.retry, request, PROVIDER_NAME, code).await?;

        let data: FinMindResponse = resp.json().await.map_err(|e| {
            fetch_err(PROVIDER_NAME, code, format!("malformed payload: {e}"))
        })?;

        if data.data.is_empty() {
            return Err(fetch_err(PROVIDER_NAME, code, "empty result"));
        }

        let points = Self::parse_rows(code, data.data)?;
        debug!(code, points = points.len(), "FinMind series fetched");

        Ok(RawSeries::new(PROVIDER_NAME, code, points, Some(SENTINEL)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, sell: f64, buy: f64) -> FinMindRow {
        FinMindRow {
            date: date.to_string(),
            cash_sell: sell,
            cash_buy: buy,
        }
    }

    #[test]
    fn test_mid_price() {
        assert_eq!(FinMindProvider::mid(&row("2024-01-01", 35.2, 34.8)), 35.0);
    }

    #[test]
    fn test_missing_leg_propagates_sentinel() {
        assert_eq!(FinMindProvider::mid(&row("2024-01-01", -1.0, 34.8)), SENTINEL);
        assert_eq!(FinMindProvider::mid(&row("2024-01-01", 35.2, -1.0)), SENTINEL);
        assert_eq!(FinMindProvider::mid(&row("2024-01-01", -1.0, -1.0)), SENTINEL);
    }

    #[test]
    fn test_parse_rows() {
        let points = FinMindProvider::parse_rows(
            "EUR",
            vec![row("2024-01-01", 35.2, 34.8), row("2024-01-02", -1.0, -1.0)],
        )
        .unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, 35.0);
        assert_eq!(points[1].value, SENTINEL);
    }

    #[test]
    fn test_payload_deserialization_ignores_extra_fields() {
        let json = r#"{
            "msg": "success",
            "status": 200,
            "data": [
                {"date": "2024-01-01", "currency": "EUR",
                 "cash_sell": 35.2, "cash_buy": 34.8,
                 "spot_sell": 35.0, "spot_buy": 34.9}
            ]
        }"#;
        let parsed: FinMindResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data[0].cash_sell, 35.2);
    }

    #[test]
    fn test_malformed_date_is_fetch_error() {
        let err =
            FinMindProvider::parse_rows("EUR", vec![row("Jan 1 2024", 35.2, 34.8)]).unwrap_err();
        assert!(matches!(err, PipelineError::Fetch { .. }));
        assert!(err.to_string().contains("EUR"));
    }
}
