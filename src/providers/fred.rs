//! FRED (Federal Reserve Economic Data) series provider.
//!
//! Serves every macro indicator plus the ECB policy rate and sovereign
//! yields — FRED mirrors the Eurostat and OECD series this pipeline needs
//! under one identifier scheme.
//!
//! API: `https://api.stlouisfed.org/fred/series/observations`
//! Auth: API key via `api_key` query param. Free registration.
//! Rate limit: 120 req/min.
//!
//! Missing observations come back as the literal string `"."`. Those are
//! structurally absent dates, not sentinel values — they are dropped at
//! parse time and never reach the imputer.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{fetch_err, send_with_retry, RetryPolicy, SeriesProvider};
use crate::types::{PipelineError, RawPoint, RawSeries};

const BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";
const PROVIDER_NAME: &str = "fred";

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FredResponse {
    #[serde(default)]
    observations: Vec<FredObservation>,
}

#[derive(Debug, Deserialize)]
struct FredObservation {
    date: String,
    /// Numeric string, or `"."` for a missing observation.
    value: String,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

pub struct FredProvider {
    http: Client,
    api_key: String,
    retry: RetryPolicy,
}

impl FredProvider {
    pub fn new(api_key: String, retry: RetryPolicy) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .user_agent("macrofin/0.1.0")
            .build()
            .context("Failed to build FRED HTTP client")?;
        Ok(Self {
            http,
            api_key,
            retry,
        })
    }

    /// Convert raw observations to points, dropping `"."` entries.
    fn parse_observations(
        code: &str,
        observations: Vec<FredObservation>,
    ) -> Result<Vec<RawPoint>, PipelineError> {
        let mut points = Vec::with_capacity(observations.len());
        for obs in observations {
            if obs.value == "." {
                continue;
            }
            let date = NaiveDate::parse_from_str(&obs.date, "%Y-%m-%d").map_err(|e| {
                fetch_err(
                    PROVIDER_NAME,
                    code,
                    format!("malformed date {:?}: {e}", obs.date),
                )
            })?;
            let value: f64 = obs.value.parse().map_err(|_| {
                fetch_err(
                    PROVIDER_NAME,
                    code,
                    format!("malformed value {:?} at {date}", obs.value),
                )
            })?;
            points.push(RawPoint { date, value });
        }
        Ok(points)
    }
}

#[async_trait]
impl SeriesProvider for FredProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn fetch(
        &self,
        code: &str,
        start_date: NaiveDate,
    ) -> Result<RawSeries, PipelineError> {
        let start = start_date.format("%Y-%m-%d").to_string();
        let request = self.http.get(BASE_URL).query(&[
            ("series_id", code),
            ("api_key", self.api_key.as_str()),
            ("file_type", "json"),
            ("observation_start", start.as_str()),
            ("sort_order", "asc"),
        ]);

        let resp = send_with_retry(self.retry, request, PROVIDER_NAME, code).await?;

        let data: FredResponse = resp.json().await.map_err(|e| {
            fetch_err(PROVIDER_NAME, code, format!("malformed payload: {e}"))
        })?;

        if data.observations.is_empty() {
            return Err(fetch_err(PROVIDER_NAME, code, "empty result"));
        }

        let points = Self::parse_observations(code, data.observations)?;
        debug!(code, points = points.len(), "FRED series fetched");

        // FRED has no in-band sentinel; "." rows were dropped above.
        Ok(RawSeries::new(PROVIDER_NAME, code, points, None))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
