//! Series providers.
//!
//! Defines the `SeriesProvider` trait and provides implementations for:
//! - FRED — macro indicators and rates (API key required)
//! - FinMind — EUR/TWD cash exchange quotes (baseline currency series)
//! - Yahoo chart — per-ticker daily closing prices (optional columns)

pub mod finmind;
pub mod fred;
pub mod yahoo;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;
use tracing::{debug, warn};

use crate::types::{PipelineError, RawSeries};

/// Abstraction over external time-series sources.
///
/// One call fetches one raw series for one resolved code from the given
/// start date. Implementations tag the result with their sentinel
/// convention so the imputer knows what "missing" looks like.
#[async_trait]
pub trait SeriesProvider: Send + Sync {
    /// Provider name for logging and error attribution.
    fn name(&self) -> &str;

    /// Fetch the raw series for a resolved code.
    async fn fetch(&self, code: &str, start_date: NaiveDate)
        -> Result<RawSeries, PipelineError>;
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

/// Retry policy for transient network failures.
///
/// 4xx responses are never retried — they mean the request itself is
/// wrong (bad code, bad key) and will not heal with time.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Base delay, doubled on each subsequent attempt.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.backoff * 2u32.saturating_pow(attempt)
    }
}

/// Build a `Fetch` error with provider attribution.
pub(crate) fn fetch_err(provider: &str, code: &str, message: impl Into<String>) -> PipelineError {
    PipelineError::Fetch {
        provider: provider.to_string(),
        code: code.to_string(),
        message: message.into(),
    }
}

/// Send a request, retrying on transport errors and 5xx responses.
pub(crate) async fn send_with_retry(
    policy: RetryPolicy,
    request: reqwest::RequestBuilder,
    provider: &str,
    code: &str,
) -> Result<reqwest::Response, PipelineError> {
    let mut last_error = String::new();

    for attempt in 0..policy.max_attempts {
        let req = match request.try_clone() {
            Some(r) => r,
            // Non-cloneable request bodies get a single attempt.
            None => {
                return request.send().await.map_err(|e| {
                    fetch_err(provider, code, format!("request failed: {e}"))
                })
            }
        };

        match req.send().await {
            Ok(resp) if resp.status().is_success() => return Ok(resp),
            Ok(resp) if resp.status().is_client_error() => {
                return Err(fetch_err(
                    provider,
                    code,
                    format!("non-retryable response: {}", resp.status()),
                ));
            }
            Ok(resp) => {
                last_error = format!("server error: {}", resp.status());
            }
            Err(e) => {
                last_error = format!("transport error: {e}");
            }
        }

        if attempt + 1 < policy.max_attempts {
            let delay = policy.delay(attempt);
            debug!(
                provider,
                code,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %last_error,
                "Retrying fetch"
            );
            tokio::time::sleep(delay).await;
        }
    }

    warn!(provider, code, error = %last_error, "Fetch exhausted retries");
    Err(fetch_err(
        provider,
        code,
        format!("{last_error} after {} attempts", policy.max_attempts),
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
