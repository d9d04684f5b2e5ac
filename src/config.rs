//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API keys) are referenced by env-var name in the config and
//! resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub scope: ScopeConfig,
    pub providers: ProvidersConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Start date for all historical pulls (YYYY-MM-DD).
    pub start_date: String,
    /// Maximum in-flight provider fetches.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Attempts per fetch (transient failures only).
    #[serde(default = "default_retries")]
    pub max_attempts: u32,
    /// Base backoff between attempts, doubled per retry.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_concurrency() -> usize {
    4
}

fn default_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    500
}

/// Entity scope: all members of a named group, minus an exclusion list,
/// plus explicit additions handled separately (code-naming exceptions).
#[derive(Debug, Deserialize, Clone)]
pub struct ScopeConfig {
    /// Named membership group, e.g. "european-union".
    pub group: String,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub include: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProvidersConfig {
    pub fred: FredConfig,
    pub finmind: FinMindConfig,
    #[serde(default)]
    pub yahoo: YahooConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FredConfig {
    /// Env var holding the FRED API key (free registration).
    pub api_key_env: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FinMindConfig {
    /// FX dataset name on the FinMind API.
    pub dataset: String,
    /// Currency pair id, e.g. "EUR" for EUR/TWD.
    pub data_id: String,
}

/// Optional per-ticker daily close columns appended to the rates sheet.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct YahooConfig {
    /// Map of column name → ticker, e.g. "Gold" → "GC=F". Empty by default.
    #[serde(default)]
    pub tickers: Vec<TickerConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TickerConfig {
    pub column: String,
    pub symbol: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    /// Directory the workbook is written into.
    pub output_dir: String,
    /// Wide-by-date sheet name (FX, rates, yields).
    pub rates_sheet: String,
    /// Long-by-entity-and-date sheet name (macro indicators).
    pub macro_sheet: String,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
