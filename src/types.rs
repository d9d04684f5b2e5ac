//! Shared types for the macrofin pipeline.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that resolver, provider,
//! and pipeline modules can depend on them without circular references.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Frequency
// ---------------------------------------------------------------------------

/// Native update cadence of an indicator's series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    Daily,
    Monthly,
    Quarterly,
}

impl Frequency {
    /// Number of observations in one year-over-year comparison window.
    ///
    /// Daily series use a simple day-over-day change (lag 1) rather than
    /// a 365-observation lag — trading calendars make a literal one-year
    /// daily offset meaningless.
    pub fn lag(&self) -> usize {
        match self {
            Frequency::Daily => 1,
            Frequency::Monthly => 12,
            Frequency::Quarterly => 4,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Monthly => write!(f, "monthly"),
            Frequency::Quarterly => write!(f, "quarterly"),
        }
    }
}

// ---------------------------------------------------------------------------
// Indicator
// ---------------------------------------------------------------------------

/// A named economic or financial measure tracked by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Indicator {
    /// Quarterly gross domestic product, current prices.
    Gdp,
    /// Harmonised index of consumer prices, year-over-year growth.
    Hicp,
    /// Harmonised monthly unemployment rate.
    Unemployment,
    /// OECD consumer confidence index.
    ConsumerConfidence,
    /// OECD business confidence index.
    BusinessConfidence,
    /// Daily FX quote (EUR/TWD cash mid).
    ExchangeRate,
    /// ECB main refinancing operations rate.
    PolicyRate,
    /// 10-year sovereign bond yield.
    BondYield10Y,
}

impl Indicator {
    /// The macro indicators fetched per country for the long sheet.
    pub const MACRO: &'static [Indicator] = &[
        Indicator::Gdp,
        Indicator::Hicp,
        Indicator::Unemployment,
        Indicator::ConsumerConfidence,
        Indicator::BusinessConfidence,
    ];

    /// Expected native frequency of the provider series.
    pub fn frequency(&self) -> Frequency {
        match self {
            Indicator::Gdp => Frequency::Quarterly,
            Indicator::Hicp
            | Indicator::Unemployment
            | Indicator::ConsumerConfidence
            | Indicator::BusinessConfidence => Frequency::Monthly,
            Indicator::ExchangeRate | Indicator::PolicyRate | Indicator::BondYield10Y => {
                Frequency::Daily
            }
        }
    }

    /// Stable output column name for this indicator.
    ///
    /// Downstream consumers key off these headers — do not rename.
    pub fn column(&self) -> &'static str {
        match self {
            Indicator::Gdp => "GDP",
            Indicator::Hicp => "HICP",
            Indicator::Unemployment => "Unemployment",
            Indicator::ConsumerConfidence => "Consumer Confidence",
            Indicator::BusinessConfidence => "Business Confidence",
            Indicator::ExchangeRate => "EURTWD",
            Indicator::PolicyRate => "EZ MRO Rate",
            Indicator::BondYield10Y => "10YY",
        }
    }

}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A country or aggregate region tracked by the pipeline.
///
/// The canonical display name is the only cross-run identity. The base
/// code is the alpha-2 code used by default when building provider series
/// ids; indicator-scoped overrides in the resolver may replace it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub base_code: String,
    /// Aggregate pseudo-entities (e.g. "Eurozone") support only a subset
    /// of indicators.
    pub is_region: bool,
}

impl Entity {
    pub fn country(name: &str, base_code: &str) -> Self {
        Entity {
            name: name.to_string(),
            base_code: base_code.to_string(),
            is_region: false,
        }
    }

    pub fn region(name: &str, base_code: &str) -> Self {
        Entity {
            name: name.to_string(),
            base_code: base_code.to_string(),
            is_region: true,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.base_code)
    }
}

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

/// One dated observation as returned by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// An ordered series as returned by one provider, before cleaning.
///
/// `sentinel` is the provider's in-band "missing" marker (FinMind uses
/// `-1`). Structurally absent dates (FRED's `"."` observations) are not
/// present in `points` at all — the two kinds of missingness are distinct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSeries {
    pub provider: String,
    pub code: String,
    pub points: Vec<RawPoint>,
    pub sentinel: Option<f64>,
}

impl RawSeries {
    pub fn new(provider: &str, code: &str, points: Vec<RawPoint>, sentinel: Option<f64>) -> Self {
        RawSeries {
            provider: provider.to_string(),
            code: code.to_string(),
            points,
            sentinel,
        }
    }
}

/// A cleaned series: strictly increasing dates, sentinels forward-filled,
/// tagged with the entity (if any) and the output column it feeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanSeries {
    /// Canonical entity name for long-form series; `None` for wide-form
    /// single-entity series (FX, rates, yields).
    pub entity: Option<String>,
    /// Output column this series populates.
    pub column: String,
    pub points: Vec<(NaiveDate, f64)>,
}

impl CleanSeries {
    pub fn new(entity: Option<&str>, column: &str, points: Vec<(NaiveDate, f64)>) -> Self {
        CleanSeries {
            entity: entity.map(String::from),
            column: column.to_string(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|(d, _)| *d)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|(d, _)| *d)
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error taxonomy for the pipeline.
///
/// Configuration errors (`UnknownEntity`, `UnsupportedIndicatorForEntity`,
/// `Config`) are fatal and surface before any network call. `Fetch` is
/// per-call and recoverable for optional series. `MergeConflict` is a data
/// error: two inputs wrote differing non-null values to one cell.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Unknown entity: {0:?} is not in the configured scope")]
    UnknownEntity(String),

    #[error("Indicator {indicator} is not supported for entity {entity}")]
    UnsupportedIndicatorForEntity {
        entity: String,
        indicator: Indicator,
    },

    #[error("Fetch failed ({provider}, series {code}): {message}")]
    Fetch {
        provider: String,
        code: String,
        message: String,
    },

    #[error(
        "Merge conflict in column {column:?} at {key}: existing {existing} vs incoming {incoming}"
    )]
    MergeConflict {
        column: String,
        key: String,
        existing: f64,
        incoming: f64,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Whether this error should abort the run before any network I/O.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            PipelineError::UnknownEntity(_)
                | PipelineError::UnsupportedIndicatorForEntity { .. }
                | PipelineError::Config(_)
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
