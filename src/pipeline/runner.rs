//! Run orchestration: plan, fetch, clean, derive, merge.
//!
//! A run resolves every (entity, indicator) pair to a provider code up
//! front, so configuration mistakes abort before any network call. The
//! baseline FX series is fetched first and its failure aborts the run;
//! every other series degrades to a logged gap in its column.

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::TickerConfig;
use crate::pipeline::derive::{self, DerivedSeries};
use crate::pipeline::{clean, LongTable, WideTable};
use crate::providers::SeriesProvider;
use crate::resolver::CodeResolver;
use crate::types::{CleanSeries, Entity, Frequency, Indicator, PipelineError};

// Derived and cross-region column headers on the rates sheet.
pub const FX_DIFF_COLUMN: &str = "EURTWD Diff (%)";
pub const US_YIELD_COLUMN: &str = "US10YY";
pub const EU_YIELD_COLUMN: &str = "EU10YY";
pub const YIELD_SPREAD_COLUMN: &str = "10YY Spread";
/// Derived year-over-year GDP growth on the macro sheet.
pub const GDP_YOY_COLUMN: &str = "GDP YoY (%)";

// ---------------------------------------------------------------------------
// Settings and report
// ---------------------------------------------------------------------------

/// Run-level knobs, read from `[pipeline]` and `[providers.yahoo]` config.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub start_date: NaiveDate,
    pub concurrency: usize,
    /// FinMind currency pair id for the baseline FX series.
    pub fx_code: String,
    /// Optional extra daily-close columns on the rates sheet.
    pub tickers: Vec<TickerConfig>,
}

/// A series that failed to fetch and was left as a gap.
#[derive(Debug, Clone)]
pub struct SkippedSeries {
    pub column: String,
    pub entity: Option<String>,
    pub code: String,
    pub reason: String,
}

/// What a run actually did, for the closing log line.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub fetched: usize,
    pub skipped: Vec<SkippedSeries>,
}

/// The merged tables plus the run report.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub rates: WideTable,
    pub macro_table: LongTable,
    pub report: RunReport,
}

// ---------------------------------------------------------------------------
// Fetch plan
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq)]
enum Sink {
    Rates,
    Macro,
}

struct FetchJob {
    provider: Arc<dyn SeriesProvider>,
    code: String,
    entity: Option<String>,
    column: String,
    sink: Sink,
    /// Derived percentage-change column appended after cleaning.
    pct_change: Option<(Frequency, &'static str)>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// One configured collection run over a resolved entity scope.
pub struct Pipeline {
    fred: Arc<dyn SeriesProvider>,
    finmind: Arc<dyn SeriesProvider>,
    yahoo: Arc<dyn SeriesProvider>,
    resolver: CodeResolver,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        fred: Arc<dyn SeriesProvider>,
        finmind: Arc<dyn SeriesProvider>,
        yahoo: Arc<dyn SeriesProvider>,
        resolver: CodeResolver,
        settings: PipelineSettings,
    ) -> Self {
        Pipeline {
            fred,
            finmind,
            yahoo,
            resolver,
            settings,
        }
    }

    /// Execute a full collection run.
    ///
    /// The baseline FX fetch happens first and alone; its failure aborts
    /// the run since the rates sheet is meaningless without it. Everything
    /// else runs through a bounded-concurrency stream, and individual
    /// failures become gaps recorded in the report.
    pub async fn run(&self) -> Result<RunOutput, PipelineError> {
        let jobs = self.plan()?;
        info!(
            entities = self.resolver.scope().len(),
            series = jobs.len() + 1,
            start_date = %self.settings.start_date,
            "Starting collection run"
        );

        let mut rates = WideTable::new(self.rates_columns());
        let mut macro_table = LongTable::new(Self::macro_columns());
        let mut report = RunReport::default();

        // Baseline FX first. Everything on the rates sheet is read against
        // this series, so there is no degraded mode without it.
        let fx_raw = self
            .finmind
            .fetch(&self.settings.fx_code, self.settings.start_date)
            .await?;
        let fx = clean(&fx_raw, None, Indicator::ExchangeRate.column());
        let fx = derive::with_pct_change(fx, Frequency::Daily, FX_DIFF_COLUMN);
        rates.insert(&fx.base)?;
        rates.insert(&fx.derived)?;
        report.fetched += 1;

        let start = self.settings.start_date;
        let results: Vec<(FetchJob, Result<_, PipelineError>)> =
            stream::iter(jobs.into_iter().map(|job| async move {
                let fetched = job.provider.fetch(&job.code, start).await;
                (job, fetched)
            }))
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;

        // Held back until both legs have arrived.
        let mut us_yield: Option<CleanSeries> = None;
        let mut eu_yield: Option<CleanSeries> = None;

        for (job, result) in results {
            let raw = match result {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(
                        column = %job.column,
                        entity = job.entity.as_deref().unwrap_or("-"),
                        code = %job.code,
                        error = %e,
                        "Series skipped, leaving gap"
                    );
                    report.skipped.push(SkippedSeries {
                        column: job.column,
                        entity: job.entity,
                        code: job.code,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let cleaned = clean(&raw, job.entity.as_deref(), &job.column);
            report.fetched += 1;

            let series = match job.pct_change {
                Some((frequency, derived_column)) => {
                    let DerivedSeries { base, derived } =
                        derive::with_pct_change(cleaned, frequency, derived_column);
                    match job.sink {
                        Sink::Rates => {
                            rates.insert(&base)?;
                            rates.insert(&derived)?;
                        }
                        Sink::Macro => {
                            macro_table.insert(&base)?;
                            macro_table.insert(&derived)?;
                        }
                    }
                    base
                }
                None => {
                    match job.sink {
                        Sink::Rates => rates.insert(&cleaned)?,
                        Sink::Macro => macro_table.insert(&cleaned)?,
                    }
                    cleaned
                }
            };

            match series.column.as_str() {
                US_YIELD_COLUMN => us_yield = Some(series),
                EU_YIELD_COLUMN => eu_yield = Some(series),
                _ => {}
            }
        }

        // Yield spread only exists where both legs fetched.
        if let (Some(us), Some(eu)) = (&us_yield, &eu_yield) {
            rates.insert(&derive::spread(us, eu, YIELD_SPREAD_COLUMN))?;
        } else {
            debug!("Yield spread not computed, one or both legs missing");
        }

        info!(
            fetched = report.fetched,
            skipped = report.skipped.len(),
            rates_rows = rates.len(),
            macro_rows = macro_table.len(),
            "Collection run complete"
        );

        Ok(RunOutput {
            rates,
            macro_table,
            report,
        })
    }

    /// Resolve every series the run will fetch (baseline FX excluded).
    ///
    /// Regions only carry the indicators the resolver knows series ids
    /// for; the rest are dropped here, before any request is made.
    fn plan(&self) -> Result<Vec<FetchJob>, PipelineError> {
        let mut jobs = Vec::new();

        // Rates sheet: MRO rate and the two 10-year yield legs.
        let eurozone = Entity::region("Eurozone", "EZ");
        let united_states = Entity::region("United States", "US");

        jobs.push(FetchJob {
            provider: Arc::clone(&self.fred),
            code: self.resolver.resolve(&eurozone, Indicator::PolicyRate)?,
            entity: None,
            column: Indicator::PolicyRate.column().to_string(),
            sink: Sink::Rates,
            pct_change: None,
        });
        jobs.push(FetchJob {
            provider: Arc::clone(&self.fred),
            code: self
                .resolver
                .resolve(&united_states, Indicator::BondYield10Y)?,
            entity: None,
            column: US_YIELD_COLUMN.to_string(),
            sink: Sink::Rates,
            pct_change: None,
        });
        jobs.push(FetchJob {
            provider: Arc::clone(&self.fred),
            code: self.resolver.resolve(&eurozone, Indicator::BondYield10Y)?,
            entity: None,
            column: EU_YIELD_COLUMN.to_string(),
            sink: Sink::Rates,
            pct_change: None,
        });

        for ticker in &self.settings.tickers {
            jobs.push(FetchJob {
                provider: Arc::clone(&self.yahoo),
                code: ticker.symbol.clone(),
                entity: None,
                column: ticker.column.clone(),
                sink: Sink::Rates,
                pct_change: None,
            });
        }

        // Macro sheet: every in-scope entity crossed with every macro
        // indicator it supports.
        for entity in self.resolver.scope().entities() {
            for &indicator in Indicator::MACRO {
                let code = match self.resolver.resolve(entity, indicator) {
                    Ok(code) => code,
                    Err(PipelineError::UnsupportedIndicatorForEntity { .. })
                        if entity.is_region =>
                    {
                        debug!(
                            entity = %entity.name,
                            indicator = %indicator,
                            "Indicator not tracked for region, skipping"
                        );
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                jobs.push(FetchJob {
                    provider: Arc::clone(&self.fred),
                    code,
                    entity: Some(entity.name.clone()),
                    column: indicator.column().to_string(),
                    sink: Sink::Macro,
                    pct_change: (indicator == Indicator::Gdp)
                        .then_some((Frequency::Quarterly, GDP_YOY_COLUMN)),
                });
            }
        }

        Ok(jobs)
    }

    fn rates_columns(&self) -> Vec<String> {
        let mut columns = vec![
            Indicator::ExchangeRate.column().to_string(),
            FX_DIFF_COLUMN.to_string(),
            Indicator::PolicyRate.column().to_string(),
            US_YIELD_COLUMN.to_string(),
            EU_YIELD_COLUMN.to_string(),
            YIELD_SPREAD_COLUMN.to_string(),
        ];
        columns.extend(self.settings.tickers.iter().map(|t| t.column.clone()));
        columns
    }

    fn macro_columns() -> Vec<String> {
        vec![
            Indicator::Gdp.column().to_string(),
            GDP_YOY_COLUMN.to_string(),
            Indicator::Hicp.column().to_string(),
            Indicator::Unemployment.column().to_string(),
            Indicator::ConsumerConfidence.column().to_string(),
            Indicator::BusinessConfidence.column().to_string(),
        ]
    }
}
