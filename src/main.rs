//! MACROFIN — European macro and FX data pipeline
//!
//! Entry point. Loads configuration, initialises structured logging,
//! builds the entity scope and provider clients, runs one collection
//! run, and writes the workbook.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use macrofin::config;
use macrofin::export::{long_sheet, wide_sheet, Workbook};
use macrofin::pipeline::runner::{Pipeline, PipelineSettings};
use macrofin::providers::finmind::FinMindProvider;
use macrofin::providers::fred::FredProvider;
use macrofin::providers::yahoo::YahooProvider;
use macrofin::providers::RetryPolicy;
use macrofin::resolver::{CodeResolver, EntityScope};

const BANNER: &str = r#"
 __  __    _    ____ ____   ___  _____ ___ _   _
|  \/  |  / \  / ___|  _ \ / _ \|  ___|_ _| \ | |
| |\/| | / _ \| |   | |_) | | | | |_   | ||  \| |
| |  | |/ ___ \ |___|  _ <| |_| |  _|  | || |\  |
|_|  |_/_/   \_\____|_| \_\\___/|_|   |___|_| \_|

  European Macro and FX Data Pipeline
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let cfg = config::AppConfig::load(&config_path)?;

    init_logging();

    println!("{BANNER}");
    info!(
        config = %config_path,
        group = %cfg.scope.group,
        start_date = %cfg.pipeline.start_date,
        "MACROFIN starting up"
    );

    // -- Build scope and resolver ------------------------------------------

    let scope = EntityScope::build(&cfg.scope.group, &cfg.scope.exclude, &cfg.scope.include)?;
    info!(entities = scope.len(), "Entity scope resolved");
    let resolver = CodeResolver::new(scope);

    // -- Provider clients --------------------------------------------------

    let retry = RetryPolicy::new(
        cfg.pipeline.max_attempts,
        Duration::from_millis(cfg.pipeline.backoff_ms),
    );

    let fred_key = config::AppConfig::resolve_env(&cfg.providers.fred.api_key_env)?;
    let fred = Arc::new(FredProvider::new(fred_key, retry)?);
    let finmind = Arc::new(FinMindProvider::new(cfg.providers.finmind.dataset.clone(), retry)?);
    let yahoo = Arc::new(YahooProvider::new(retry)?);

    let start_date: NaiveDate = cfg
        .pipeline
        .start_date
        .parse()
        .with_context(|| format!("Invalid start_date: {}", cfg.pipeline.start_date))?;

    // -- Run the pipeline --------------------------------------------------

    let pipeline = Pipeline::new(
        fred,
        finmind,
        yahoo,
        resolver,
        PipelineSettings {
            start_date,
            concurrency: cfg.pipeline.concurrency,
            fx_code: cfg.providers.finmind.data_id.clone(),
            tickers: cfg.providers.yahoo.tickers.clone(),
        },
    );

    let output = pipeline.run().await?;
    for skipped in &output.report.skipped {
        warn!(
            column = %skipped.column,
            entity = skipped.entity.as_deref().unwrap_or("-"),
            code = %skipped.code,
            reason = %skipped.reason,
            "Series missing from this run"
        );
    }

    // -- Write the workbook ------------------------------------------------

    let mut workbook = Workbook::new();
    workbook.add_sheet(wide_sheet(&cfg.export.rates_sheet, &output.rates));
    workbook.add_sheet(long_sheet(&cfg.export.macro_sheet, &output.macro_table));

    let paths = workbook.write_to(Path::new(&cfg.export.output_dir))?;
    for path in &paths {
        info!(path = %path.display(), "Sheet written");
    }

    info!(
        fetched = output.report.fetched,
        skipped = output.report.skipped.len(),
        sheets = paths.len(),
        "MACROFIN finished cleanly."
    );

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("macrofin=info"));

    let json_logging = std::env::var("MACROFIN_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
