//! Export of pipeline outcomes: CSV and Parquet tables, a JSON summary, and a plain-text report.
//!
//! - **CSV**: the fetched price series (headers per `ColumnSchema`) and the
//!   full forecast table (`ds, yhat, yhat_lower, yhat_upper, trend, ...`)
//! - **Parquet**: the same two tables plus the `ds`/`y` model input, written
//!   from the domain types' dataframe views
//! - **JSON**: a `RunSummary` for scripting
//! - **Text**: the head/tail tables the CLI prints

use std::fmt::Write as _;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use polars::prelude::{DataFrame, ParquetWriter};
use trendcast_core::domain::{ColumnSchema, Horizon, PriceRecord, PriceSeries, TickerSymbol};
use trendcast_core::forecast::{ForecastPoint, ForecastResult};

use crate::config::DisplayConfig;
use crate::pipeline::{PipelineOutcome, RunSummary, NO_DATA_TABLE};

// ─── CSV export ─────────────────────────────────────────────────────

/// Price series as CSV.
///
/// Columns: date, open, high, low, close, adj_close, volume (labelled per `schema`)
pub fn export_series_csv(series: &PriceSeries, schema: ColumnSchema) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(schema.headers())?;
    for r in series.records() {
        wtr.write_record(series_row(r))?;
    }
    finish(wtr)
}

/// Forecast table as CSV, one row per history or future date.
///
/// Columns: ds, yhat, yhat_lower, yhat_upper, trend, trend_lower, trend_upper,
/// then one column per seasonal component.
pub fn export_forecast_csv(result: &ForecastResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header: Vec<String> = [
        "ds",
        "yhat",
        "yhat_lower",
        "yhat_upper",
        "trend",
        "trend_lower",
        "trend_upper",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    header.extend(result.seasonalities().iter().cloned());
    wtr.write_record(&header)?;

    for p in result.points() {
        wtr.write_record(forecast_row(p))?;
    }
    finish(wtr)
}

fn series_row(r: &PriceRecord) -> Vec<String> {
    vec![
        r.date.to_string(),
        format!("{:.6}", r.open),
        format!("{:.6}", r.high),
        format!("{:.6}", r.low),
        format!("{:.6}", r.close),
        format!("{:.6}", r.adj_close),
        r.volume.to_string(),
    ]
}

fn forecast_row(p: &ForecastPoint) -> Vec<String> {
    let mut row = vec![
        p.date.to_string(),
        format!("{:.6}", p.predicted),
        format!("{:.6}", p.lower),
        format!("{:.6}", p.upper),
        format!("{:.6}", p.trend),
        format!("{:.6}", p.trend_lower),
        format!("{:.6}", p.trend_upper),
    ];
    row.extend(p.seasonal.iter().map(|v| format!("{v:.6}")));
    row
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

// ─── Parquet export ─────────────────────────────────────────────────

pub fn write_parquet(path: &Path, mut df: DataFrame) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("failed to create parquet {}", path.display()))?;
    ParquetWriter::new(&mut file)
        .finish(&mut df)
        .with_context(|| format!("failed to write parquet {}", path.display()))?;
    Ok(())
}

// ─── JSON summary ───────────────────────────────────────────────────

pub fn export_summary_json(summary: &RunSummary) -> Result<String> {
    serde_json::to_string_pretty(summary).context("failed to serialize RunSummary to JSON")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write `series.{csv,parquet}`, `input.parquet`, `forecast.{csv,parquet}`
/// (when present) and `summary.json` into `<output_dir>/<ticker>/`.
/// Returns the directory written.
///
/// A `NoData` outcome has nothing to export and is an error.
pub fn save_artifacts(
    ticker: &TickerSymbol,
    horizon: Horizon,
    outcome: &PipelineOutcome,
    schema: ColumnSchema,
    output_dir: &Path,
) -> Result<PathBuf> {
    let Some(series) = outcome.series() else {
        bail!("no data for {ticker}: nothing to export");
    };

    let dir = output_dir.join(ticker.as_str());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    write_file(&dir.join("series.csv"), &export_series_csv(series, schema)?)?;
    write_parquet(
        &dir.join("series.parquet"),
        series
            .to_dataframe(schema)
            .context("failed to build series dataframe")?,
    )?;
    write_parquet(
        &dir.join("input.parquet"),
        series
            .forecast_input()
            .to_dataframe()
            .context("failed to build model input dataframe")?,
    )?;
    if let Some(result) = outcome.forecast() {
        write_file(&dir.join("forecast.csv"), &export_forecast_csv(result)?)?;
        write_parquet(
            &dir.join("forecast.parquet"),
            result
                .to_dataframe()
                .context("failed to build forecast dataframe")?,
        )?;
    }
    let summary = RunSummary::from_outcome(ticker, horizon, outcome);
    write_file(&dir.join("summary.json"), &export_summary_json(&summary)?)?;

    Ok(dir)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

// ─── Text tables ────────────────────────────────────────────────────

/// Head and tail of the raw series, or the no-data message.
pub fn render_series_table(
    series: Option<&PriceSeries>,
    schema: ColumnSchema,
    display: DisplayConfig,
) -> String {
    let Some(series) = series.filter(|s| !s.is_empty()) else {
        return NO_DATA_TABLE.to_string();
    };
    let headers = schema.headers();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10}  {:>10}  {:>10}  {:>10}  {:>10}  {:>10}  {:>12}",
        headers[0], headers[1], headers[2], headers[3], headers[4], headers[5], headers[6]
    );
    let head = series.head(display.head_rows);
    let tail = series.tail(display.tail_rows);
    let overlap = display.head_rows + display.tail_rows >= series.len();
    let rows: Vec<&PriceRecord> = if overlap {
        series.records().iter().collect()
    } else {
        head.iter().chain(tail.iter()).collect()
    };
    for (i, r) in rows.iter().enumerate() {
        if !overlap && i == head.len() {
            let _ = writeln!(out, "{:^10}", "...");
        }
        let _ = writeln!(
            out,
            "{:<10}  {:>10.2}  {:>10.2}  {:>10.2}  {:>10.2}  {:>10.2}  {:>12}",
            r.date.to_string(),
            r.open,
            r.high,
            r.low,
            r.close,
            r.adj_close,
            r.volume
        );
    }
    out
}

/// Last `rows` forecast points.
pub fn render_forecast_tail(result: &ForecastResult, rows: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10}  {:>10}  {:>10}  {:>10}",
        "ds", "yhat", "yhat_lower", "yhat_upper"
    );
    for p in result.tail(rows) {
        let _ = writeln!(
            out,
            "{:<10}  {:>10.2}  {:>10.2}  {:>10.2}",
            p.date.to_string(),
            p.predicted,
            p.lower,
            p.upper
        );
    }
    out
}
