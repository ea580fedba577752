//! TrendCast CLI: fetch, forecast, and configuration commands.
//!
//! Commands:
//! - `forecast`: fetch a ticker's history and forecast N years ahead
//! - `fetch`: fetch and print the normalized price table
//! - `tickers`: list the configured ticker allow-list
//! - `config`: print a preset (or the loaded config) as TOML

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use trendcast_core::domain::TickerSymbol;
use trendcast_runner::{
    export_summary_json, render_forecast_tail, render_series_table, save_artifacts, Pipeline,
    PipelineConfig, PipelineOutcome, ProviderKind, RunSummary, NO_DATA_PLOT,
};

#[derive(Parser)]
#[command(
    name = "trendcast",
    about = "TrendCast CLI: stock price history and trend forecasts"
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Named preset: classic, fixed-2017, fixed-2018, extended.
    #[arg(long, global = true)]
    preset: Option<String>,

    /// Use the synthetic random-walk provider (no network). Optional seed, default 42.
    #[arg(long, global = true, num_args = 0..=1, require_equals = true, default_missing_value = "42")]
    synthetic: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch history and forecast the closing price.
    Forecast {
        /// Ticker symbol (e.g., AAPL, ZOMATO.NS).
        #[arg(long)]
        ticker: String,

        /// Years to forecast. Defaults to the configured slider default.
        #[arg(long)]
        years: Option<f64>,

        /// Treat this date (YYYY-MM-DD) as today. Defaults to the local date.
        #[arg(long)]
        today: Option<String>,

        /// Number of forecast rows to print.
        #[arg(long, default_value_t = 5)]
        rows: usize,

        /// Print the run summary as JSON instead of tables.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Write series.csv, forecast.csv and summary.json under this directory.
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },
    /// Fetch and print the normalized price table.
    Fetch {
        /// Ticker symbol.
        #[arg(long)]
        ticker: String,

        /// Start date (YYYY-MM-DD). Defaults to the start-date policy floor.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,
    },
    /// List the ticker allow-list.
    Tickers,
    /// Print the effective configuration as TOML.
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config, cli.preset.as_deref(), cli.synthetic)?;

    match cli.command {
        Commands::Forecast {
            ticker,
            years,
            today,
            rows,
            json,
            export_dir,
        } => run_forecast(config, &ticker, years, today, rows, json, export_dir),
        Commands::Fetch { ticker, start, end } => run_fetch(config, &ticker, start, end),
        Commands::Tickers => {
            for t in &config.tickers {
                println!("{t}");
            }
            let h = &config.horizon;
            eprintln!(
                "horizon: {} to {} years, step {}, default {}",
                h.min_years, h.max_years, h.step_years, h.default_years
            );
            Ok(())
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn load_config(
    path: Option<PathBuf>,
    preset: Option<&str>,
    synthetic: Option<u64>,
) -> Result<PipelineConfig> {
    if path.is_some() && preset.is_some() {
        bail!("--config and --preset are mutually exclusive");
    }
    let mut config = match (path, preset) {
        (Some(path), _) => PipelineConfig::from_file(&path)?,
        (None, Some(name)) => PipelineConfig::preset(name)?,
        (None, None) => PipelineConfig::default(),
    };
    if let Some(seed) = synthetic {
        config.provider = ProviderKind::Synthetic { seed };
    }
    config.validate()?;
    Ok(config)
}

fn parse_date(raw: Option<&str>, flag: &str) -> Result<Option<NaiveDate>> {
    raw.map(|s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("--{flag} must be YYYY-MM-DD, got '{s}'"))
    })
    .transpose()
}

fn parse_ticker(raw: &str, config: &PipelineConfig) -> Result<TickerSymbol> {
    let ticker = TickerSymbol::new(raw)?;
    if !config.allows(&ticker) {
        warn!(ticker = %ticker, "ticker is not in the configured allow-list");
    }
    Ok(ticker)
}

fn run_forecast(
    config: PipelineConfig,
    ticker: &str,
    years: Option<f64>,
    today: Option<String>,
    rows: usize,
    json: bool,
    export_dir: Option<PathBuf>,
) -> Result<()> {
    let ticker = parse_ticker(ticker, &config)?;
    let horizon = match years {
        Some(y) => config.horizon.horizon(y)?,
        None => config.horizon.default_horizon()?,
    };
    let today = parse_date(today.as_deref(), "today")?.unwrap_or_else(|| Local::now().date_naive());
    let schema = config.column_schema;
    let display = config.display;

    let mut pipeline = Pipeline::new(config)?;
    let outcome = pipeline.run(&ticker, horizon, today);

    if json {
        let summary = RunSummary::from_outcome(&ticker, horizon, &outcome);
        println!("{}", export_summary_json(&summary)?);
    } else {
        eprintln!("{}", outcome.load_status());
        println!("Raw data: {ticker}");
        print!(
            "{}",
            render_series_table(outcome.series().map(|s| s.as_ref()), schema, display)
        );
        println!();
        print_forecast(&outcome, horizon.years(), rows);
    }

    if let Some(dir) = export_dir {
        if outcome.series().is_some() {
            let out = save_artifacts(&ticker, horizon, &outcome, schema, &dir)?;
            eprintln!("Artifacts saved to: {}", out.display());
        }
    }

    if outcome.is_no_data() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_forecast(outcome: &PipelineOutcome, years: f64, rows: usize) {
    match outcome.forecast() {
        Some(result) => {
            println!("Forecast: {years} year(s), {} day(s)", result.horizon_days());
            print!("{}", render_forecast_tail(result, rows));
            if let Some(last) = result.points().last() {
                println!(
                    "\n{}: {:.2} (interval {:.2} .. {:.2})",
                    last.date, last.predicted, last.lower, last.upper
                );
            }
        }
        None => {
            if outcome.is_no_data() {
                println!("{NO_DATA_PLOT}");
            }
            if let Some(msg) = outcome.forecast_message() {
                println!("{msg}");
            }
        }
    }
}

fn run_fetch(
    config: PipelineConfig,
    ticker: &str,
    start: Option<String>,
    end: Option<String>,
) -> Result<()> {
    let ticker = parse_ticker(ticker, &config)?;
    let now = Local::now().naive_local();
    let start = parse_date(start.as_deref(), "start")?.unwrap_or(config.start_date_policy.floor());
    let end = parse_date(end.as_deref(), "end")?.unwrap_or(now.date());
    let schema = config.column_schema;
    let display = config.display;

    let mut pipeline = Pipeline::new(config)?;
    match pipeline.fetch(&ticker, start, end, now) {
        Ok(series) => {
            println!(
                "{ticker}: {} rows from {} ({})",
                series.len(),
                pipeline.provider_name(),
                series.source().label()
            );
            print!("{}", render_series_table(Some(series.as_ref()), schema, display));
            Ok(())
        }
        Err(e) => {
            eprintln!("Error for {ticker}: {e}");
            std::process::exit(1);
        }
    }
}
