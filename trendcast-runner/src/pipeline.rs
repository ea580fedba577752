//! Fetch-then-forecast pipeline.
//!
//! `Pipeline::run` is the single entry point the CLI and TUI use: it pulls
//! the series through the session cache, then hands it to the forecast
//! adapter. Every stage checks the previous one; a failed or empty fetch
//! ends in `PipelineOutcome::NoData` and the model is never touched.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use trendcast_core::data::{
    CacheStats, CachedFetcher, CircuitBreaker, DataFetcher, DataProvider, FetchError,
    SyntheticProvider, YahooProvider,
};
use trendcast_core::domain::{DataSource, Horizon, PriceSeries, TickerSymbol};
use trendcast_core::forecast::{forecast, AdditiveModel, FitError, ForecastModel, ForecastResult};

use crate::config::{ConfigError, PipelineConfig, ProviderKind};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("provider setup failed: {0}")]
    Provider(#[from] FetchError),
}

/// Terminal state of one pipeline run.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// Data fetched and forecast produced.
    Ready {
        series: Arc<PriceSeries>,
        forecast: ForecastResult,
    },
    /// Nothing to show; the forecast stage was skipped.
    NoData {
        ticker: TickerSymbol,
        reason: FetchError,
    },
    /// Raw data is available but the model could not be fitted.
    ForecastFailed {
        series: Arc<PriceSeries>,
        error: FitError,
    },
}

pub const STATUS_LOADING: &str = "Loading data...";
pub const STATUS_LOADED: &str = "Loading data... done!";
pub const STATUS_LOAD_FAILED: &str = "Loading data... failed!";
pub const NO_DATA_TABLE: &str = "No data available to display.";
pub const NO_DATA_PLOT: &str = "No data available to plot.";
pub const NO_DATA_FORECAST: &str = "Forecasting cannot be performed due to missing data.";

impl PipelineOutcome {
    pub fn series(&self) -> Option<&Arc<PriceSeries>> {
        match self {
            PipelineOutcome::Ready { series, .. }
            | PipelineOutcome::ForecastFailed { series, .. } => Some(series),
            PipelineOutcome::NoData { .. } => None,
        }
    }

    pub fn forecast(&self) -> Option<&ForecastResult> {
        match self {
            PipelineOutcome::Ready { forecast, .. } => Some(forecast),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, PipelineOutcome::Ready { .. })
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, PipelineOutcome::NoData { .. })
    }

    /// Status line for the data-loading step.
    pub fn load_status(&self) -> &'static str {
        match self {
            PipelineOutcome::NoData { .. } => STATUS_LOAD_FAILED,
            _ => STATUS_LOADED,
        }
    }

    /// Message for the forecast section when there is no forecast to show.
    pub fn forecast_message(&self) -> Option<String> {
        match self {
            PipelineOutcome::Ready { .. } => None,
            PipelineOutcome::NoData { .. } => Some(NO_DATA_FORECAST.to_string()),
            PipelineOutcome::ForecastFailed { error, .. } => {
                Some(format!("Error during forecasting: {error}"))
            }
        }
    }
}

/// Build the provider named by `kind`.
pub fn build_provider(kind: ProviderKind) -> Result<Arc<dyn DataProvider>, FetchError> {
    Ok(match kind {
        ProviderKind::Yahoo => Arc::new(YahooProvider::new(Arc::new(
            CircuitBreaker::default_provider(),
        ))?),
        ProviderKind::Synthetic { seed } => Arc::new(SyntheticProvider::new(seed)),
    })
}

/// A session: configuration, a cached fetcher and a model.
pub struct Pipeline {
    config: PipelineConfig,
    fetcher: CachedFetcher,
    model: Box<dyn ForecastModel>,
}

impl Pipeline {
    /// Build from configuration alone: provider per `config.provider`,
    /// additive model per `config.forecast`.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let provider = build_provider(config.provider)?;
        let model = Box::new(AdditiveModel::new(config.forecast.clone()));
        Ok(Self::with_parts(config, provider, model))
    }

    pub fn with_parts(
        config: PipelineConfig,
        provider: Arc<dyn DataProvider>,
        model: Box<dyn ForecastModel>,
    ) -> Self {
        let fetcher = DataFetcher::new(provider, config.start_date_policy);
        Self {
            fetcher: CachedFetcher::new(fetcher, config.staleness),
            config,
            model,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.fetcher.fetcher().provider_name()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.fetcher.cache().stats()
    }

    pub fn cached_tickers(&self) -> usize {
        self.fetcher.cache().len()
    }

    pub fn invalidate(&mut self, ticker: &TickerSymbol) -> bool {
        self.fetcher.cache_mut().invalidate(ticker)
    }

    pub fn clear_cache(&mut self) {
        self.fetcher.cache_mut().clear();
    }

    /// Fetch (through the cache) over `[start, end]`.
    pub fn fetch(
        &mut self,
        ticker: &TickerSymbol,
        start: NaiveDate,
        end: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Arc<PriceSeries>, FetchError> {
        self.fetcher.get_or_fetch(ticker, start, end, now)
    }

    /// Run with the history ending `today`.
    pub fn run(&mut self, ticker: &TickerSymbol, horizon: Horizon, today: NaiveDate) -> PipelineOutcome {
        self.run_at(ticker, horizon, today.and_time(NaiveTime::MIN))
    }

    /// Run with the history ending on `now`'s date; `now` also drives cache staleness.
    pub fn run_at(
        &mut self,
        ticker: &TickerSymbol,
        horizon: Horizon,
        now: NaiveDateTime,
    ) -> PipelineOutcome {
        let today = now.date();
        let start = self.config.start_date_policy.floor();
        info!(ticker = %ticker, years = horizon.years(), "{STATUS_LOADING}");

        let series = match self.fetch(ticker, start, today, now) {
            Ok(series) if !series.is_empty() => series,
            Ok(_) => {
                warn!(ticker = %ticker, "fetch returned an empty series");
                return PipelineOutcome::NoData {
                    ticker: ticker.clone(),
                    reason: FetchError::EmptySeries {
                        symbol: ticker.to_string(),
                        start,
                        end: today,
                    },
                };
            }
            Err(reason) => {
                warn!(ticker = %ticker, error = %reason, "{STATUS_LOAD_FAILED}");
                return PipelineOutcome::NoData {
                    ticker: ticker.clone(),
                    reason,
                };
            }
        };
        info!(ticker = %ticker, rows = series.len(), "{STATUS_LOADED}");

        match forecast(&series, horizon.days(), self.model.as_mut()) {
            Ok(forecast) => PipelineOutcome::Ready { series, forecast },
            Err(error) => {
                warn!(ticker = %ticker, error = %error, "forecast failed");
                PipelineOutcome::ForecastFailed { series, error }
            }
        }
    }
}

/// Flat, serializable digest of an outcome for logs and `--json` output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub ticker: String,
    pub status: String,
    pub source: Option<DataSource>,
    pub rows: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub content_hash: Option<String>,
    pub horizon_days: usize,
    pub forecast_rows: usize,
    pub forecast_end: Option<NaiveDate>,
    pub final_prediction: Option<f64>,
    pub final_lower: Option<f64>,
    pub final_upper: Option<f64>,
    pub seasonalities: Vec<String>,
    pub message: Option<String>,
}

impl RunSummary {
    pub fn from_outcome(ticker: &TickerSymbol, horizon: Horizon, outcome: &PipelineOutcome) -> Self {
        let series = outcome.series();
        let fc = outcome.forecast();
        let last = fc.and_then(|f| f.points().last());
        let status = match outcome {
            PipelineOutcome::Ready { .. } => "ready",
            PipelineOutcome::NoData { .. } => "no_data",
            PipelineOutcome::ForecastFailed { .. } => "forecast_failed",
        };
        let message = match outcome {
            PipelineOutcome::NoData { reason, .. } => Some(reason.to_string()),
            other => other.forecast_message(),
        };
        Self {
            ticker: ticker.to_string(),
            status: status.to_string(),
            source: series.map(|s| s.source()),
            rows: series.map_or(0, |s| s.len()),
            first_date: series.and_then(|s| s.first_date()),
            last_date: series.and_then(|s| s.last_date()),
            content_hash: series.map(|s| s.content_hash()),
            horizon_days: horizon.days(),
            forecast_rows: fc.map_or(0, |f| f.len()),
            forecast_end: fc.and_then(|f| f.last_date()),
            final_prediction: last.map(|p| p.predicted),
            final_lower: last.map(|p| p.lower),
            final_upper: last.map(|p| p.upper),
            seasonalities: fc.map(|f| f.seasonalities().to_vec()).unwrap_or_default(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trendcast_core::data::StartDatePolicy;
    use trendcast_core::forecast::AdditiveConfig;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn synthetic_config() -> PipelineConfig {
        PipelineConfig {
            start_date_policy: StartDatePolicy::Fixed { date: d(2022, 1, 1) },
            provider: ProviderKind::Synthetic { seed: 3 },
            forecast: AdditiveConfig {
                uncertainty_samples: 30,
                ..AdditiveConfig::default()
            },
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn synthetic_pipeline_is_ready() {
        let mut pipeline = Pipeline::new(synthetic_config()).unwrap();
        let ticker = TickerSymbol::new("AAPL").unwrap();
        let horizon = Horizon::from_years(1.0).unwrap();
        let outcome = pipeline.run(&ticker, horizon, d(2024, 1, 1));

        assert!(outcome.is_ready());
        assert_eq!(outcome.load_status(), STATUS_LOADED);
        assert!(outcome.forecast_message().is_none());
        let series = outcome.series().unwrap();
        let fc = outcome.forecast().unwrap();
        assert_eq!(fc.len(), series.len() + 365);

        let summary = RunSummary::from_outcome(&ticker, horizon, &outcome);
        assert_eq!(summary.status, "ready");
        assert_eq!(summary.source, Some(DataSource::Synthetic));
        assert_eq!(summary.forecast_rows, fc.len());
    }

    #[test]
    fn second_run_hits_cache() {
        let mut pipeline = Pipeline::new(synthetic_config()).unwrap();
        let ticker = TickerSymbol::new("MSFT").unwrap();
        let horizon = Horizon::from_years(0.0).unwrap();
        pipeline.run(&ticker, horizon, d(2024, 1, 1));
        pipeline.run(&ticker, horizon, d(2024, 1, 1));
        assert_eq!(pipeline.cache_stats(), CacheStats { hits: 1, misses: 1 });
        assert_eq!(pipeline.cached_tickers(), 1);
        assert!(pipeline.invalidate(&ticker));
        assert_eq!(pipeline.cached_tickers(), 0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = PipelineConfig {
            tickers: vec![],
            ..synthetic_config()
        };
        assert!(matches!(
            Pipeline::new(config),
            Err(PipelineError::Config(_))
        ));
    }
}
