//! Pipeline configuration, loaded from TOML.
//!
//! One struct covers every page flavour: which start-date policy to use,
//! how headers are labelled, which tickers may be picked, the horizon
//! slider, how long fetched series stay cached, and the model settings.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use trendcast_core::data::{StalenessPolicy, StartDatePolicy};
use trendcast_core::domain::{ColumnSchema, Horizon, TickerSymbol, MAX_HORIZON_YEARS};
use trendcast_core::forecast::AdditiveConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("unknown preset '{0}' (expected one of: {presets})", presets = PRESETS.join(", "))]
    UnknownPreset(String),
}

/// Names accepted by [`PipelineConfig::preset`].
pub const PRESETS: [&str; 4] = ["classic", "fixed-2017", "fixed-2018", "extended"];

/// Which upstream the pipeline reads from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Yahoo,
    /// Deterministic random walk; no network.
    Synthetic { seed: u64 },
}

/// Range and granularity of the horizon control, in years.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorizonSlider {
    pub min_years: f64,
    pub max_years: f64,
    pub step_years: f64,
    pub default_years: f64,
}

impl Default for HorizonSlider {
    fn default() -> Self {
        Self {
            min_years: 1.0,
            max_years: 4.0,
            step_years: 1.0,
            default_years: 1.0,
        }
    }
}

impl HorizonSlider {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ok = self.min_years >= 0.0
            && self.min_years <= self.default_years
            && self.default_years <= self.max_years
            && self.max_years <= MAX_HORIZON_YEARS
            && self.step_years > 0.0
            && [self.min_years, self.max_years, self.step_years, self.default_years]
                .iter()
                .all(|v| v.is_finite());
        if ok {
            Ok(())
        } else {
            Err(ConfigError::Invalid(format!(
                "horizon slider must satisfy 0 <= min <= default <= max <= {MAX_HORIZON_YEARS} \
                 with step > 0 (got min {}, default {}, max {}, step {})",
                self.min_years, self.default_years, self.max_years, self.step_years
            )))
        }
    }

    /// Snap `years` onto the slider grid and clamp it to the range.
    pub fn snap(&self, years: f64) -> f64 {
        let clamped = years.clamp(self.min_years, self.max_years);
        let steps = ((clamped - self.min_years) / self.step_years).round();
        // two decimals are enough for any step the page offers
        let snapped = ((self.min_years + steps * self.step_years) * 100.0).round() / 100.0;
        snapped.min(self.max_years)
    }

    pub fn step_up(&self, years: f64) -> f64 {
        self.snap(years + self.step_years)
    }

    pub fn step_down(&self, years: f64) -> f64 {
        self.snap(years - self.step_years)
    }

    pub fn horizon(&self, years: f64) -> Result<Horizon, ConfigError> {
        Horizon::from_years(self.snap(years)).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn default_horizon(&self) -> Result<Horizon, ConfigError> {
        self.horizon(self.default_years)
    }
}

/// How many rows the raw-data and forecast tables show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub head_rows: usize,
    pub tail_rows: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            head_rows: 5,
            tail_rows: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub start_date_policy: StartDatePolicy,
    pub column_schema: ColumnSchema,
    pub tickers: Vec<String>,
    pub horizon: HorizonSlider,
    pub staleness: StalenessPolicy,
    pub provider: ProviderKind,
    pub display: DisplayConfig,
    pub forecast: AdditiveConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            start_date_policy: StartDatePolicy::default(),
            column_schema: ColumnSchema::Canonical,
            tickers: ["GOOG", "AAPL", "MSFT", "META", "AMZN"]
                .into_iter()
                .map(String::from)
                .collect(),
            horizon: HorizonSlider::default(),
            staleness: StalenessPolicy::Daily,
            provider: ProviderKind::Yahoo,
            display: DisplayConfig::default(),
            forecast: AdditiveConfig::default(),
        }
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

impl PipelineConfig {
    /// Named starting points matching the page flavours that shipped.
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        let base = Self::default();
        let config = match name {
            "classic" => base,
            "fixed-2017" => Self {
                start_date_policy: StartDatePolicy::Fixed { date: date(2017, 1, 1) },
                column_schema: ColumnSchema::Provider,
                ..base
            },
            "fixed-2018" => Self {
                start_date_policy: StartDatePolicy::Fixed { date: date(2018, 1, 1) },
                ..base
            },
            "extended" => Self {
                start_date_policy: StartDatePolicy::Fixed { date: date(2010, 1, 1) },
                tickers: [
                    "AAPL", "MSFT", "GOOG", "AMZN", "META", "NVDA", "TSLA", "NFLX", "INTC",
                    "AMD", "IBM", "ORCL", "JPM", "V", "WMT", "DIS", "KO", "PEP",
                ]
                .into_iter()
                .map(String::from)
                .collect(),
                horizon: HorizonSlider {
                    min_years: 0.1,
                    max_years: 15.0,
                    step_years: 0.1,
                    default_years: 1.0,
                },
                ..base
            },
            other => return Err(ConfigError::UnknownPreset(other.to_string())),
        };
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.horizon.validate()?;
        if self.tickers.is_empty() {
            return Err(ConfigError::Invalid("ticker allow-list is empty".into()));
        }
        self.ticker_symbols()?;
        let f = &self.forecast;
        if !(f.interval_width > 0.0 && f.interval_width < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "forecast.interval_width must be in (0, 1), got {}",
                f.interval_width
            )));
        }
        if !(0.0..=1.0).contains(&f.changepoint_range) {
            return Err(ConfigError::Invalid(format!(
                "forecast.changepoint_range must be in [0, 1], got {}",
                f.changepoint_range
            )));
        }
        if f.changepoint_prior_scale <= 0.0 || f.seasonality_prior_scale <= 0.0 {
            return Err(ConfigError::Invalid(
                "forecast prior scales must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn ticker_symbols(&self) -> Result<Vec<TickerSymbol>, ConfigError> {
        self.tickers
            .iter()
            .map(|t| TickerSymbol::new(t).map_err(|e| ConfigError::Invalid(e.to_string())))
            .collect()
    }

    pub fn allows(&self, ticker: &TickerSymbol) -> bool {
        self.tickers.iter().any(|t| t.trim() == ticker.as_str())
    }
}
