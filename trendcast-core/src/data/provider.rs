//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over market-data sources (Yahoo Finance,
//! the synthetic random walk, in-test mocks) so the fetcher and cache never
//! depend on a particular upstream.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::series::DataSource;

/// Raw daily OHLCV bar as delivered by a provider (before normalization).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub adj_close: f64,
}

/// Structured fetch errors.
///
/// Displayable as-is in both the CLI and the TUI status bar.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("no usable price data for '{symbol}' between {start} and {end}")]
    EmptySeries {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("invalid date window: start {start} is after end {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    #[error("normalization failed: {0}")]
    Normalization(String),

    #[error("data error: {0}")]
    Other(String),
}

impl FetchError {
    /// True for the "this ticker has nothing to show" family, as opposed to
    /// transport or provider trouble.
    pub fn is_no_data(&self) -> bool {
        matches!(
            self,
            FetchError::SymbolNotFound { .. } | FetchError::EmptySeries { .. }
        )
    }
}

/// Result of a successful provider fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub bars: Vec<RawBar>,
    pub source: DataSource,
}

/// Trait for market-data providers.
///
/// Providers only talk to their upstream; window resolution, normalization
/// and caching all sit above this trait.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily OHLCV bars for a symbol over a date range (inclusive).
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<FetchResult, FetchError>;

    /// Earliest date for which the provider has history for `symbol`.
    fn earliest_date(&self, symbol: &str) -> Result<NaiveDate, FetchError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool;
}
