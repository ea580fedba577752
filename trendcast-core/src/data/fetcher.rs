//! Data Fetcher: resolve the effective window, pull bars from a provider,
//! normalize them into a `PriceSeries`.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::canonicalize::Canonicalizer;
use super::provider::{DataProvider, FetchError};
use crate::domain::series::{DateWindow, PriceSeries};
use crate::domain::ticker::TickerSymbol;

/// How the first date of the fetched window is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StartDatePolicy {
    /// Never start before `date`.
    Fixed { date: NaiveDate },
    /// Ask the provider for the ticker's first trading day and never start
    /// before `floor`. Costs one extra request per ticker.
    EarliestAvailable { floor: NaiveDate },
}

impl StartDatePolicy {
    pub fn floor(&self) -> NaiveDate {
        match self {
            StartDatePolicy::Fixed { date } => *date,
            StartDatePolicy::EarliestAvailable { floor } => *floor,
        }
    }
}

impl Default for StartDatePolicy {
    /// 2010-01-01 floor combined with the earliest available date.
    fn default() -> Self {
        StartDatePolicy::EarliestAvailable {
            floor: NaiveDate::from_ymd_opt(2010, 1, 1).unwrap_or_default(),
        }
    }
}

pub struct DataFetcher {
    provider: Arc<dyn DataProvider>,
    policy: StartDatePolicy,
}

impl DataFetcher {
    pub fn new(provider: Arc<dyn DataProvider>, policy: StartDatePolicy) -> Self {
        Self { provider, policy }
    }

    pub fn policy(&self) -> StartDatePolicy {
        self.policy
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Start date actually used for `ticker` given the caller's `requested`.
    pub fn effective_start(
        &self,
        ticker: &TickerSymbol,
        requested: NaiveDate,
    ) -> Result<NaiveDate, FetchError> {
        match self.policy {
            StartDatePolicy::Fixed { date } => Ok(date.max(requested)),
            StartDatePolicy::EarliestAvailable { floor } => {
                let earliest = self.provider.earliest_date(ticker.as_str())?;
                debug!(ticker = %ticker, %earliest, "earliest available date");
                Ok(floor.max(earliest).max(requested))
            }
        }
    }

    /// Fetch and normalize the daily series for `ticker` over `[start, end]`.
    pub fn fetch(
        &self,
        ticker: &TickerSymbol,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, FetchError> {
        if start > end {
            return Err(FetchError::InvalidWindow { start, end });
        }
        if !self.provider.is_available() {
            warn!(ticker = %ticker, provider = self.provider.name(), "provider unavailable, skipping fetch");
            return Err(FetchError::CircuitBreakerTripped);
        }
        let effective = self.effective_start(ticker, start)?;
        let window = DateWindow::new(effective, end).ok_or_else(|| FetchError::EmptySeries {
            symbol: ticker.to_string(),
            start: effective,
            end,
        })?;

        info!(
            ticker = %ticker,
            start = %window.start,
            end = %window.end,
            provider = self.provider.name(),
            "fetching price history"
        );
        let result = self.provider.fetch(ticker.as_str(), window.start, window.end)?;
        let (records, report) = Canonicalizer::normalize(&result.bars, window)?;
        if report.dropped() > 0 {
            debug!(ticker = %ticker, dropped = report.dropped(), "normalization dropped bars");
        }
        if records.is_empty() {
            warn!(ticker = %ticker, "no usable bars after normalization");
            return Err(FetchError::EmptySeries {
                symbol: ticker.to_string(),
                start: window.start,
                end: window.end,
            });
        }

        PriceSeries::new(ticker.clone(), window, result.source, records)
            .map_err(|e| FetchError::Normalization(e.to_string()))
    }
}
