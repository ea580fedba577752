//! Offline provider producing deterministic random-walk price history.
//!
//! Each symbol gets its own seed stream, so `AAPL` and `MSFT` differ but a
//! given symbol always yields the same bars. Weekends are skipped.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::Rng;

use super::provider::{DataProvider, FetchError, FetchResult, RawBar};
use crate::domain::series::DataSource;
use crate::rng::SeedHierarchy;

/// First date the synthetic history is anchored at.
pub fn synthetic_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 3).unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    seeds: SeedHierarchy,
    drift: f64,
    volatility: f64,
    unknown: Vec<String>,
}

impl SyntheticProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            seeds: SeedHierarchy::new(seed),
            drift: 0.0004,
            volatility: 0.015,
            unknown: Vec::new(),
        }
    }

    pub fn with_walk(mut self, drift: f64, volatility: f64) -> Self {
        self.drift = drift;
        self.volatility = volatility.abs();
        self
    }

    /// Symbols this provider answers with `SymbolNotFound`.
    pub fn with_unknown_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unknown.extend(symbols.into_iter().map(Into::into));
        self
    }

    fn check_symbol(&self, symbol: &str) -> Result<(), FetchError> {
        if self.unknown.iter().any(|s| s == symbol) {
            return Err(FetchError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        Ok(())
    }

    /// Walk from the epoch through `end`, keeping bars on or after `start`.
    ///
    /// Walking from a fixed anchor keeps prices for a given day identical no
    /// matter which window is requested.
    fn generate(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<RawBar> {
        let mut rng = self.seeds.rng_for(symbol, 0);
        let base = 20.0 + (self.seeds.sub_seed(symbol, 1) % 180) as f64;
        let mut close = base;
        let mut bars = Vec::new();

        for date in synthetic_epoch().iter_days().take_while(|d| *d <= end) {
            if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                continue;
            }
            let shock: f64 = rng.gen_range(-1.0..1.0) * self.volatility;
            let open = close;
            close = (close * (1.0 + self.drift + shock)).max(0.01);
            let spread = close * self.volatility * rng.gen_range(0.1..1.0);
            let high = open.max(close) + spread;
            let low = (open.min(close) - spread).max(0.005);
            let volume = rng.gen_range(500_000..5_000_000u64);

            if date >= start {
                bars.push(RawBar {
                    date,
                    open,
                    high,
                    low,
                    close,
                    volume,
                    adj_close: close,
                });
            }
        }
        bars
    }
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self::new(42)
    }
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, FetchError> {
        self.check_symbol(symbol)?;
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars: self.generate(symbol, start, end),
            source: DataSource::Synthetic,
        })
    }

    fn earliest_date(&self, symbol: &str) -> Result<NaiveDate, FetchError> {
        self.check_symbol(symbol)?;
        Ok(synthetic_epoch())
    }

    fn is_available(&self) -> bool {
        true
    }
}
