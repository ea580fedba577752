//! Data Fetcher contract tests against an in-test mock provider.
//!
//! The mock records every call so the tests can check how many upstream
//! requests the start-date policy and the cache actually issue.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use trendcast_core::data::{
    CachedFetcher, DataFetcher, DataProvider, FetchError, FetchResult, RawBar, StalenessPolicy,
    StartDatePolicy,
};
use trendcast_core::domain::{DataSource, TickerSymbol};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn bar(date: NaiveDate, close: f64) -> RawBar {
    RawBar {
        date,
        open: close,
        high: close + 0.5,
        low: close - 0.5,
        close,
        volume: 100,
        adj_close: close,
    }
}

/// Serves a fixed, deliberately messy bar list for every symbol but `BAD`.
struct MockProvider {
    bars: Vec<RawBar>,
    earliest: NaiveDate,
    fetches: AtomicUsize,
    earliest_calls: AtomicUsize,
    last_window: std::sync::Mutex<Option<(NaiveDate, NaiveDate)>>,
}

impl MockProvider {
    fn new(bars: Vec<RawBar>, earliest: NaiveDate) -> Self {
        Self {
            bars,
            earliest,
            fetches: AtomicUsize::new(0),
            earliest_calls: AtomicUsize::new(0),
            last_window: std::sync::Mutex::new(None),
        }
    }
}

impl DataProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        *self.last_window.lock().unwrap() = Some((start, end));
        if symbol == "BAD" {
            return Err(FetchError::SymbolNotFound {
                symbol: symbol.into(),
            });
        }
        // Upstream sometimes leaks bars outside the window; return everything.
        Ok(FetchResult {
            symbol: symbol.into(),
            bars: self.bars.clone(),
            source: DataSource::Fixture,
        })
    }

    fn earliest_date(&self, symbol: &str) -> Result<NaiveDate, FetchError> {
        self.earliest_calls.fetch_add(1, Ordering::SeqCst);
        if symbol == "BAD" {
            return Err(FetchError::SymbolNotFound {
                symbol: symbol.into(),
            });
        }
        Ok(self.earliest)
    }

    fn is_available(&self) -> bool {
        true
    }
}

fn messy_bars() -> Vec<RawBar> {
    vec![
        bar(d(2017, 12, 29), 9.0),
        bar(d(2018, 1, 4), 13.0),
        bar(d(2018, 1, 2), 11.0),
        bar(d(2018, 1, 3), 12.0),
        bar(d(2018, 1, 3), 99.0),
        bar(d(2018, 1, 5), f64::NAN),
        bar(d(2018, 1, 8), 14.0),
        bar(d(2018, 2, 1), 15.0),
    ]
}

#[test]
fn fetched_dates_are_inside_window_ascending_unique() {
    let provider = Arc::new(MockProvider::new(messy_bars(), d(1990, 1, 1)));
    let fetcher = DataFetcher::new(provider, StartDatePolicy::Fixed { date: d(2018, 1, 1) });
    let series = fetcher
        .fetch(&TickerSymbol::new("AAPL").unwrap(), d(2000, 1, 1), d(2018, 1, 31))
        .unwrap();

    let dates = series.dates();
    assert_eq!(
        dates,
        vec![d(2018, 1, 2), d(2018, 1, 3), d(2018, 1, 4), d(2018, 1, 8)]
    );
    assert!(dates.iter().all(|x| series.window().contains(*x)));
    // first occurrence of the duplicate wins
    assert_eq!(series.records()[1].close, 12.0);
}

#[test]
fn fixed_policy_skips_earliest_lookup() {
    let provider = Arc::new(MockProvider::new(messy_bars(), d(1990, 1, 1)));
    let fetcher = DataFetcher::new(
        provider.clone(),
        StartDatePolicy::Fixed { date: d(2018, 1, 1) },
    );
    fetcher
        .fetch(&TickerSymbol::new("AAPL").unwrap(), d(2000, 1, 1), d(2018, 3, 1))
        .unwrap();
    assert_eq!(provider.earliest_calls.load(Ordering::SeqCst), 0);
    assert_eq!(provider.fetches.load(Ordering::SeqCst), 1);
    assert_eq!(
        *provider.last_window.lock().unwrap(),
        Some((d(2018, 1, 1), d(2018, 3, 1)))
    );
}

#[test]
fn earliest_policy_costs_one_lookup_and_uses_later_date() {
    let provider = Arc::new(MockProvider::new(messy_bars(), d(2018, 1, 3)));
    let fetcher = DataFetcher::new(
        provider.clone(),
        StartDatePolicy::EarliestAvailable { floor: d(2010, 1, 1) },
    );
    let series = fetcher
        .fetch(&TickerSymbol::new("AAPL").unwrap(), d(2000, 1, 1), d(2018, 3, 1))
        .unwrap();
    assert_eq!(provider.earliest_calls.load(Ordering::SeqCst), 1);
    assert_eq!(series.window().start, d(2018, 1, 3));
    assert_eq!(series.first_date(), Some(d(2018, 1, 3)));
}

#[test]
fn unknown_symbol_is_a_typed_error() {
    let provider = Arc::new(MockProvider::new(messy_bars(), d(1990, 1, 1)));
    let fetcher = DataFetcher::new(provider, StartDatePolicy::default());
    let err = fetcher
        .fetch(&TickerSymbol::new("BAD").unwrap(), d(2000, 1, 1), d(2018, 3, 1))
        .unwrap_err();
    assert!(matches!(err, FetchError::SymbolNotFound { .. }));
    assert!(err.is_no_data());
}

#[test]
fn window_with_only_invalid_rows_is_empty_series() {
    let provider = Arc::new(MockProvider::new(messy_bars(), d(1990, 1, 1)));
    let fetcher = DataFetcher::new(provider, StartDatePolicy::Fixed { date: d(2000, 1, 1) });
    let err = fetcher
        .fetch(&TickerSymbol::new("AAPL").unwrap(), d(2018, 1, 5), d(2018, 1, 7))
        .unwrap_err();
    assert!(matches!(err, FetchError::EmptySeries { .. }));
}

#[test]
fn cache_hit_skips_the_provider() {
    let provider = Arc::new(MockProvider::new(messy_bars(), d(1990, 1, 1)));
    let fetcher = DataFetcher::new(
        provider.clone(),
        StartDatePolicy::EarliestAvailable { floor: d(2018, 1, 1) },
    );
    let mut cached = CachedFetcher::new(fetcher, StalenessPolicy::Daily);
    let ticker = TickerSymbol::new("AAPL").unwrap();
    let now = d(2018, 3, 1).and_hms_opt(10, 0, 0).unwrap();

    let first = cached.get_or_fetch(&ticker, d(2000, 1, 1), d(2018, 3, 1), now).unwrap();
    let second = cached
        .get_or_fetch(&ticker, d(2000, 1, 1), d(2018, 3, 1), now + Duration::minutes(5))
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.content_hash(), second.content_hash());
    assert_eq!(provider.fetches.load(Ordering::SeqCst), 1);
    assert_eq!(provider.earliest_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        cached.cache().entry(&ticker).unwrap().content_hash,
        first.content_hash()
    );
}
