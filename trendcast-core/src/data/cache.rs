//! Session-scoped memoization of fetched series.
//!
//! Entries are keyed by ticker and hold the shared `Arc<PriceSeries>` plus
//! when it was fetched and its BLAKE3 content hash. A hit hands back the same
//! `Arc` that the populating miss returned. Errors are never stored.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::fetcher::DataFetcher;
use super::provider::FetchError;
use crate::domain::series::PriceSeries;
use crate::domain::ticker::TickerSymbol;

/// When a cached entry stops being served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StalenessPolicy {
    /// Stale once the calendar day of `now` differs from the fetch day.
    #[default]
    Daily,
    /// Stale after the given number of seconds.
    MaxAge { seconds: u64 },
    /// Never stale for the lifetime of the cache.
    Never,
}

impl StalenessPolicy {
    pub fn is_stale(&self, fetched_at: NaiveDateTime, now: NaiveDateTime) -> bool {
        match self {
            StalenessPolicy::Daily => fetched_at.date() != now.date(),
            StalenessPolicy::MaxAge { seconds } => {
                (now - fetched_at).num_seconds() > i64::try_from(*seconds).unwrap_or(i64::MAX)
            }
            StalenessPolicy::Never => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub series: Arc<PriceSeries>,
    pub requested: (NaiveDate, NaiveDate),
    pub fetched_at: NaiveDateTime,
    pub content_hash: String,
}

impl CacheEntry {
    pub fn fetch_day(&self) -> NaiveDate {
        self.fetched_at.date()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Default)]
pub struct SessionCache {
    entries: HashMap<TickerSymbol, CacheEntry>,
    policy: StalenessPolicy,
    stats: CacheStats,
}

impl SessionCache {
    pub fn new(policy: StalenessPolicy) -> Self {
        Self {
            entries: HashMap::new(),
            policy,
            stats: CacheStats::default(),
        }
    }

    pub fn policy(&self) -> StalenessPolicy {
        self.policy
    }

    /// Fresh entry for `ticker` fetched for the same requested window.
    pub fn get(
        &self,
        ticker: &TickerSymbol,
        start: NaiveDate,
        end: NaiveDate,
        now: NaiveDateTime,
    ) -> Option<&CacheEntry> {
        self.entries.get(ticker).filter(|e| {
            e.requested == (start, end) && !self.policy.is_stale(e.fetched_at, now)
        })
    }

    pub fn insert(
        &mut self,
        series: Arc<PriceSeries>,
        requested: (NaiveDate, NaiveDate),
        now: NaiveDateTime,
    ) -> &CacheEntry {
        let ticker = series.ticker().clone();
        let entry = CacheEntry {
            content_hash: series.content_hash(),
            series,
            requested,
            fetched_at: now,
        };
        self.entries.insert(ticker.clone(), entry);
        &self.entries[&ticker]
    }

    pub fn entry(&self, ticker: &TickerSymbol) -> Option<&CacheEntry> {
        self.entries.get(ticker)
    }

    pub fn invalidate(&mut self, ticker: &TickerSymbol) -> bool {
        self.entries.remove(ticker).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

/// A `DataFetcher` fronted by a `SessionCache`.
pub struct CachedFetcher {
    fetcher: DataFetcher,
    cache: SessionCache,
}

impl CachedFetcher {
    pub fn new(fetcher: DataFetcher, policy: StalenessPolicy) -> Self {
        Self {
            fetcher,
            cache: SessionCache::new(policy),
        }
    }

    pub fn fetcher(&self) -> &DataFetcher {
        &self.fetcher
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut SessionCache {
        &mut self.cache
    }

    /// Cached series for `ticker`, fetching only on a miss or stale entry.
    pub fn get_or_fetch(
        &mut self,
        ticker: &TickerSymbol,
        start: NaiveDate,
        end: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Arc<PriceSeries>, FetchError> {
        if let Some(entry) = self.cache.get(ticker, start, end, now) {
            let series = Arc::clone(&entry.series);
            debug!(ticker = %ticker, hash = &entry.content_hash[..12], "cache hit");
            self.cache.stats.hits += 1;
            return Ok(series);
        }

        self.cache.stats.misses += 1;
        debug!(ticker = %ticker, "cache miss");
        let series = Arc::new(self.fetcher.fetch(ticker, start, end)?);
        self.cache.insert(Arc::clone(&series), (start, end), now);
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fetcher::StartDatePolicy;
    use crate::data::synthetic::SyntheticProvider;
    use chrono::Duration;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn at(date: NaiveDate, h: u32) -> NaiveDateTime {
        date.and_hms_opt(h, 0, 0).unwrap()
    }

    fn cached(policy: StalenessPolicy) -> CachedFetcher {
        let provider = SyntheticProvider::new(9).with_unknown_symbols(["NOPE"]);
        let fetcher = DataFetcher::new(
            Arc::new(provider),
            StartDatePolicy::Fixed { date: d(2020, 1, 1) },
        );
        CachedFetcher::new(fetcher, policy)
    }

    #[test]
    fn daily_policy_expires_at_midnight() {
        let p = StalenessPolicy::Daily;
        assert!(!p.is_stale(at(d(2024, 1, 1), 1), at(d(2024, 1, 1), 23)));
        assert!(p.is_stale(at(d(2024, 1, 1), 23), at(d(2024, 1, 2), 0)));
    }

    #[test]
    fn max_age_and_never() {
        let p = StalenessPolicy::MaxAge { seconds: 60 };
        let t0 = at(d(2024, 1, 1), 12);
        assert!(!p.is_stale(t0, t0 + Duration::seconds(60)));
        assert!(p.is_stale(t0, t0 + Duration::seconds(61)));
        assert!(!StalenessPolicy::Never.is_stale(t0, t0 + Duration::days(400)));
    }

    #[test]
    fn hit_returns_same_arc() {
        let mut c = cached(StalenessPolicy::Daily);
        let t = TickerSymbol::new("AAPL").unwrap();
        let now = at(d(2024, 3, 1), 9);
        let a = c.get_or_fetch(&t, d(2020, 1, 1), d(2024, 3, 1), now).unwrap();
        let b = c
            .get_or_fetch(&t, d(2020, 1, 1), d(2024, 3, 1), now + Duration::hours(2))
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(c.cache().stats(), CacheStats { hits: 1, misses: 1 });
        assert_eq!(c.cache().len(), 1);
    }

    #[test]
    fn next_day_refetches() {
        let mut c = cached(StalenessPolicy::Daily);
        let t = TickerSymbol::new("AAPL").unwrap();
        let a = c.get_or_fetch(&t, d(2020, 1, 1), d(2024, 3, 1), at(d(2024, 3, 1), 9)).unwrap();
        let b = c.get_or_fetch(&t, d(2020, 1, 1), d(2024, 3, 1), at(d(2024, 3, 2), 9)).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.content_hash(), b.content_hash());
        assert_eq!(c.cache().stats().misses, 2);
    }

    #[test]
    fn failures_are_not_cached() {
        let mut c = cached(StalenessPolicy::Never);
        let t = TickerSymbol::new("NOPE").unwrap();
        let now = at(d(2024, 3, 1), 9);
        assert!(c.get_or_fetch(&t, d(2020, 1, 1), d(2024, 3, 1), now).is_err());
        assert!(c.get_or_fetch(&t, d(2020, 1, 1), d(2024, 3, 1), now).is_err());
        assert!(c.cache().is_empty());
        assert_eq!(c.cache().stats().misses, 2);
    }

    #[test]
    fn invalidate_and_clear() {
        let mut c = cached(StalenessPolicy::Never);
        let now = at(d(2024, 3, 1), 9);
        let aapl = TickerSymbol::new("AAPL").unwrap();
        let msft = TickerSymbol::new("MSFT").unwrap();
        c.get_or_fetch(&aapl, d(2020, 1, 1), d(2024, 3, 1), now).unwrap();
        c.get_or_fetch(&msft, d(2020, 1, 1), d(2024, 3, 1), now).unwrap();
        assert!(c.cache_mut().invalidate(&aapl));
        assert!(!c.cache_mut().invalidate(&aapl));
        assert_eq!(c.cache().len(), 1);
        c.cache_mut().clear();
        assert!(c.cache().is_empty());
    }
}
