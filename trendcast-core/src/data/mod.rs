//! Market data: providers, normalization, fetcher and session cache.

pub mod cache;
pub mod canonicalize;
pub mod circuit_breaker;
pub mod fetcher;
pub mod provider;
pub mod synthetic;
pub mod yahoo;

pub use cache::{CacheEntry, CacheStats, CachedFetcher, SessionCache, StalenessPolicy};
pub use canonicalize::{Canonicalizer, NormalizeReport};
pub use circuit_breaker::CircuitBreaker;
pub use fetcher::{DataFetcher, StartDatePolicy};
pub use provider::{DataProvider, FetchError, FetchResult, RawBar};
pub use synthetic::SyntheticProvider;
pub use yahoo::YahooProvider;
