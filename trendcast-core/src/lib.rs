//! TrendCast Core: domain types, market data and the forecasting engine.
//!
//! - Domain types (tickers, price series, forecast input, horizons)
//! - Data providers (Yahoo Finance, synthetic) behind a circuit breaker
//! - Normalization, the start-date policy and the session cache
//! - Additive decomposition model and the forecast adapter

pub mod data;
pub mod domain;
pub mod forecast;
pub mod rng;
