//! Criterion benchmarks for the forecasting hot paths.
//!
//! 1. Normalization of raw provider bars
//! 2. Additive model fit (no sampling)
//! 3. Fit + predict with uncertainty sampling over a one-year horizon

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use trendcast_core::data::{Canonicalizer, DataProvider, SyntheticProvider};
use trendcast_core::domain::{DateWindow, PriceSeries};
use trendcast_core::forecast::{forecast, AdditiveConfig, AdditiveModel, ForecastModel};

// ── Helpers ──────────────────────────────────────────────────────────

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn synthetic_series(years: i32) -> PriceSeries {
    let provider = SyntheticProvider::new(7);
    let window = DateWindow::new(d(2024 - years, 1, 1), d(2024, 1, 1)).unwrap();
    let raw = provider.fetch("BENCH", window.start, window.end).unwrap();
    let (records, _) = Canonicalizer::normalize(&raw.bars, window).unwrap();
    PriceSeries::new(
        "BENCH".parse().unwrap(),
        window,
        raw.source,
        records,
    )
    .unwrap()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_normalize(c: &mut Criterion) {
    let provider = SyntheticProvider::new(7);
    let window = DateWindow::new(d(2014, 1, 1), d(2024, 1, 1)).unwrap();
    let raw = provider.fetch("BENCH", window.start, window.end).unwrap();
    c.bench_function("normalize_10y", |b| {
        b.iter(|| Canonicalizer::normalize(black_box(&raw.bars), window).unwrap())
    });
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("additive_fit");
    for years in [2, 6, 14] {
        let input = synthetic_series(years).forecast_input();
        group.bench_with_input(BenchmarkId::from_parameter(years), &input, |b, input| {
            b.iter(|| {
                let mut model = AdditiveModel::new(AdditiveConfig {
                    uncertainty_samples: 0,
                    ..AdditiveConfig::default()
                });
                model.fit(black_box(input)).unwrap();
            })
        });
    }
    group.finish();
}

fn bench_forecast_one_year(c: &mut Criterion) {
    let series = synthetic_series(6);
    let mut group = c.benchmark_group("forecast_365d");
    group.sample_size(10);
    for samples in [0usize, 200, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(samples), &samples, |b, &samples| {
            b.iter(|| {
                let mut model = AdditiveModel::new(AdditiveConfig {
                    uncertainty_samples: samples,
                    ..AdditiveConfig::default()
                });
                forecast(black_box(&series), 365, &mut model).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_normalize, bench_fit, bench_forecast_one_year);
criterion_main!(benches);
