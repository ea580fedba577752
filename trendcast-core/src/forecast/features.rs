//! Regressor construction: time scaling, trend hinges, Fourier terms.

use std::f64::consts::PI;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::series::unix_epoch;

/// Maps dates onto `[0, 1]` over the fitted history (future dates exceed 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    start: NaiveDate,
    span_days: f64,
}

impl TimeScale {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        let span = (end - start).num_days().max(1) as f64;
        Self {
            start,
            span_days: span,
        }
    }

    pub fn t(&self, date: NaiveDate) -> f64 {
        (date - self.start).num_days() as f64 / self.span_days
    }

    pub fn span_days(&self) -> f64 {
        self.span_days
    }
}

/// A periodic component expressed as a truncated Fourier series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seasonality {
    pub name: String,
    pub period_days: f64,
    pub fourier_order: usize,
}

impl Seasonality {
    pub fn yearly() -> Self {
        Self {
            name: "yearly".into(),
            period_days: 365.25,
            fourier_order: 10,
        }
    }

    pub fn weekly() -> Self {
        Self {
            name: "weekly".into(),
            period_days: 7.0,
            fourier_order: 3,
        }
    }

    pub fn width(&self) -> usize {
        2 * self.fourier_order
    }

    /// `[sin(2πkt/P), cos(2πkt/P)]` for `k = 1..=order`, t in days since the Unix epoch.
    pub fn features(&self, date: NaiveDate) -> impl Iterator<Item = f64> + '_ {
        let t = (date - unix_epoch()).num_days() as f64;
        (1..=self.fourier_order).flat_map(move |k| {
            let x = 2.0 * PI * k as f64 * t / self.period_days;
            [x.sin(), x.cos()]
        })
    }
}

/// Changepoint locations in scaled time.
///
/// Candidates sit at evenly spaced history rows inside the first
/// `range` fraction; the count is capped so every changepoint has
/// at least one row on each side.
pub fn changepoints(t_history: &[f64], requested: usize, range: f64) -> Vec<f64> {
    let hist = ((t_history.len() as f64) * range.clamp(0.0, 1.0)).floor() as usize;
    let n = requested.min(hist.saturating_sub(1));
    if n == 0 {
        return Vec::new();
    }
    let last = (hist - 1) as f64;
    (1..=n)
        .map(|i| {
            let idx = (last * i as f64 / n as f64).round() as usize;
            t_history[idx]
        })
        .collect()
}

/// `[1, t, (t - s_1)+, ..., (t - s_C)+]`.
pub fn trend_row(t: f64, changepoints: &[f64]) -> impl Iterator<Item = f64> + '_ {
    [1.0, t]
        .into_iter()
        .chain(changepoints.iter().map(move |s| (t - s).max(0.0)))
}
