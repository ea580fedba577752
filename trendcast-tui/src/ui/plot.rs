//! Chart preparation. Turns pipeline outcomes into `(x, y)` datasets.
//!
//! x is days since the unix epoch so raw prices and forecasts share an axis.
//! Every builder checks its input first and returns `RenderPrecondition`
//! instead of charting absent data.

use chrono::{Duration, NaiveDate};
use thiserror::Error;

use trendcast_core::forecast::ForecastResult;
use trendcast_runner::{PipelineOutcome, NO_DATA_FORECAST, NO_DATA_PLOT};

use crate::app::RangeWindow;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderPrecondition {
    #[error("Select a ticker and press Enter to load data.")]
    NotLoaded,
    #[error("{}", NO_DATA_PLOT)]
    NoSeries,
    #[error("{0}")]
    NoForecast(String),
    #[error("No points in the selected range.")]
    EmptyWindow,
}

pub type Points = Vec<(f64, f64)>;

/// Axis bounds shared by every dataset in one chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: [f64; 2],
    pub y: [f64; 2],
}

#[derive(Debug, Clone)]
pub struct PriceTraces {
    pub open: Points,
    pub close: Points,
    pub bounds: Bounds,
    /// Shown range as `(first, last, total)` point positions.
    pub shown: (usize, usize, usize),
}

#[derive(Debug, Clone)]
pub struct ForecastTraces {
    pub observed: Points,
    pub predicted: Points,
    pub lower: Points,
    pub upper: Points,
    pub bounds: Bounds,
    pub forecast_start: f64,
}

#[derive(Debug, Clone)]
pub struct ComponentTrace {
    pub name: String,
    pub points: Points,
    pub lower: Option<Points>,
    pub upper: Option<Points>,
    pub bounds: Bounds,
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

pub fn date_x(date: NaiveDate) -> f64 {
    (date - epoch()).num_days() as f64
}

pub fn x_label(x: f64) -> String {
    (epoch() + Duration::days(x.round() as i64))
        .format("%Y-%m-%d")
        .to_string()
}

/// Bounds over all `sets`, y padded by 5% so lines do not touch the frame.
pub fn bounds_of(sets: &[&Points]) -> Option<Bounds> {
    let mut x = [f64::INFINITY, f64::NEG_INFINITY];
    let mut y = [f64::INFINITY, f64::NEG_INFINITY];
    for &(px, py) in sets.iter().flat_map(|s| s.iter()) {
        if !px.is_finite() || !py.is_finite() {
            continue;
        }
        x = [x[0].min(px), x[1].max(px)];
        y = [y[0].min(py), y[1].max(py)];
    }
    if x[0] > x[1] {
        return None;
    }
    let pad = ((y[1] - y[0]).abs() * 0.05).max(1e-6);
    if x[0] == x[1] {
        x[1] += 1.0;
    }
    Some(Bounds {
        x,
        y: [y[0] - pad, y[1] + pad],
    })
}

fn forecast_of(outcome: Option<&PipelineOutcome>) -> Result<&ForecastResult, RenderPrecondition> {
    let outcome = outcome.ok_or(RenderPrecondition::NotLoaded)?;
    match outcome {
        PipelineOutcome::Ready { forecast, .. } => Ok(forecast),
        PipelineOutcome::NoData { .. } => {
            Err(RenderPrecondition::NoForecast(NO_DATA_FORECAST.to_string()))
        }
        other => Err(RenderPrecondition::NoForecast(
            other.forecast_message().unwrap_or_default(),
        )),
    }
}

/// Open and close over the range window.
pub fn price_traces(
    outcome: Option<&PipelineOutcome>,
    window: RangeWindow,
    show_open: bool,
    show_close: bool,
) -> Result<PriceTraces, RenderPrecondition> {
    let series = outcome
        .ok_or(RenderPrecondition::NotLoaded)?
        .series()
        .filter(|s| !s.is_empty())
        .ok_or(RenderPrecondition::NoSeries)?;

    let records = series.records();
    let (start, end) = window.bounds(records.len());
    let visible = &records[start..end];
    let trace = |on: bool, f: fn(&trendcast_core::domain::PriceRecord) -> f64| -> Points {
        if on {
            visible.iter().map(|r| (date_x(r.date), f(r))).collect()
        } else {
            Vec::new()
        }
    };
    let open = trace(show_open, |r| r.open);
    let close = trace(show_close, |r| r.close);
    let bounds = bounds_of(&[&open, &close]).ok_or(RenderPrecondition::EmptyWindow)?;

    Ok(PriceTraces {
        open,
        close,
        bounds,
        shown: (start, end, records.len()),
    })
}

/// Observed close plus prediction and interval bounds over history and horizon.
pub fn forecast_traces(outcome: Option<&PipelineOutcome>) -> Result<ForecastTraces, RenderPrecondition> {
    let forecast = forecast_of(outcome)?;
    let series = outcome
        .and_then(|o| o.series())
        .ok_or(RenderPrecondition::NoSeries)?;

    let observed: Points = series
        .records()
        .iter()
        .map(|r| (date_x(r.date), r.close))
        .collect();
    let points = forecast.points();
    let predicted: Points = points.iter().map(|p| (date_x(p.date), p.predicted)).collect();
    let lower: Points = points.iter().map(|p| (date_x(p.date), p.lower)).collect();
    let upper: Points = points.iter().map(|p| (date_x(p.date), p.upper)).collect();
    let bounds = bounds_of(&[&observed, &predicted, &lower, &upper])
        .ok_or(RenderPrecondition::EmptyWindow)?;
    let forecast_start = series.last_date().map_or(bounds.x[1], date_x);

    Ok(ForecastTraces {
        observed,
        predicted,
        lower,
        upper,
        bounds,
        forecast_start,
    })
}

/// Trend (with its interval) followed by each seasonal component.
pub fn component_traces(
    outcome: Option<&PipelineOutcome>,
) -> Result<Vec<ComponentTrace>, RenderPrecondition> {
    let forecast = forecast_of(outcome)?;
    let points = forecast.points();
    if points.is_empty() {
        return Err(RenderPrecondition::EmptyWindow);
    }

    let trend: Points = points.iter().map(|p| (date_x(p.date), p.trend)).collect();
    let lower: Points = points.iter().map(|p| (date_x(p.date), p.trend_lower)).collect();
    let upper: Points = points.iter().map(|p| (date_x(p.date), p.trend_upper)).collect();
    let mut traces = Vec::with_capacity(1 + forecast.seasonalities().len());
    if let Some(bounds) = bounds_of(&[&trend, &lower, &upper]) {
        traces.push(ComponentTrace {
            name: "trend".into(),
            points: trend,
            lower: Some(lower),
            upper: Some(upper),
            bounds,
        });
    }

    for name in forecast.seasonalities() {
        let Some(values) = forecast.component(name) else {
            continue;
        };
        let pts: Points = points
            .iter()
            .zip(values)
            .map(|(p, v)| (date_x(p.date), v))
            .collect();
        if let Some(bounds) = bounds_of(&[&pts]) {
            traces.push(ComponentTrace {
                name: name.clone(),
                points: pts,
                lower: None,
                upper: None,
                bounds,
            });
        }
    }
    Ok(traces)
}
