//! Forecast output: per-date predictions with bounds and components.

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::series::unix_epoch;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted: f64,
    pub lower: f64,
    pub upper: f64,
    pub trend: f64,
    pub trend_lower: f64,
    pub trend_upper: f64,
    /// One value per entry of the owning table's `seasonalities`.
    pub seasonal: Vec<f64>,
}

/// Raw model output for a list of dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub seasonalities: Vec<String>,
    pub points: Vec<ForecastPoint>,
}

/// Forecast over the fitted history followed by `horizon_days` future days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    model: String,
    seasonalities: Vec<String>,
    points: Vec<ForecastPoint>,
    history_len: usize,
    horizon_days: usize,
}

impl ForecastResult {
    pub(crate) fn new(
        model: String,
        prediction: Prediction,
        history_len: usize,
        horizon_days: usize,
    ) -> Self {
        Self {
            model,
            seasonalities: prediction.seasonalities,
            points: prediction.points,
            history_len,
            horizon_days,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn seasonalities(&self) -> &[String] {
        &self.seasonalities
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn history_len(&self) -> usize {
        self.history_len
    }

    pub fn horizon_days(&self) -> usize {
        self.horizon_days
    }

    /// In-sample points, aligned with the input history.
    pub fn history(&self) -> &[ForecastPoint] {
        &self.points[..self.history_len.min(self.points.len())]
    }

    /// Out-of-sample points.
    pub fn future(&self) -> &[ForecastPoint] {
        &self.points[self.history_len.min(self.points.len())..]
    }

    pub fn tail(&self, n: usize) -> &[ForecastPoint] {
        &self.points[self.points.len().saturating_sub(n)..]
    }

    pub fn timestamps(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Values of one seasonal component across all points.
    pub fn component(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.seasonalities.iter().position(|s| s == name)?;
        Some(self.points.iter().map(|p| p.seasonal[idx]).collect())
    }

    /// `ds, yhat, yhat_lower, yhat_upper, trend, trend_lower, trend_upper, <seasonalities>`.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let epoch = unix_epoch();
        let col_of = |name: &str, f: fn(&ForecastPoint) -> f64| {
            Column::new(name.into(), self.points.iter().map(f).collect::<Vec<f64>>())
        };
        let mut columns = vec![
            Column::new(
                "ds".into(),
                self.points
                    .iter()
                    .map(|p| (p.date - epoch).num_days() as i32)
                    .collect::<Vec<i32>>(),
            )
            .cast(&DataType::Date)?,
            col_of("yhat", |p| p.predicted),
            col_of("yhat_lower", |p| p.lower),
            col_of("yhat_upper", |p| p.upper),
            col_of("trend", |p| p.trend),
            col_of("trend_lower", |p| p.trend_lower),
            col_of("trend_upper", |p| p.trend_upper),
        ];
        for (i, name) in self.seasonalities.iter().enumerate() {
            columns.push(Column::new(
                name.as_str().into(),
                self.points.iter().map(|p| p.seasonal[i]).collect::<Vec<f64>>(),
            ));
        }
        DataFrame::new(columns)
    }
}
