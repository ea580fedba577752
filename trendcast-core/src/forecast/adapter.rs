//! Forecast Adapter: reshape a price series into model input, fit, and
//! predict over the history plus a horizon of calendar days.

use chrono::{Duration, NaiveDate};
use tracing::info;

use super::model::{FitError, ForecastModel};
use super::result::ForecastResult;
use crate::domain::series::PriceSeries;

/// `horizon_days` consecutive calendar days after `last`.
pub fn future_dates(last: NaiveDate, horizon_days: usize) -> Vec<NaiveDate> {
    (1..=horizon_days as i64)
        .map(|i| last + Duration::days(i))
        .collect()
}

/// Fit `model` on `series` (date, close) and predict history + horizon.
///
/// The result has `series.len() + horizon_days` rows; its first
/// `series.len()` dates are the series dates.
pub fn forecast(
    series: &PriceSeries,
    horizon_days: usize,
    model: &mut dyn ForecastModel,
) -> Result<ForecastResult, FitError> {
    let input = series.forecast_input();
    model.fit(&input)?;

    let last = input
        .timestamps()
        .last()
        .copied()
        .ok_or(FitError::TooFewPoints { found: 0 })?;
    let mut dates = input.timestamps().to_vec();
    dates.extend(future_dates(last, horizon_days));

    let prediction = model.predict(&dates)?;
    let aligned = prediction.points.len() == dates.len()
        && prediction.points.iter().zip(&dates).all(|(p, d)| p.date == *d);
    if !aligned {
        return Err(FitError::MalformedPrediction {
            expected: dates.len(),
            found: prediction.points.len(),
        });
    }

    info!(
        ticker = %series.ticker(),
        model = model.name(),
        history = input.len(),
        horizon_days,
        "forecast complete"
    );
    Ok(ForecastResult::new(
        model.name().to_string(),
        prediction,
        input.len(),
        horizon_days,
    ))
}
