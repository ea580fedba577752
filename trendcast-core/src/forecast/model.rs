//! The forecasting-model seam.

use chrono::NaiveDate;
use thiserror::Error;

use super::result::Prediction;
use crate::domain::series::ForecastInput;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("need at least 2 observations to fit, got {found}")]
    TooFewPoints { found: usize },

    #[error("all observed values are identical; nothing to fit")]
    ConstantSeries,

    #[error("non-finite value at row {index}")]
    NonFiniteValue { index: usize },

    #[error("timestamps must be strictly increasing (row {index})")]
    UnorderedTimestamps { index: usize },

    #[error("normal equations are numerically singular")]
    Singular,

    #[error("predict called before a successful fit")]
    NotFitted,

    #[error("model returned {found} predictions for {expected} dates")]
    MalformedPrediction { expected: usize, found: usize },
}

/// A model that learns from a `(timestamp, value)` history and predicts
/// values for arbitrary dates.
pub trait ForecastModel: Send {
    fn name(&self) -> &str;

    /// Fit on `input`, replacing any previous fit.
    fn fit(&mut self, input: &ForecastInput) -> Result<(), FitError>;

    /// Predict at `dates` (history and/or future, ascending).
    fn predict(&self, dates: &[NaiveDate]) -> Result<Prediction, FitError>;
}

/// Checks shared by every model: size, finiteness, ordering, variation.
pub fn check_input(input: &ForecastInput) -> Result<(), FitError> {
    if input.len() < 2 {
        return Err(FitError::TooFewPoints { found: input.len() });
    }
    if let Some(index) = input.values().iter().position(|v| !v.is_finite()) {
        return Err(FitError::NonFiniteValue { index });
    }
    if let Some(index) = input
        .timestamps()
        .windows(2)
        .position(|w| w[1] <= w[0])
    {
        return Err(FitError::UnorderedTimestamps { index: index + 1 });
    }
    let first = input.values()[0];
    if input.values().iter().all(|v| *v == first) {
        return Err(FitError::ConstantSeries);
    }
    Ok(())
}
