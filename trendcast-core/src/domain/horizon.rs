//! Forecast horizon: years chosen by the user, converted to calendar days.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Average calendar-year length used for the years → days conversion.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Largest horizon accepted anywhere in the pipeline.
pub const MAX_HORIZON_YEARS: f64 = 15.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HorizonError {
    #[error("horizon must be a finite number of years, got {0}")]
    NotFinite(f64),

    #[error("horizon must be between 0 and {max} years, got {years}")]
    OutOfRange { years: f64, max: f64 },
}

/// A forecast horizon in (possibly fractional) years.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Horizon {
    years: f64,
}

impl Horizon {
    pub fn from_years(years: f64) -> Result<Self, HorizonError> {
        if !years.is_finite() {
            return Err(HorizonError::NotFinite(years));
        }
        if !(0.0..=MAX_HORIZON_YEARS).contains(&years) {
            return Err(HorizonError::OutOfRange {
                years,
                max: MAX_HORIZON_YEARS,
            });
        }
        Ok(Self { years })
    }

    pub fn years(&self) -> f64 {
        self.years
    }

    /// Number of calendar days to forecast: `round(years * 365.25)`.
    pub fn days(&self) -> usize {
        (self.years * DAYS_PER_YEAR).round() as usize
    }
}

impl TryFrom<f64> for Horizon {
    type Error = HorizonError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_years(value)
    }
}

impl From<Horizon> for f64 {
    fn from(value: Horizon) -> Self {
        value.years
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_years_round_to_calendar_days() {
        assert_eq!(Horizon::from_years(0.0).unwrap().days(), 0);
        assert_eq!(Horizon::from_years(1.0).unwrap().days(), 365);
        assert_eq!(Horizon::from_years(2.0).unwrap().days(), 731);
        assert_eq!(Horizon::from_years(4.0).unwrap().days(), 1461);
    }

    #[test]
    fn fractional_years() {
        assert_eq!(Horizon::from_years(0.1).unwrap().days(), 37);
        assert_eq!(Horizon::from_years(15.0).unwrap().days(), 5479);
    }

    #[test]
    fn rejects_negative_and_nan() {
        assert!(matches!(
            Horizon::from_years(-1.0),
            Err(HorizonError::OutOfRange { .. })
        ));
        assert!(matches!(
            Horizon::from_years(f64::NAN),
            Err(HorizonError::NotFinite(_))
        ));
        assert!(Horizon::from_years(15.5).is_err());
    }
}
