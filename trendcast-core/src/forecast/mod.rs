//! Forecasting: the model seam, the additive engine and the adapter that
//! turns a price series into a forecast table.

pub mod adapter;
pub mod additive;
pub mod features;
pub mod linalg;
pub mod model;
pub mod result;
pub mod uncertainty;

pub use adapter::{forecast, future_dates};
pub use additive::{AdditiveConfig, AdditiveModel, SeasonalityMode};
pub use model::{FitError, ForecastModel};
pub use result::{ForecastPoint, ForecastResult, Prediction};
