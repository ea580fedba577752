//! Domain types: tickers, price series, forecast input view, horizons.

pub mod horizon;
pub mod series;
pub mod ticker;

pub use horizon::{Horizon, HorizonError, DAYS_PER_YEAR, MAX_HORIZON_YEARS};
pub use series::{
    ColumnSchema, DataSource, DateWindow, ForecastInput, PriceRecord, PriceSeries, SeriesError,
};
pub use ticker::{EmptyTicker, TickerSymbol};
