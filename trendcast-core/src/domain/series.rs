//! Normalized daily price series and the two-column forecast input view.
//!
//! A `PriceSeries` is immutable once built: records are ascending by date,
//! unique per date, and inside the resolved window. Refreshing data means
//! building a new series, never mutating an existing one.

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ticker::TickerSymbol;

/// One normalized daily OHLCV record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: u64,
}

/// Inclusive date window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Returns `None` when `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Where a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    Synthetic,
    Fixture,
}

impl DataSource {
    pub fn label(self) -> &'static str {
        match self {
            DataSource::YahooFinance => "yahoo_finance",
            DataSource::Synthetic => "synthetic",
            DataSource::Fixture => "fixture",
        }
    }
}

/// Header naming used when a series is shown or exported as a table.
///
/// Internally the canonical snake_case names are always used; this only
/// changes the labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSchema {
    /// `date, open, high, low, close, adj_close, volume`
    #[default]
    Canonical,
    /// `Date, Open, High, Low, Close, Adj Close, Volume`
    Provider,
}

impl ColumnSchema {
    pub fn headers(self) -> [&'static str; 7] {
        match self {
            ColumnSchema::Canonical => [
                "date",
                "open",
                "high",
                "low",
                "close",
                "adj_close",
                "volume",
            ],
            ColumnSchema::Provider => [
                "Date",
                "Open",
                "High",
                "Low",
                "Close",
                "Adj Close",
                "Volume",
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("records not strictly ascending at index {index} ({date})")]
    NotAscending { index: usize, date: NaiveDate },

    #[error("record dated {date} lies outside window {start}..={end}")]
    OutsideWindow {
        date: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    },
}

/// A normalized, immutable daily price series for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: TickerSymbol,
    window: DateWindow,
    source: DataSource,
    records: Vec<PriceRecord>,
}

impl PriceSeries {
    /// Build a series, checking ordering, uniqueness and window membership.
    pub fn new(
        ticker: TickerSymbol,
        window: DateWindow,
        source: DataSource,
        records: Vec<PriceRecord>,
    ) -> Result<Self, SeriesError> {
        for (i, pair) in records.windows(2).enumerate() {
            if pair[1].date <= pair[0].date {
                return Err(SeriesError::NotAscending {
                    index: i + 1,
                    date: pair[1].date,
                });
            }
        }
        if let Some(r) = records.iter().find(|r| !window.contains(r.date)) {
            return Err(SeriesError::OutsideWindow {
                date: r.date,
                start: window.start,
                end: window.end,
            });
        }
        Ok(Self {
            ticker,
            window,
            source,
            records,
        })
    }

    pub fn ticker(&self) -> &TickerSymbol {
        &self.ticker
    }

    pub fn window(&self) -> DateWindow {
        self.window
    }

    pub fn source(&self) -> DataSource {
        self.source
    }

    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.records.iter().map(|r| r.date).collect()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.open).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.close).collect()
    }

    /// First `n` records (fewer if the series is shorter).
    pub fn head(&self, n: usize) -> &[PriceRecord] {
        &self.records[..n.min(self.records.len())]
    }

    /// Last `n` records (fewer if the series is shorter).
    pub fn tail(&self, n: usize) -> &[PriceRecord] {
        let start = self.records.len().saturating_sub(n);
        &self.records[start..]
    }

    /// Project to the `(timestamp, value)` contract: date and close, nothing else.
    pub fn forecast_input(&self) -> ForecastInput {
        ForecastInput {
            timestamps: self.dates(),
            values: self.closes(),
        }
    }

    /// BLAKE3 hash over ticker, window and every record field.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.ticker.as_str().as_bytes());
        hasher.update(self.window.start.to_string().as_bytes());
        hasher.update(self.window.end.to_string().as_bytes());
        for r in &self.records {
            hasher.update(r.date.to_string().as_bytes());
            hasher.update(&r.open.to_le_bytes());
            hasher.update(&r.high.to_le_bytes());
            hasher.update(&r.low.to_le_bytes());
            hasher.update(&r.close.to_le_bytes());
            hasher.update(&r.adj_close.to_le_bytes());
            hasher.update(&r.volume.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Tabular view of the series with headers named per `schema`.
    pub fn to_dataframe(&self, schema: ColumnSchema) -> PolarsResult<DataFrame> {
        let [date, open, high, low, close, adj_close, volume] = schema.headers();
        let epoch = unix_epoch();
        let dates: Vec<i32> = self
            .records
            .iter()
            .map(|r| (r.date - epoch).num_days() as i32)
            .collect();

        DataFrame::new(vec![
            Column::new(date.into(), dates).cast(&DataType::Date)?,
            Column::new(open.into(), self.opens()),
            Column::new(
                high.into(),
                self.records.iter().map(|r| r.high).collect::<Vec<f64>>(),
            ),
            Column::new(
                low.into(),
                self.records.iter().map(|r| r.low).collect::<Vec<f64>>(),
            ),
            Column::new(close.into(), self.closes()),
            Column::new(
                adj_close.into(),
                self.records.iter().map(|r| r.adj_close).collect::<Vec<f64>>(),
            ),
            Column::new(
                volume.into(),
                self.records.iter().map(|r| r.volume).collect::<Vec<u64>>(),
            ),
        ])
    }
}

/// Two-column view consumed by forecasting models.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastInput {
    timestamps: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl ForecastInput {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (NaiveDate, f64)>) -> Self {
        let (timestamps, values) = pairs.into_iter().unzip();
        Self { timestamps, values }
    }

    pub fn timestamps(&self) -> &[NaiveDate] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// `ds` / `y` frame, the column names forecasting libraries expect.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let epoch = unix_epoch();
        let ds: Vec<i32> = self
            .timestamps
            .iter()
            .map(|d| (*d - epoch).num_days() as i32)
            .collect();
        DataFrame::new(vec![
            Column::new("ds".into(), ds).cast(&DataType::Date)?,
            Column::new("y".into(), self.values.clone()),
        ])
    }
}

pub(crate) fn unix_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}
