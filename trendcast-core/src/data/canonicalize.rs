//! Normalization of raw provider bars into canonical price records.
//!
//! Bars are loaded into a polars frame (dates as day numbers since the Unix
//! epoch), filtered to the window, sorted, deduplicated keeping the first
//! occurrence of a date, and stripped of invalid prices.

use chrono::{Duration, NaiveDate};
use polars::prelude::*;

use super::provider::{FetchError, RawBar};
use crate::domain::series::{unix_epoch, DateWindow, PriceRecord};

/// Row counts before and after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NormalizeReport {
    pub raw: usize,
    pub kept: usize,
}

impl NormalizeReport {
    pub fn dropped(&self) -> usize {
        self.raw - self.kept
    }
}

pub struct Canonicalizer;

impl Canonicalizer {
    fn day_number(date: NaiveDate) -> i32 {
        (date - unix_epoch()).num_days() as i32
    }

    fn to_frame(bars: &[RawBar]) -> PolarsResult<DataFrame> {
        DataFrame::new(vec![
            Column::new(
                "date".into(),
                bars.iter().map(|b| Self::day_number(b.date)).collect::<Vec<i32>>(),
            ),
            Column::new("open".into(), bars.iter().map(|b| b.open).collect::<Vec<f64>>()),
            Column::new("high".into(), bars.iter().map(|b| b.high).collect::<Vec<f64>>()),
            Column::new("low".into(), bars.iter().map(|b| b.low).collect::<Vec<f64>>()),
            Column::new("close".into(), bars.iter().map(|b| b.close).collect::<Vec<f64>>()),
            Column::new(
                "adj_close".into(),
                bars.iter().map(|b| b.adj_close).collect::<Vec<f64>>(),
            ),
            Column::new("volume".into(), bars.iter().map(|b| b.volume).collect::<Vec<u64>>()),
        ])
    }

    /// Keep rows inside the inclusive window.
    pub fn restrict(df: LazyFrame, window: DateWindow) -> LazyFrame {
        df.filter(
            col("date")
                .gt_eq(lit(Self::day_number(window.start)))
                .and(col("date").lt_eq(lit(Self::day_number(window.end)))),
        )
    }

    /// Sort ascending by date and drop duplicate dates, first one wins.
    pub fn canonicalize(df: LazyFrame) -> LazyFrame {
        df.sort(
            ["date"],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .unique_stable(Some(vec!["date".into()]), UniqueKeepStrategy::First)
    }

    /// Drop bars with non-finite or non-positive prices, or `high < low`.
    pub fn validate(df: LazyFrame) -> LazyFrame {
        let mut valid = col("high").gt_eq(col("low"));
        for name in ["open", "high", "low", "close", "adj_close"] {
            valid = valid.and(col(name).is_finite()).and(col(name).gt(lit(0.0)));
        }
        df.filter(valid)
    }

    fn to_records(df: &DataFrame) -> PolarsResult<Vec<PriceRecord>> {
        let epoch = unix_epoch();
        let dates = df.column("date")?.i32()?;
        let open = df.column("open")?.f64()?;
        let high = df.column("high")?.f64()?;
        let low = df.column("low")?.f64()?;
        let close = df.column("close")?.f64()?;
        let adj_close = df.column("adj_close")?.f64()?;
        let volume = df.column("volume")?.u64()?;

        let mut records = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let (Some(day), Some(o), Some(h), Some(l), Some(c), Some(a)) = (
                dates.get(i),
                open.get(i),
                high.get(i),
                low.get(i),
                close.get(i),
                adj_close.get(i),
            ) else {
                continue;
            };
            records.push(PriceRecord {
                date: epoch + Duration::days(i64::from(day)),
                open: o,
                high: h,
                low: l,
                close: c,
                adj_close: a,
                volume: volume.get(i).unwrap_or(0),
            });
        }
        Ok(records)
    }

    /// Full normalization pass: window, order, uniqueness, validity.
    pub fn normalize(
        bars: &[RawBar],
        window: DateWindow,
    ) -> Result<(Vec<PriceRecord>, NormalizeReport), FetchError> {
        let run = || -> PolarsResult<Vec<PriceRecord>> {
            let lf = Self::to_frame(bars)?.lazy();
            let df = Self::validate(Self::canonicalize(Self::restrict(lf, window))).collect()?;
            Self::to_records(&df)
        };
        let records = run().map_err(|e| FetchError::Normalization(e.to_string()))?;
        let report = NormalizeReport {
            raw: bars.len(),
            kept: records.len(),
        };
        Ok((records, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn bar(date: NaiveDate, close: f64) -> RawBar {
        RawBar {
            date,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000,
            adj_close: close,
        }
    }

    fn window() -> DateWindow {
        DateWindow::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap()
    }

    #[test]
    fn sorts_ascending() {
        let bars = vec![
            bar(d(2024, 1, 4), 13.0),
            bar(d(2024, 1, 2), 11.0),
            bar(d(2024, 1, 3), 12.0),
        ];
        let (records, _) = Canonicalizer::normalize(&bars, window()).unwrap();
        let dates: Vec<_> = records.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 4)]);
    }

    #[test]
    fn duplicate_dates_keep_first() {
        let bars = vec![
            bar(d(2024, 1, 2), 10.0),
            bar(d(2024, 1, 2), 20.0),
            bar(d(2024, 1, 3), 30.0),
        ];
        let (records, report) = Canonicalizer::normalize(&bars, window()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].close, 10.0);
        assert_eq!(report.dropped(), 1);
    }

    #[test]
    fn filters_to_window_inclusive() {
        let bars = vec![
            bar(d(2023, 12, 29), 1.0),
            bar(d(2024, 1, 1), 2.0),
            bar(d(2024, 1, 31), 3.0),
            bar(d(2024, 2, 1), 4.0),
        ];
        let (records, _) = Canonicalizer::normalize(&bars, window()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, d(2024, 1, 1));
        assert_eq!(records[1].date, d(2024, 1, 31));
    }

    #[test]
    fn drops_invalid_prices() {
        let mut nan = bar(d(2024, 1, 2), 5.0);
        nan.close = f64::NAN;
        let mut inverted = bar(d(2024, 1, 3), 5.0);
        inverted.high = 1.0;
        let mut zero = bar(d(2024, 1, 4), 5.0);
        zero.open = 0.0;
        let good = bar(d(2024, 1, 5), 5.0);

        let (records, report) =
            Canonicalizer::normalize(&[nan, inverted, zero, good], window()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, d(2024, 1, 5));
        assert_eq!(report, NormalizeReport { raw: 4, kept: 1 });
    }

    #[test]
    fn empty_input_is_empty_output() {
        let (records, report) = Canonicalizer::normalize(&[], window()).unwrap();
        assert!(records.is_empty());
        assert_eq!(report.raw, 0);
    }
}
