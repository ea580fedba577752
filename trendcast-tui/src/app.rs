//! Application state: single-owner, main-thread only.
//!
//! All TUI state lives here. The worker thread communicates via channels.

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, Sender};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use trendcast_core::domain::{Horizon, TickerSymbol};
use trendcast_runner::{PipelineConfig, PipelineOutcome, STATUS_LOADING};

use crate::worker::{WorkerCommand, WorkerResponse};

const ERROR_HISTORY_CAP: usize = 50;

/// Which panel is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Panel {
    Select,
    Data,
    Chart,
    Forecast,
    Components,
    Help,
}

impl Panel {
    pub const ALL: [Panel; 6] = [
        Panel::Select,
        Panel::Data,
        Panel::Chart,
        Panel::Forecast,
        Panel::Components,
        Panel::Help,
    ];

    pub fn index(self) -> usize {
        match self {
            Panel::Select => 0,
            Panel::Data => 1,
            Panel::Chart => 2,
            Panel::Forecast => 3,
            Panel::Components => 4,
            Panel::Help => 5,
        }
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Panel::Select => "Select",
            Panel::Data => "Data",
            Panel::Chart => "Chart",
            Panel::Forecast => "Forecast",
            Panel::Components => "Components",
            Panel::Help => "Help",
        }
    }

    pub fn next(self) -> Panel {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Panel {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Status message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// Error category for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Data,
    Forecast,
    Config,
}

impl ErrorCategory {
    pub fn label(self) -> &'static str {
        match self {
            ErrorCategory::Data => "DATA",
            ErrorCategory::Forecast => "FCST",
            ErrorCategory::Config => "CONF",
        }
    }
}

/// An error record for the error history overlay.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub timestamp: NaiveDateTime,
    pub category: ErrorCategory,
    pub message: String,
    pub context: String,
}

/// Ticker list cursor and horizon slider value.
#[derive(Debug, Clone)]
pub struct SelectState {
    pub tickers: Vec<TickerSymbol>,
    pub cursor: usize,
    pub years: f64,
}

impl SelectState {
    pub fn selected(&self) -> Option<&TickerSymbol> {
        self.tickers.get(self.cursor)
    }

    pub fn select(&mut self, ticker: &str) -> bool {
        match self.tickers.iter().position(|t| t.as_str() == ticker) {
            Some(i) => {
                self.cursor = i;
                true
            }
            None => false,
        }
    }
}

/// Visible slice of the price chart, as a span of points counted back from
/// the last observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeWindow {
    /// `None` shows the full series.
    span: Option<usize>,
    /// Points between the window's right edge and the last observation.
    offset: usize,
}

impl RangeWindow {
    pub const MIN_SPAN: usize = 10;

    /// Half-open index range `[start, end)` into a series of length `n`.
    pub fn bounds(&self, n: usize) -> (usize, usize) {
        if n == 0 {
            return (0, 0);
        }
        let span = self.span_for(n);
        let end = n - self.offset.min(n - span);
        (end - span, end)
    }

    pub fn is_full(&self) -> bool {
        self.span.is_none()
    }

    fn span_for(&self, n: usize) -> usize {
        self.span.unwrap_or(n).clamp(Self::MIN_SPAN.min(n), n)
    }

    pub fn zoom_in(&mut self, n: usize) {
        let span = (self.span_for(n) / 2).max(Self::MIN_SPAN.min(n));
        self.span = Some(span);
        self.clamp(n);
    }

    pub fn zoom_out(&mut self, n: usize) {
        let span = self.span_for(n).saturating_mul(2);
        if span >= n {
            self.reset();
        } else {
            self.span = Some(span);
            self.clamp(n);
        }
    }

    /// Move a quarter window towards older data.
    pub fn pan_back(&mut self, n: usize) {
        let step = (self.span_for(n) / 4).max(1);
        self.offset += step;
        self.clamp(n);
    }

    /// Move a quarter window towards newer data.
    pub fn pan_forward(&mut self, n: usize) {
        let step = (self.span_for(n) / 4).max(1);
        self.offset = self.offset.saturating_sub(step);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn clamp(&mut self, n: usize) {
        self.offset = self.offset.min(n.saturating_sub(self.span_for(n)));
    }
}

/// Chart panel toggles.
#[derive(Debug, Clone, Copy)]
pub struct ChartState {
    pub window: RangeWindow,
    pub show_open: bool,
    pub show_close: bool,
}

impl Default for ChartState {
    fn default() -> Self {
        Self {
            window: RangeWindow::default(),
            show_open: true,
            show_close: true,
        }
    }
}

/// Which overlay (if any) is shown on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    None,
    Welcome,
    ErrorHistory,
}

/// Top-level application state.
pub struct AppState {
    // Navigation
    pub active_panel: Panel,
    pub running: bool,

    // Configuration
    pub config: PipelineConfig,

    // Panel states
    pub select: SelectState,
    pub chart: ChartState,
    pub data_scroll: usize,

    // Last completed run
    pub outcome: Option<PipelineOutcome>,
    pub outcome_ticker: Option<TickerSymbol>,
    pub outcome_horizon: Option<Horizon>,
    pub loading: bool,
    pub cache_hits: u64,

    // Worker communication
    pub worker_tx: Sender<WorkerCommand>,
    pub worker_rx: Receiver<WorkerResponse>,
    next_request: u64,
    latest_request: u64,

    // Cross-cutting
    pub status_message: Option<(String, StatusLevel)>,
    pub error_history: VecDeque<ErrorRecord>,
    pub error_scroll: usize,
    pub overlay: Overlay,
}

impl AppState {
    pub fn new(
        config: PipelineConfig,
        tickers: Vec<TickerSymbol>,
        worker_tx: Sender<WorkerCommand>,
        worker_rx: Receiver<WorkerResponse>,
    ) -> Self {
        let years = config.horizon.default_years;
        Self {
            active_panel: Panel::Select,
            running: true,
            config,
            select: SelectState {
                tickers,
                cursor: 0,
                years,
            },
            chart: ChartState::default(),
            data_scroll: 0,
            outcome: None,
            outcome_ticker: None,
            outcome_horizon: None,
            loading: false,
            cache_hits: 0,
            worker_tx,
            worker_rx,
            next_request: 1,
            latest_request: 0,
            status_message: None,
            error_history: VecDeque::with_capacity(ERROR_HISTORY_CAP),
            error_scroll: 0,
            overlay: Overlay::None,
        }
    }

    /// Queue a pipeline run for the selected ticker and slider value.
    pub fn request_run(&mut self) {
        let Some(ticker) = self.select.selected().cloned() else {
            self.set_warning("No ticker selected");
            return;
        };
        let horizon = match self.config.horizon.horizon(self.select.years) {
            Ok(h) => h,
            Err(e) => {
                self.push_error(ErrorCategory::Config, e.to_string(), ticker.to_string());
                return;
            }
        };
        let request_id = self.next_request;
        self.next_request += 1;
        let cmd = WorkerCommand::Run {
            request_id,
            ticker,
            horizon,
        };
        if self.worker_tx.send(cmd).is_err() {
            self.push_error(
                ErrorCategory::Data,
                "worker thread is gone".into(),
                String::new(),
            );
            return;
        }
        self.latest_request = request_id;
        self.loading = true;
        self.set_status(STATUS_LOADING);
    }

    /// Drop the selected ticker's cached series and rerun.
    pub fn refresh(&mut self) {
        if let Some(ticker) = self.select.selected().cloned() {
            let _ = self.worker_tx.send(WorkerCommand::Invalidate { ticker });
        }
        self.request_run();
    }

    pub fn handle_response(&mut self, resp: WorkerResponse) {
        match resp {
            WorkerResponse::Started { request_id, ticker } => {
                if request_id == self.latest_request {
                    self.set_status(format!("{STATUS_LOADING} ({ticker})"));
                }
            }
            WorkerResponse::Finished {
                request_id,
                ticker,
                horizon,
                outcome,
                cache_hits,
            } => {
                self.cache_hits = cache_hits;
                // a newer request is queued behind this one
                if request_id != self.latest_request {
                    return;
                }
                self.loading = false;
                self.apply_outcome(ticker, horizon, *outcome);
            }
        }
    }

    fn apply_outcome(&mut self, ticker: TickerSymbol, horizon: Horizon, outcome: PipelineOutcome) {
        let ticker_changed = self.outcome_ticker.as_ref() != Some(&ticker);
        match &outcome {
            PipelineOutcome::Ready { series, .. } => {
                self.set_status(format!(
                    "{} {} rows, {} day forecast",
                    outcome.load_status(),
                    series.len(),
                    horizon.days()
                ));
            }
            PipelineOutcome::NoData { reason, .. } => {
                self.push_error(ErrorCategory::Data, reason.to_string(), ticker.to_string());
                self.status_message =
                    Some((outcome.load_status().to_string(), StatusLevel::Error));
            }
            PipelineOutcome::ForecastFailed { error, .. } => {
                self.push_error(ErrorCategory::Forecast, error.to_string(), ticker.to_string());
            }
        }
        if ticker_changed {
            self.chart.window.reset();
            self.data_scroll = 0;
        }
        self.outcome = Some(outcome);
        self.outcome_ticker = Some(ticker);
        self.outcome_horizon = Some(horizon);
    }

    /// Push an error to the history, capping at 50.
    pub fn push_error(&mut self, category: ErrorCategory, message: String, context: String) {
        let record = ErrorRecord {
            timestamp: chrono::Local::now().naive_local(),
            category,
            message: message.clone(),
            context,
        };
        self.error_history.push_front(record);
        if self.error_history.len() > ERROR_HISTORY_CAP {
            self.error_history.pop_back();
        }
        self.status_message = Some((message, StatusLevel::Error));
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Info));
    }

    pub fn set_warning(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Warning));
    }

    /// Length of the series shown by the price chart.
    pub fn series_len(&self) -> usize {
        self.outcome
            .as_ref()
            .and_then(|o| o.series())
            .map_or(0, |s| s.len())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Arc;

    use trendcast_core::data::FetchError;
    use trendcast_core::domain::{DataSource, DateWindow, PriceRecord, PriceSeries};

    pub(crate) fn test_app() -> (AppState, Receiver<WorkerCommand>, Sender<WorkerResponse>) {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        let config = PipelineConfig::default();
        let tickers = config.ticker_symbols().unwrap();
        (AppState::new(config, tickers, cmd_tx, resp_rx), cmd_rx, resp_tx)
    }

    pub(crate) fn series(n: u32) -> Arc<PriceSeries> {
        let start = chrono::NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let records = (0..n)
            .map(|i| PriceRecord {
                date: start + chrono::Duration::days(i as i64),
                open: 10.0 + i as f64,
                high: 12.0 + i as f64,
                low: 9.0 + i as f64,
                close: 11.0 + i as f64,
                adj_close: 11.0 + i as f64,
                volume: 100,
            })
            .collect();
        Arc::new(
            PriceSeries::new(
                TickerSymbol::new("GOOG").unwrap(),
                DateWindow::new(start, start + chrono::Duration::days(n as i64)).unwrap(),
                DataSource::Fixture,
                records,
            )
            .unwrap(),
        )
    }

    #[test]
    fn panel_cycle() {
        assert_eq!(Panel::Select.next(), Panel::Data);
        assert_eq!(Panel::Help.next(), Panel::Select);
        assert_eq!(Panel::Select.prev(), Panel::Help);
        assert_eq!(Panel::Data.prev(), Panel::Select);
    }

    #[test]
    fn panel_from_index() {
        for i in 0..6 {
            let p = Panel::from_index(i).unwrap();
            assert_eq!(p.index(), i);
        }
        assert!(Panel::from_index(6).is_none());
    }

    #[test]
    fn error_history_caps_at_50() {
        let (mut app, _rx, _tx) = test_app();
        for i in 0..60 {
            app.push_error(ErrorCategory::Data, format!("error {i}"), String::new());
        }
        assert_eq!(app.error_history.len(), 50);
        assert!(app.error_history[0].message.contains("59"));
    }

    #[test]
    fn request_run_sends_selected_ticker_and_horizon() {
        let (mut app, rx, _tx) = test_app();
        app.select.cursor = 1;
        app.select.years = 3.0;
        app.request_run();

        assert!(app.loading);
        match rx.try_recv().unwrap() {
            WorkerCommand::Run {
                request_id,
                ticker,
                horizon,
            } => {
                assert_eq!(request_id, 1);
                assert_eq!(ticker.as_str(), "AAPL");
                assert_eq!(horizon.days(), 1096);
            }
            other => panic!("expected Run, got {other:?}"),
        }
    }

    #[test]
    fn stale_responses_are_ignored() {
        let (mut app, _rx, _tx) = test_app();
        app.request_run();
        app.request_run();
        let ticker = TickerSymbol::new("GOOG").unwrap();
        let horizon = Horizon::from_years(1.0).unwrap();

        app.handle_response(WorkerResponse::Finished {
            request_id: 1,
            ticker: ticker.clone(),
            horizon,
            outcome: Box::new(PipelineOutcome::NoData {
                ticker: ticker.clone(),
                reason: FetchError::SymbolNotFound {
                    symbol: "GOOG".into(),
                },
            }),
            cache_hits: 0,
        });
        assert!(app.loading);
        assert!(app.outcome.is_none());

        app.handle_response(WorkerResponse::Finished {
            request_id: 2,
            ticker: ticker.clone(),
            horizon,
            outcome: Box::new(PipelineOutcome::NoData {
                ticker,
                reason: FetchError::SymbolNotFound {
                    symbol: "GOOG".into(),
                },
            }),
            cache_hits: 3,
        });
        assert!(!app.loading);
        assert_eq!(app.cache_hits, 3);
        assert!(app.outcome.as_ref().unwrap().is_no_data());
        assert_eq!(app.error_history.len(), 1);
        assert_eq!(
            app.status_message,
            Some(("Loading data... failed!".to_string(), StatusLevel::Error))
        );
    }

    #[test]
    fn range_window_zoom_and_pan() {
        let n = 100;
        let mut w = RangeWindow::default();
        assert_eq!(w.bounds(n), (0, 100));

        w.zoom_in(n);
        assert_eq!(w.bounds(n), (50, 100));
        w.pan_back(n);
        assert_eq!(w.bounds(n), (38, 88));
        w.pan_forward(n);
        assert_eq!(w.bounds(n), (50, 100));

        for _ in 0..10 {
            w.zoom_in(n);
        }
        assert_eq!(w.bounds(n), (90, 100));
        for _ in 0..50 {
            w.pan_back(n);
        }
        assert_eq!(w.bounds(n), (0, 10));

        w.zoom_out(n);
        w.zoom_out(n);
        w.zoom_out(n);
        w.zoom_out(n);
        assert!(w.is_full());
        assert_eq!(w.bounds(n), (0, 100));
    }

    #[test]
    fn range_window_handles_short_series() {
        let mut w = RangeWindow::default();
        assert_eq!(w.bounds(0), (0, 0));
        w.zoom_in(4);
        assert_eq!(w.bounds(4), (0, 4));
        w.pan_back(4);
        assert_eq!(w.bounds(4), (0, 4));
    }

    proptest::proptest! {
        #[test]
        fn range_window_stays_inside_series(
            n in 0usize..500,
            ops in proptest::collection::vec(0u8..5, 0..40),
        ) {
            let mut w = RangeWindow::default();
            for op in ops {
                match op {
                    0 => w.zoom_in(n),
                    1 => w.zoom_out(n),
                    2 => w.pan_back(n),
                    3 => w.pan_forward(n),
                    _ => w.reset(),
                }
                let (start, end) = w.bounds(n);
                proptest::prop_assert!(start <= end && end <= n);
                proptest::prop_assert!(end - start >= RangeWindow::MIN_SPAN.min(n));
            }
        }
    }

    #[test]
    fn series_len_follows_outcome() {
        let (mut app, _rx, _tx) = test_app();
        assert_eq!(app.series_len(), 0);
        app.outcome = Some(PipelineOutcome::ForecastFailed {
            series: series(12),
            error: trendcast_core::forecast::FitError::ConstantSeries,
        });
        assert_eq!(app.series_len(), 12);
    }
}
