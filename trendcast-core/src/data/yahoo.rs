//! Yahoo Finance data provider.
//!
//! Talks to the v8 chart API for daily OHLCV bars and for the earliest
//! available trading date. Retries transient failures with exponential
//! backoff and shares a circuit breaker across requests.
//!
//! There is no official API behind this endpoint; the response shape can
//! change without notice, which surfaces as `ResponseFormatChanged`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use tracing::{debug, warn};

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataProvider, FetchError, FetchResult, RawBar};
use crate::domain::series::DataSource;

const CHART_BASE: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    first_trade_date: Option<i64>,
    /// Exchange offset from UTC in seconds; bars are stamped at the local open.
    gmtoffset: Option<i64>,
}

impl ChartMeta {
    fn offset_of(meta: Option<&ChartMeta>) -> i64 {
        meta.and_then(|m| m.gmtoffset).unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    base_url: String,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooProvider {
    /// Build a provider with a 30 s request timeout, 3 retries and a 500 ms
    /// backoff base.
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| FetchError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            base_url: CHART_BASE.to_string(),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    /// Point the provider at another chart endpoint (a mirror or a local stub).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn history_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        // period2 is exclusive upstream; push it to the end of `end`.
        let end_ts = start_ts + (end - start).num_days() * 86_400 + 86_399;
        format!(
            "{}/{symbol}?period1={start_ts}&period2={end_ts}&interval=1d\
             &includeAdjustedClose=true",
            self.base_url
        )
    }

    fn earliest_url(&self, symbol: &str) -> String {
        format!("{}/{symbol}?range=max&interval=1mo", self.base_url)
    }

    fn unwrap_result(symbol: &str, resp: ChartResponse) -> Result<ChartData, FetchError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => FetchError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Some(err) => {
                FetchError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => FetchError::ResponseFormatChanged("empty result with no error".into()),
        })?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::ResponseFormatChanged("result array is empty".into()))
    }

    fn date_of(ts: i64) -> Result<NaiveDate, FetchError> {
        DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| FetchError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))
    }

    /// Bars from a chart response. An absent timestamp array means the
    /// window holds no trading days and yields an empty vector.
    fn parse_bars(symbol: &str, resp: ChartResponse) -> Result<Vec<RawBar>, FetchError> {
        let data = Self::unwrap_result(symbol, resp)?;
        let offset = ChartMeta::offset_of(data.meta.as_ref());
        let Some(timestamps) = data.timestamp else {
            return Ok(Vec::new());
        };

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::ResponseFormatChanged("no quote data".into()))?;
        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let open = quote.open.get(i).copied().flatten();
            let high = quote.high.get(i).copied().flatten();
            let low = quote.low.get(i).copied().flatten();
            let close = quote.close.get(i).copied().flatten();
            let volume = quote.volume.get(i).copied().flatten();

            // Holidays come back as all-null rows.
            if open.is_none() && high.is_none() && low.is_none() && close.is_none() {
                continue;
            }

            let close = close.unwrap_or(f64::NAN);
            let adj_close = adj_closes
                .as_ref()
                .and_then(|v| v.get(i).copied().flatten())
                .unwrap_or(close);

            bars.push(RawBar {
                date: Self::date_of(ts + offset)?,
                open: open.unwrap_or(f64::NAN),
                high: high.unwrap_or(f64::NAN),
                low: low.unwrap_or(f64::NAN),
                close,
                volume: volume.unwrap_or(0),
                adj_close,
            });
        }
        Ok(bars)
    }

    /// `meta.firstTradeDate`, falling back to the first returned timestamp.
    fn parse_earliest(symbol: &str, resp: ChartResponse) -> Result<NaiveDate, FetchError> {
        let data = Self::unwrap_result(symbol, resp)?;
        let offset = ChartMeta::offset_of(data.meta.as_ref());
        let first = data
            .meta
            .and_then(|m| m.first_trade_date)
            .or_else(|| data.timestamp.and_then(|ts| ts.first().copied()))
            .ok_or_else(|| FetchError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;
        Self::date_of(first + offset)
    }

    /// One GET with retry, backoff and circuit breaker bookkeeping.
    fn get_chart(&self, symbol: &str, url: &str) -> Result<ChartResponse, FetchError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(FetchError::CircuitBreakerTripped);
        }

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                warn!(symbol, attempt, delay_ms = delay.as_millis() as u64, "retrying provider request");
                std::thread::sleep(delay);
            }
            if !self.circuit_breaker.is_allowed() {
                return Err(FetchError::CircuitBreakerTripped);
            }

            debug!(symbol, url, "provider request");
            let resp = match self.client.get(url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    last_error = Some(FetchError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(FetchError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();
            if status == reqwest::StatusCode::FORBIDDEN {
                self.circuit_breaker.trip();
                return Err(FetchError::CircuitBreakerTripped);
            }
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(FetchError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(FetchError::AuthenticationRequired(
                    "Yahoo Finance requires authentication".into(),
                ));
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                // 404 still carries a chart error body naming the symbol.
                self.circuit_breaker.record_success();
                return Err(FetchError::SymbolNotFound {
                    symbol: symbol.to_string(),
                });
            }
            if !status.is_success() {
                self.circuit_breaker.record_failure();
                last_error = Some(FetchError::Other(format!("HTTP {status} for {symbol}")));
                continue;
            }

            let chart: ChartResponse = resp.json().map_err(|e| {
                FetchError::ResponseFormatChanged(format!(
                    "failed to parse response for {symbol}: {e}"
                ))
            })?;
            self.circuit_breaker.record_success();
            return Ok(chart);
        }

        Err(last_error.unwrap_or_else(|| FetchError::Other("max retries exceeded".into())))
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, FetchError> {
        let chart = self.get_chart(symbol, &self.history_url(symbol, start, end))?;
        let bars = Self::parse_bars(symbol, chart)?;
        debug!(symbol, bars = bars.len(), "provider returned bars");
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            source: DataSource::YahooFinance,
        })
    }

    fn earliest_date(&self, symbol: &str) -> Result<NaiveDate, FetchError> {
        let chart = self.get_chart(symbol, &self.earliest_url(symbol))?;
        Self::parse_earliest(symbol, chart)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    fn parse(json: &str) -> ChartResponse {
        serde_json::from_str(json).unwrap()
    }

    const TWO_DAYS: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"firstTradeDate": 345479400},
                "timestamp": [1704205800, 1704292200, 1704378600],
                "indicators": {
                    "quote": [{
                        "open":   [187.15, null, 182.15],
                        "high":   [188.44, null, 183.09],
                        "low":    [183.89, null, 180.88],
                        "close":  [185.64, null, 181.91],
                        "volume": [82488700, null, 71983600]
                    }],
                    "adjclose": [{"adjclose": [184.73, null, 181.02]}]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn parses_bars_and_skips_null_rows() {
        let bars = YahooProvider::parse_bars("AAPL", parse(TWO_DAYS)).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[0].close, 185.64);
        assert_eq!(bars[0].adj_close, 184.73);
        assert_eq!(bars[1].volume, 71_983_600);
    }

    #[test]
    fn earliest_uses_first_trade_date() {
        let date = YahooProvider::parse_earliest("AAPL", parse(TWO_DAYS)).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(1980, 12, 12).unwrap());
    }

    #[test]
    fn earliest_falls_back_to_first_timestamp() {
        let json = r#"{"chart":{"result":[{"timestamp":[1704205800],
            "indicators":{"quote":[{"open":[1.0],"high":[1.0],"low":[1.0],"close":[1.0],"volume":[1]}]}}],
            "error":null}}"#;
        let date = YahooProvider::parse_earliest("X", parse(json)).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn not_found_maps_to_symbol_error() {
        let json = r#"{"chart":{"result":null,
            "error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = YahooProvider::parse_bars("ZZZZINVALID", parse(json)).unwrap_err();
        assert!(matches!(err, FetchError::SymbolNotFound { .. }));
    }

    #[test]
    fn window_without_trading_days_is_empty() {
        let json = r#"{"chart":{"result":[{"meta":{},"indicators":{"quote":[{}]}}],"error":null}}"#;
        let bars = YahooProvider::parse_bars("AAPL", parse(json)).unwrap();
        assert!(bars.is_empty());
    }

    #[test]
    fn history_url_covers_whole_end_day() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let url = provider(CHART_BASE, 0).history_url("AAPL", start, end);
        assert!(url.contains("period1=1704067200"));
        assert!(url.contains("period2=1704239999"));
        assert!(url.contains("interval=1d"));
    }

    #[test]
    fn earliest_url_asks_for_full_range() {
        let url = provider("http://127.0.0.1:1/chart/", 0).earliest_url("MSFT");
        assert_eq!(url, "http://127.0.0.1:1/chart/MSFT?range=max&interval=1mo");
    }

    #[test]
    fn bars_are_dated_in_exchange_time() {
        // 23:00 UTC on Jan 1 is 10:00 on Jan 2 in Sydney (UTC+11).
        let json = r#"{"chart":{"result":[{"meta":{"gmtoffset":39600},
            "timestamp":[1704150000],
            "indicators":{"quote":[{"open":[7.1],"high":[7.2],"low":[7.0],"close":[7.15],"volume":[10]}]}}],
            "error":null}}"#;
        let bars = YahooProvider::parse_bars("BHP.AX", parse(json)).unwrap();
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());

        let utc = json.replace(r#""gmtoffset":39600"#, r#""gmtoffset":0"#);
        let bars = YahooProvider::parse_bars("BHP.AX", parse(&utc)).unwrap();
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    // Local HTTP stub: answers each connection with the next canned response
    // and reports how many requests it served.
    fn serve(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<usize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}/v8/finance/chart", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let mut served = 0;
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = stream.read(&mut buf).unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                let reply = format!(
                    "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\n\
                     retry-after: 7\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(reply.as_bytes()).unwrap();
                served += 1;
            }
            served
        });
        (base, handle)
    }

    fn provider(base: &str, failure_threshold: u32) -> YahooProvider {
        let breaker = CircuitBreaker::new(Duration::from_secs(600), failure_threshold.max(1));
        let client = reqwest::blocking::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();
        YahooProvider {
            client,
            circuit_breaker: Arc::new(breaker),
            base_url: CHART_BASE.to_string(),
            max_retries: 0,
            base_delay: Duration::from_secs(1),
        }
        .with_retries(3, Duration::ZERO)
        .with_base_url(base)
    }

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn server_error_is_retried_until_success() {
        let (base, server) = serve(vec![(503, "{}"), (200, TWO_DAYS)]);
        let yahoo = provider(&base, 10);

        let result = yahoo.fetch("AAPL", jan(1), jan(5)).unwrap();
        assert_eq!(result.bars.len(), 2);
        assert_eq!(result.source, DataSource::YahooFinance);
        assert_eq!(server.join().unwrap(), 2);
        assert!(yahoo.is_available());
    }

    #[test]
    fn forbidden_trips_the_breaker() {
        let (base, server) = serve(vec![(403, "{}")]);
        let yahoo = provider(&base, 10);

        let err = yahoo.fetch("AAPL", jan(1), jan(5)).unwrap_err();
        assert!(matches!(err, FetchError::CircuitBreakerTripped));
        assert!(!yahoo.is_available());
        assert_eq!(server.join().unwrap(), 1);

        // No request leaves the process while the breaker is open.
        let err = yahoo.earliest_date("AAPL").unwrap_err();
        assert!(matches!(err, FetchError::CircuitBreakerTripped));
    }

    #[test]
    fn persistent_rate_limit_exhausts_retries() {
        let (base, server) = serve(vec![(429, "{}"); 4]);
        let yahoo = provider(&base, 10);

        let err = yahoo.fetch("AAPL", jan(1), jan(5)).unwrap_err();
        assert!(matches!(
            err,
            FetchError::RateLimited {
                retry_after_secs: 7
            }
        ));
        assert_eq!(server.join().unwrap(), 4);
    }

    #[test]
    fn repeated_rate_limits_open_the_breaker() {
        let (base, server) = serve(vec![(429, "{}"); 2]);
        let yahoo = provider(&base, 2);

        let err = yahoo.fetch("AAPL", jan(1), jan(5)).unwrap_err();
        assert!(matches!(err, FetchError::CircuitBreakerTripped));
        assert!(!yahoo.is_available());
        assert_eq!(server.join().unwrap(), 2);
    }

    #[test]
    fn missing_symbol_is_not_retried() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#;
        let (base, server) = serve(vec![(404, body)]);
        let yahoo = provider(&base, 10);

        let err = yahoo.fetch("ZZZZINVALID", jan(1), jan(5)).unwrap_err();
        assert!(matches!(err, FetchError::SymbolNotFound { symbol } if symbol == "ZZZZINVALID"));
        assert_eq!(server.join().unwrap(), 1);
        assert!(yahoo.is_available());
    }
}
