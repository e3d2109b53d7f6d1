//! Bounded retrieval loop for one trading pair
//!
//! Plans the request windows covering a date range, pulls each window from
//! the exchange with a fixed retry budget, and merges the chunks into one
//! ascending candle series. Strictly sequential: one request in flight,
//! suspension only at network I/O and fixed rate-limit sleeps.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use chrono::{DateTime, Utc};

use crate::types::{Candle, Granularity, Symbol};
use crate::windows::{self, Window};

/// Fixed delay between window requests, under Coinbase's public rate ceiling
const REQUEST_DELAY_MS: u64 = 150;

/// Delay before a retried request
const RETRY_DELAY_MS: u64 = 1000;

/// Total attempts per window before the pair's fetch aborts
const MAX_ATTEMPTS: u32 = 3;

/// Errors from a single candle request
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("exchange returned {status}: {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed candle payload: {0}")]
    Payload(String),
}

impl FetchError {
    /// Transport and HTTP errors are transient and retried; a malformed
    /// payload aborts the pair immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transport(_) | FetchError::Http { .. })
    }
}

/// Source of candle data for one request window.
///
/// Implemented by the Coinbase client; tests swap in a mock.
pub trait CandleSource {
    fn candles(
        &self,
        product: &Symbol,
        window: &Window,
        granularity: Granularity,
    ) -> impl Future<Output = Result<Vec<Candle>, FetchError>> + Send;
}

/// Knobs for the retrieval loop
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub granularity: Granularity,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub request_delay: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            granularity: Granularity::default(),
            max_attempts: MAX_ATTEMPTS,
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
            request_delay: Duration::from_millis(REQUEST_DELAY_MS),
        }
    }
}

impl FetchOptions {
    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// Zero delays, for tests
    #[doc(hidden)]
    pub fn without_delays(mut self) -> Self {
        self.retry_delay = Duration::ZERO;
        self.request_delay = Duration::ZERO;
        self
    }
}

/// Fetch the full candle history for one pair over `[start, end)`.
///
/// Returns candles sorted ascending by time with duplicate timestamps
/// removed. An empty range is a no-op and yields an empty series. Exhausted
/// retries abort the whole pair with the last error.
pub async fn fetch_pair<S: CandleSource>(
    source: &S,
    symbol: &Symbol,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    options: &FetchOptions,
) -> Result<Vec<Candle>, FetchError> {
    let plan = windows::plan(start, end, options.granularity);

    if plan.is_empty() {
        info!(symbol = %symbol, %start, %end, "empty date range, nothing to fetch");
        return Ok(Vec::new());
    }

    info!(
        symbol = %symbol,
        %start,
        %end,
        granularity = %options.granularity,
        windows = plan.len(),
        "fetching candle history"
    );

    let mut all_candles: Vec<Candle> = Vec::new();

    for (i, window) in plan.iter().enumerate() {
        let mut chunk = request_with_retry(source, symbol, window, options).await?;

        // Exchange order is newest first
        chunk.reverse();

        debug!(
            symbol = %symbol,
            window_start = %window.start,
            window_end = %window.end,
            candles = chunk.len(),
            "window fetched"
        );

        all_candles.extend(chunk);

        // Rate limiting between windows
        if i + 1 < plan.len() && !options.request_delay.is_zero() {
            sleep(options.request_delay).await;
        }
    }

    all_candles.sort_by_key(|c| c.time);
    all_candles.dedup_by_key(|c| c.time);

    info!(symbol = %symbol, candles = all_candles.len(), "fetch complete");

    Ok(all_candles)
}

async fn request_with_retry<S: CandleSource>(
    source: &S,
    symbol: &Symbol,
    window: &Window,
    options: &FetchOptions,
) -> Result<Vec<Candle>, FetchError> {
    let mut attempt = 1;

    loop {
        match source.candles(symbol, window, options.granularity).await {
            Ok(candles) => return Ok(candles),
            Err(e) if e.is_retryable() && attempt < options.max_attempts => {
                warn!(
                    symbol = %symbol,
                    window_start = %window.start,
                    attempt,
                    "request failed, retrying: {e}"
                );
                attempt += 1;
                if !options.retry_delay.is_zero() {
                    sleep(options.retry_delay).await;
                }
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::parse_date_utc;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Mock exchange that replays a queue of canned responses
    struct MockSource {
        responses: Mutex<VecDeque<Result<Vec<Candle>, FetchError>>>,
    }

    impl MockSource {
        fn new(responses: Vec<Result<Vec<Candle>, FetchError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }

        fn remaining(&self) -> usize {
            self.responses.lock().unwrap().len()
        }
    }

    impl CandleSource for MockSource {
        async fn candles(
            &self,
            _product: &Symbol,
            _window: &Window,
            _granularity: Granularity,
        ) -> Result<Vec<Candle>, FetchError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("mock received more requests than expected")
        }
    }

    fn candle(time: i64) -> Candle {
        Candle {
            time,
            low: 99.0,
            high: 105.0,
            open: 100.0,
            close: 102.0,
            volume: 10.0,
        }
    }

    fn http_error() -> FetchError {
        FetchError::Http {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body: "upstream hiccup".to_string(),
        }
    }

    fn test_options() -> FetchOptions {
        FetchOptions::default().without_delays()
    }

    #[tokio::test]
    async fn test_empty_range_is_noop() {
        let source = MockSource::new(vec![]);
        let start = parse_date_utc("2021-01-02").unwrap();
        let end = parse_date_utc("2021-01-01").unwrap();

        let candles = fetch_pair(&source, &Symbol::new("BTC-USD"), start, end, &test_options())
            .await
            .unwrap();

        assert!(candles.is_empty());
        assert_eq!(source.remaining(), 0);
    }

    #[tokio::test]
    async fn test_adjacent_windows_merge_strictly_ascending() {
        // 600 minutes at 1m granularity: exactly two 300-candle windows
        let start = parse_date_utc("2021-01-01").unwrap();
        let end = start + chrono::Duration::minutes(600);

        // Each window responds newest-first, as the exchange does
        let first: Vec<Candle> = (0..300i64)
            .rev()
            .map(|i| candle(start.timestamp() + i * 60))
            .collect();
        let second: Vec<Candle> = (300..600i64)
            .rev()
            .map(|i| candle(start.timestamp() + i * 60))
            .collect();

        let source = MockSource::new(vec![Ok(first), Ok(second)]);
        let candles = fetch_pair(&source, &Symbol::new("BTC-USD"), start, end, &test_options())
            .await
            .unwrap();

        assert_eq!(candles.len(), 600);
        for pair in candles.windows(2) {
            assert!(pair[0].time < pair[1].time);
        }
        assert_eq!(candles[0].time, start.timestamp());
    }

    #[tokio::test]
    async fn test_duplicate_timestamps_collapse() {
        let start = parse_date_utc("2021-01-01").unwrap();
        let end = start + chrono::Duration::minutes(600);

        let boundary = start.timestamp() + 299 * 60;
        let first = vec![candle(boundary), candle(start.timestamp())];
        // Second window repeats the boundary bucket
        let second = vec![candle(boundary + 60), candle(boundary)];

        let source = MockSource::new(vec![Ok(first), Ok(second)]);
        let candles = fetch_pair(&source, &Symbol::new("BTC-USD"), start, end, &test_options())
            .await
            .unwrap();

        assert_eq!(candles.len(), 3);
        for pair in candles.windows(2) {
            assert!(pair[0].time < pair[1].time);
        }
    }

    #[tokio::test]
    async fn test_retry_succeeds_within_budget() {
        let start = parse_date_utc("2021-01-01").unwrap();
        let end = start + chrono::Duration::minutes(10);
        let fixture: Vec<Candle> = (0..10i64)
            .rev()
            .map(|i| candle(start.timestamp() + i * 60))
            .collect();

        let flaky = MockSource::new(vec![
            Err(http_error()),
            Err(http_error()),
            Ok(fixture.clone()),
        ]);
        let steady = MockSource::new(vec![Ok(fixture)]);

        let symbol = Symbol::new("ETH-USD");
        let from_flaky = fetch_pair(&flaky, &symbol, start, end, &test_options())
            .await
            .unwrap();
        let from_steady = fetch_pair(&steady, &symbol, start, end, &test_options())
            .await
            .unwrap();

        assert_eq!(from_flaky, from_steady);
        assert_eq!(flaky.remaining(), 0);
    }

    #[tokio::test]
    async fn test_retry_budget_exhausted_aborts() {
        let start = parse_date_utc("2021-01-01").unwrap();
        let end = start + chrono::Duration::minutes(10);

        let source = MockSource::new(vec![
            Err(http_error()),
            Err(http_error()),
            Err(http_error()),
        ]);

        let result = fetch_pair(&source, &Symbol::new("BTC-USD"), start, end, &test_options()).await;

        assert!(matches!(result, Err(FetchError::Http { .. })));
        assert_eq!(source.remaining(), 0);
    }

    #[tokio::test]
    async fn test_malformed_payload_not_retried() {
        let start = parse_date_utc("2021-01-01").unwrap();
        let end = start + chrono::Duration::minutes(10);

        let source = MockSource::new(vec![
            Err(FetchError::Payload("bad candle row".to_string())),
            Ok(vec![candle(start.timestamp())]),
        ]);

        let result = fetch_pair(&source, &Symbol::new("BTC-USD"), start, end, &test_options()).await;

        assert!(matches!(result, Err(FetchError::Payload(_))));
        // The queued success was never consumed
        assert_eq!(source.remaining(), 1);
    }
}
