//! HTTP client for the Coinbase Exchange candle endpoint
//!
//! Public market data only, no API key required.
//!
//! # Example
//! ```no_run
//! use chrono::{Duration, Utc};
//! use coinbase_ohlcv::coinbase::CoinbaseClient;
//! use coinbase_ohlcv::windows::Window;
//! use coinbase_ohlcv::{Granularity, Symbol};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = CoinbaseClient::new();
//!     let end = Utc::now();
//!     let window = Window { start: end - Duration::hours(1), end };
//!     let candles = client
//!         .get_candles(&Symbol::new("BTC-USD"), &window, Granularity::OneMinute)
//!         .await?;
//!     println!("Fetched {} candles", candles.len());
//!     Ok(())
//! }
//! ```

use chrono::Duration;
use reqwest::Client;
use std::time::Duration as StdDuration;
use tracing::debug;

use super::types::parse_candles;
use crate::fetch::{CandleSource, FetchError};
use crate::types::{Candle, Granularity, Symbol};
use crate::windows::Window;

/// Base URL for the Coinbase Exchange API
pub const COINBASE_API_BASE: &str = "https://api.exchange.coinbase.com";

/// Coinbase Exchange API client
#[derive(Debug, Clone)]
pub struct CoinbaseClient {
    client: Client,
    base_url: String,
}

impl Default for CoinbaseClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CoinbaseClient {
    /// Create a new client against the public Coinbase Exchange API
    pub fn new() -> Self {
        Self::with_base_url(COINBASE_API_BASE)
    }

    /// Create a client against a custom base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(30))
            .user_agent(concat!("coinbase-ohlcv/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");

        CoinbaseClient {
            client,
            base_url: base_url.into(),
        }
    }

    /// Fetch the candles for one request window.
    ///
    /// Returns rows in exchange order (newest first).
    pub async fn get_candles(
        &self,
        product: &Symbol,
        window: &Window,
        granularity: Granularity,
    ) -> Result<Vec<Candle>, FetchError> {
        let url = format!("{}/products/{}/candles", self.base_url, product);
        let request_end = request_end(window, granularity);

        let params = [
            ("start", window.start.to_rfc3339()),
            ("end", request_end.to_rfc3339()),
            ("granularity", granularity.as_secs().to_string()),
        ];

        debug!(
            product = %product,
            start = %window.start,
            end = %window.end,
            granularity = %granularity,
            "requesting candles"
        );

        let response = self.client.get(&url).query(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Http { status, body });
        }

        let rows: Vec<Vec<serde_json::Value>> = response
            .json()
            .await
            .map_err(|e| FetchError::Payload(e.to_string()))?;

        parse_candles(&rows)
    }
}

/// Inclusive end timestamp for one window request.
///
/// Coinbase treats the start/end parameters as inclusive bucket timestamps,
/// so the request ends one bucket before `window.end` to keep adjacent
/// windows disjoint. A tail window shorter than one bucket clamps to
/// `[start, start]` so the query never carries start after end.
fn request_end(window: &Window, granularity: Granularity) -> chrono::DateTime<chrono::Utc> {
    (window.end - Duration::seconds(granularity.as_secs())).max(window.start)
}

impl CandleSource for CoinbaseClient {
    async fn candles(
        &self,
        product: &Symbol,
        window: &Window,
        granularity: Granularity,
    ) -> Result<Vec<Candle>, FetchError> {
        self.get_candles(product, window, granularity).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::parse_date_utc;

    #[test]
    fn test_request_end_one_bucket_before_window_end() {
        let window = Window {
            start: parse_date_utc("2021-01-01").unwrap(),
            end: parse_date_utc("2021-01-02").unwrap(),
        };
        let end = request_end(&window, Granularity::OneHour);
        assert_eq!(end, window.end - Duration::hours(1));
    }

    #[test]
    fn test_request_end_clamps_sub_bucket_tail_window() {
        // A same-day daily fetch plans a window shorter than one bucket;
        // the request must still have start <= end.
        let start = parse_date_utc("2026-08-28").unwrap();
        let window = Window {
            start,
            end: start + Duration::hours(10),
        };
        let end = request_end(&window, Granularity::OneDay);
        assert_eq!(end, window.start);
    }

    /// Serve one canned HTTP response and hand back the raw request
    async fn one_shot_server(body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();

            String::from_utf8_lossy(&request).into_owned()
        });

        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn test_get_candles_parses_served_rows() {
        let body = r#"[[1609459260,99.0,105.0,100.0,102.0,12.5],[1609459200,98.0,104.0,99.5,101.0,11.0]]"#;
        let (base_url, server) = one_shot_server(body).await;

        let start = parse_date_utc("2021-01-01").unwrap();
        let window = Window {
            start,
            end: start + Duration::minutes(2),
        };

        let client = CoinbaseClient::with_base_url(base_url);
        let candles = client
            .get_candles(&Symbol::new("BTC-USD"), &window, Granularity::OneMinute)
            .await
            .unwrap();

        // Exchange order preserved (newest first), fields mapped positionally
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].time, 1609459260);
        assert_eq!(candles[0].low, 99.0);
        assert_eq!(candles[0].close, 102.0);
        assert_eq!(candles[1].time, 1609459200);
        assert_eq!(candles[1].volume, 11.0);

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /products/BTC-USD/candles?"));
        assert!(request.contains("granularity=60"));
    }

    #[tokio::test]
    async fn test_get_candles_surfaces_http_error() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 429 Too Many Requests\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let start = parse_date_utc("2021-01-01").unwrap();
        let window = Window {
            start,
            end: start + Duration::minutes(2),
        };

        let client = CoinbaseClient::with_base_url(format!("http://{addr}"));
        let err = client
            .get_candles(&Symbol::new("BTC-USD"), &window, Granularity::OneMinute)
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        match err {
            FetchError::Http { status, .. } => {
                assert_eq!(status, reqwest::StatusCode::TOO_MANY_REQUESTS)
            }
            other => panic!("expected HTTP error, got {other}"),
        }
    }
}
