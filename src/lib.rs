//! Coinbase OHLCV history downloader
//!
//! Pages through the Coinbase Exchange candle endpoint for a trading pair,
//! respects the per-request candle cap and rate limits, and writes the merged
//! history to one Snappy-compressed Parquet file per pair.
//!
//! # Example
//! ```no_run
//! use chrono::Utc;
//! use coinbase_ohlcv::coinbase::CoinbaseClient;
//! use coinbase_ohlcv::fetch::{self, FetchOptions};
//! use coinbase_ohlcv::types::{parse_date_utc, Symbol};
//! use coinbase_ohlcv::writer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = CoinbaseClient::new();
//!     let symbol = Symbol::new("BTC-USD");
//!     let start = parse_date_utc("2024-01-01")?;
//!     let candles =
//!         fetch::fetch_pair(&client, &symbol, start, Utc::now(), &FetchOptions::default())
//!             .await?;
//!     writer::write_parquet(&candles, std::path::Path::new("data/BTC-USD.parquet"))?;
//!     Ok(())
//! }
//! ```

pub mod coinbase;
pub mod config;
pub mod fetch;
pub mod types;
pub mod windows;
pub mod writer;

pub use coinbase::CoinbaseClient;
pub use types::{Candle, Granularity, Symbol};
