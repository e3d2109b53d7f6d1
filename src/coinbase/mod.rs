//! Coinbase Exchange API client for public candle (OHLCV) data

pub mod client;
pub mod types;

pub use client::CoinbaseClient;
