//! Core data types used across the downloader

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors for user-supplied arguments (CLI or config file)
#[derive(Debug, Error)]
pub enum ArgError {
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("unsupported granularity '{0}', expected one of 60, 300, 900, 3600, 21600, 86400")]
    InvalidGranularity(String),
}

/// One OHLCV time bucket as returned by the exchange.
///
/// Column order matches the Coinbase candle rows and the Parquet output:
/// [time, low, high, open, close, volume]. The low <= min(open, close) and
/// high >= max(open, close) invariants are assumed from the source, not
/// checked here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket start, seconds since epoch
    pub time: i64,
    pub low: f64,
    pub high: f64,
    pub open: f64,
    pub close: f64,
    pub volume: f64,
}

/// Trading pair symbol, e.g. "BTC-USD"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        Symbol(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Output file name for this pair
    pub fn parquet_file(&self) -> String {
        format!("{}.parquet", self.0)
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Candle bucket sizes supported by the Coinbase candle endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Granularity {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    OneHour,
    SixHours,
    OneDay,
}

impl Default for Granularity {
    fn default() -> Self {
        Granularity::OneMinute
    }
}

impl Granularity {
    /// Bucket duration in seconds
    pub fn as_secs(self) -> i64 {
        match self {
            Granularity::OneMinute => 60,
            Granularity::FiveMinutes => 300,
            Granularity::FifteenMinutes => 900,
            Granularity::OneHour => 3600,
            Granularity::SixHours => 21600,
            Granularity::OneDay => 86400,
        }
    }

    pub fn from_secs(secs: i64) -> Result<Self, ArgError> {
        match secs {
            60 => Ok(Granularity::OneMinute),
            300 => Ok(Granularity::FiveMinutes),
            900 => Ok(Granularity::FifteenMinutes),
            3600 => Ok(Granularity::OneHour),
            21600 => Ok(Granularity::SixHours),
            86400 => Ok(Granularity::OneDay),
            other => Err(ArgError::InvalidGranularity(other.to_string())),
        }
    }
}

impl std::str::FromStr for Granularity {
    type Err = ArgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let secs: i64 = s
            .parse()
            .map_err(|_| ArgError::InvalidGranularity(s.to_string()))?;
        Granularity::from_secs(secs)
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_secs())
    }
}

/// Default end bound when none is given: today's UTC midnight.
///
/// Stopping at midnight keeps the range aligned to whole days, so a daily
/// fetch never asks the exchange for a partial trailing bucket.
pub fn default_end_utc() -> DateTime<Utc> {
    let midnight = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time");
    DateTime::from_naive_utc_and_offset(midnight, Utc)
}

/// Parse a YYYY-MM-DD date as UTC midnight
pub fn parse_date_utc(s: &str) -> Result<DateTime<Utc>, ArgError> {
    let date = s
        .parse::<NaiveDate>()
        .map_err(|_| ArgError::InvalidDate(s.to_string()))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ArgError::InvalidDate(s.to_string()))?;
    Ok(DateTime::from_naive_utc_and_offset(midnight, Utc))
}
