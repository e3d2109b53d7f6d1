//! Batch configuration file
//!
//! JSON map of pair symbol to per-pair overrides; any missing field falls
//! back to the shared defaults:
//!
//! ```json
//! {
//!     "BTC-USD": { "start_date": "2023-01-01", "end_date": "2024-01-01", "granularity": 60 },
//!     "ETH-USD": { "start_date": "2022-06-15" }
//! }
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::types::{default_end_utc, parse_date_utc, Granularity, Symbol};

/// Earliest date worth asking Coinbase for
pub const DEFAULT_START_DATE: &str = "2012-01-01";

fn default_start_date() -> String {
    DEFAULT_START_DATE.to_string()
}

fn default_granularity() -> i64 {
    60
}

/// Per-pair fetch parameters as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairRequest {
    #[serde(default = "default_start_date")]
    pub start_date: String,

    /// Defaults to today's UTC midnight when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,

    /// Seconds per candle
    #[serde(default = "default_granularity")]
    pub granularity: i64,
}

impl Default for PairRequest {
    fn default() -> Self {
        Self {
            start_date: default_start_date(),
            end_date: None,
            granularity: default_granularity(),
        }
    }
}

impl PairRequest {
    /// Validate and resolve into concrete fetch bounds
    pub fn resolve(&self) -> Result<(DateTime<Utc>, DateTime<Utc>, Granularity)> {
        let start = parse_date_utc(&self.start_date)?;
        let end = match &self.end_date {
            Some(s) => parse_date_utc(s)?,
            None => default_end_utc(),
        };
        let granularity = Granularity::from_secs(self.granularity)?;
        Ok((start, end, granularity))
    }
}

/// Full batch configuration, symbols in deterministic order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchConfig(pub BTreeMap<String, PairRequest>);

impl BatchConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file {}", path.as_ref().display())
        })?;
        serde_json::from_str(&contents).context("Failed to parse config JSON")
    }

    pub fn pairs(&self) -> impl Iterator<Item = (Symbol, &PairRequest)> {
        self.0.iter().map(|(name, req)| (Symbol::new(name), req))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
