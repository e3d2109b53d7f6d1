//! Fetch command - download candle history for a single pair

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

use coinbase_ohlcv::coinbase::CoinbaseClient;
use coinbase_ohlcv::fetch::{self, FetchOptions};
use coinbase_ohlcv::types::{default_end_utc, parse_date_utc, Granularity, Symbol};
use coinbase_ohlcv::writer;

pub fn run(
    symbol: String,
    start: String,
    end: Option<String>,
    granularity: Granularity,
    dir: String,
) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;

    let symbol = Symbol::new(symbol);
    let start = parse_date_utc(&start)?;
    let end = match end {
        Some(s) => parse_date_utc(&s)?,
        None => default_end_utc(),
    };
    let options = FetchOptions::default().with_granularity(granularity);

    let client = CoinbaseClient::new();
    let candles = rt
        .block_on(fetch::fetch_pair(&client, &symbol, start, end, &options))
        .with_context(|| format!("Fetch failed for {}", symbol))?;

    if candles.is_empty() {
        warn!(symbol = %symbol, "no candles in range, no file written");
        return Ok(());
    }

    let path = Path::new(&dir).join(symbol.parquet_file());
    writer::write_parquet(&candles, &path)?;

    info!(
        symbol = %symbol,
        candles = candles.len(),
        path = %path.display(),
        "pair download complete"
    );

    Ok(())
}
