//! Parquet output
//!
//! One Snappy-compressed file per pair with columns
//! [time, low, high, open, close, volume], sorted ascending by time.
//! Writes are whole-file overwrites; there is no append or merge.

use anyhow::{Context, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

use crate::types::Candle;

/// Write candles to a Parquet file, overwriting any existing file.
///
/// An empty series produces no file, so an aborted or no-op fetch leaves
/// nothing behind.
pub fn write_parquet(candles: &[Candle], path: &Path) -> Result<()> {
    if candles.is_empty() {
        debug!(path = %path.display(), "no candles, skipping write");
        return Ok(());
    }

    let mut df = to_dataframe(candles)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    let mut file = File::create(path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;

    ParquetWriter::new(&mut file)
        .with_compression(ParquetCompression::Snappy)
        .finish(&mut df)
        .context("Failed to write Parquet file")?;

    info!(path = %path.display(), rows = df.height(), "saved parquet file");
    Ok(())
}

/// Read a candle file back into memory, in stored (ascending) order
pub fn read_parquet(path: &Path) -> Result<Vec<Candle>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open parquet file {}", path.display()))?;

    let df = ParquetReader::new(file)
        .finish()
        .context("Failed to read Parquet file")?;

    let time = column_i64(&df, "time")?;
    let low = column_f64(&df, "low")?;
    let high = column_f64(&df, "high")?;
    let open = column_f64(&df, "open")?;
    let close = column_f64(&df, "close")?;
    let volume = column_f64(&df, "volume")?;

    Ok((0..df.height())
        .map(|i| Candle {
            time: time[i],
            low: low[i],
            high: high[i],
            open: open[i],
            close: close[i],
            volume: volume[i],
        })
        .collect())
}

fn to_dataframe(candles: &[Candle]) -> Result<DataFrame> {
    let df = df!(
        "time" => candles.iter().map(|c| c.time).collect::<Vec<_>>(),
        "low" => candles.iter().map(|c| c.low).collect::<Vec<_>>(),
        "high" => candles.iter().map(|c| c.high).collect::<Vec<_>>(),
        "open" => candles.iter().map(|c| c.open).collect::<Vec<_>>(),
        "close" => candles.iter().map(|c| c.close).collect::<Vec<_>>(),
        "volume" => candles.iter().map(|c| c.volume).collect::<Vec<_>>(),
    )
    .context("Failed to build DataFrame")?;

    df.sort(["time"], SortMultipleOptions::default())
        .context("Failed to sort DataFrame")
}

fn column_i64(df: &DataFrame, name: &str) -> Result<Vec<i64>> {
    Ok(df
        .column(name)
        .with_context(|| format!("Missing column '{name}'"))?
        .i64()
        .with_context(|| format!("Column '{name}' is not i64"))?
        .into_no_null_iter()
        .collect())
}

fn column_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    Ok(df
        .column(name)
        .with_context(|| format!("Missing column '{name}'"))?
        .f64()
        .with_context(|| format!("Column '{name}' is not f64"))?
        .into_no_null_iter()
        .collect())
}
