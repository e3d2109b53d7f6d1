//! Batch command - download candle history for a list of pairs
//!
//! Pairs come from a newline-delimited symbol file, a comma-separated
//! --pairs value, or a JSON config with per-pair overrides. Pairs are
//! processed sequentially with a fixed sleep in between; a failed pair is
//! logged and the remaining pairs still run, but the process exits non-zero
//! if any pair failed.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

use coinbase_ohlcv::coinbase::CoinbaseClient;
use coinbase_ohlcv::config::{BatchConfig, PairRequest};
use coinbase_ohlcv::fetch::{self, FetchOptions};
use coinbase_ohlcv::types::{Granularity, Symbol};
use coinbase_ohlcv::writer;

pub struct BatchArgs {
    pub file: Option<String>,
    pub config: Option<String>,
    pub pairs: Option<String>,
    pub start: String,
    pub end: Option<String>,
    pub granularity: Granularity,
    pub dir: String,
    pub delay_secs: u64,
    pub resume: bool,
}

pub fn run(args: BatchArgs) -> Result<()> {
    let jobs = collect_jobs(&args)?;
    if jobs.is_empty() {
        bail!("No pairs to download; use --file, --config, or --pairs");
    }

    println!("\n{}", "=".repeat(60));
    println!("DOWNLOADING COINBASE CANDLE HISTORY");
    println!("{}", "=".repeat(60));
    println!("  Pairs:  {}", jobs.len());
    println!("  Output: {}", args.dir);
    println!("  Mode:   {}", if args.resume { "resume" } else { "overwrite" });
    println!("{}\n", "=".repeat(60));

    let rt = tokio::runtime::Runtime::new()?;
    let client = CoinbaseClient::new();
    let out_dir = PathBuf::from(&args.dir);

    let mut failed = 0usize;
    let mut skipped = 0usize;

    for (i, (symbol, request)) in jobs.iter().enumerate() {
        let path = out_dir.join(symbol.parquet_file());

        // Existing files are overwritten per pair; --resume skips them
        // instead. The output directory itself is never cleared.
        if args.resume && path.exists() {
            info!(symbol = %symbol, path = %path.display(), "output exists, skipping");
            skipped += 1;
            continue;
        }

        match fetch_one(&rt, &client, symbol, request, &path) {
            Ok(count) => {
                info!(symbol = %symbol, candles = count, "pair download complete");
            }
            Err(e) => {
                error!(symbol = %symbol, "pair download failed: {e:#}");
                failed += 1;
            }
        }

        // Fixed sleep between pairs to stay under the rate ceiling
        if i + 1 < jobs.len() && args.delay_secs > 0 {
            std::thread::sleep(Duration::from_secs(args.delay_secs));
        }
    }

    let succeeded = jobs.len() - failed - skipped;
    println!("\n{}", "=".repeat(60));
    println!("BATCH COMPLETE");
    println!("{}", "=".repeat(60));
    println!("  Succeeded: {}", succeeded);
    println!("  Skipped:   {}", skipped);
    println!("  Failed:    {}", failed);
    println!("{}", "=".repeat(60));

    if failed > 0 {
        bail!("{failed} of {} pairs failed", jobs.len());
    }

    Ok(())
}

fn fetch_one(
    rt: &tokio::runtime::Runtime,
    client: &CoinbaseClient,
    symbol: &Symbol,
    request: &PairRequest,
    path: &Path,
) -> Result<usize> {
    let (start, end, granularity) = request.resolve()?;
    let options = FetchOptions::default().with_granularity(granularity);

    let candles = rt.block_on(fetch::fetch_pair(client, symbol, start, end, &options))?;

    writer::write_parquet(&candles, path)?;
    Ok(candles.len())
}

/// Resolve the pair list from whichever input mode was given
fn collect_jobs(args: &BatchArgs) -> Result<Vec<(Symbol, PairRequest)>> {
    let shared = PairRequest {
        start_date: args.start.clone(),
        end_date: args.end.clone(),
        granularity: args.granularity.as_secs(),
    };

    if let Some(config_path) = &args.config {
        let config = BatchConfig::from_file(config_path)?;
        return Ok(config
            .pairs()
            .map(|(symbol, request)| (symbol, request.clone()))
            .collect());
    }

    if let Some(file_path) = &args.file {
        let contents = std::fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read pair list {file_path}"))?;
        return Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| (Symbol::new(line), shared.clone()))
            .collect());
    }

    if let Some(pairs) = &args.pairs {
        return Ok(pairs
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| (Symbol::new(s), shared.clone()))
            .collect());
    }

    Ok(Vec::new())
}
