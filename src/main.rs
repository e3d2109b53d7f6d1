//! Coinbase OHLCV downloader - main entry point
//!
//! This binary provides two subcommands:
//! - fetch: Download candle history for one trading pair
//! - batch: Download candle history for a list of pairs

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use coinbase_ohlcv::config::DEFAULT_START_DATE;
use coinbase_ohlcv::types::Granularity;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "coinbase-ohlcv")]
#[command(about = "Download historical OHLCV candles from Coinbase into Parquet files", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download candle history for a single pair
    Fetch {
        /// Exchange pair identifier, e.g. BTC-USD
        symbol: String,

        /// Start date (YYYY-MM-DD)
        start: String,

        /// End date (YYYY-MM-DD), defaults to today
        end: Option<String>,

        /// Seconds per candle (60, 300, 900, 3600, 21600, 86400)
        #[arg(default_value = "60")]
        granularity: Granularity,

        /// Output directory
        #[arg(default_value = "data")]
        dir: String,
    },

    /// Download candle history for a list of pairs
    Batch {
        /// Newline-delimited pair list file (# comments skipped)
        #[arg(short, long)]
        file: Option<String>,

        /// JSON config file with per-pair overrides
        #[arg(short, long)]
        config: Option<String>,

        /// Pairs to download (comma-separated), e.g. "BTC-USD,ETH-USD"
        #[arg(short, long)]
        pairs: Option<String>,

        /// Start date (YYYY-MM-DD), shared by all pairs
        #[arg(long, default_value = DEFAULT_START_DATE)]
        start: String,

        /// End date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        end: Option<String>,

        /// Seconds per candle (60, 300, 900, 3600, 21600, 86400)
        #[arg(short, long, default_value = "60")]
        granularity: Granularity,

        /// Output directory
        #[arg(short, long, default_value = "data")]
        dir: String,

        /// Fixed sleep between pairs, in seconds
        #[arg(long, default_value = "5")]
        delay_secs: u64,

        /// Skip pairs whose output file already exists instead of overwriting
        #[arg(long)]
        resume: bool,
    },
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Filter out noisy external crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn,polars=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Logging initialized");
    info!("Log file: {}", log_path.display());

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Fetch { .. } => "fetch",
        Commands::Batch { .. } => "batch",
    };

    setup_logging(cli.verbose, command_name)?;

    match cli.command {
        Commands::Fetch {
            symbol,
            start,
            end,
            granularity,
            dir,
        } => commands::fetch::run(symbol, start, end, granularity, dir),

        Commands::Batch {
            file,
            config,
            pairs,
            start,
            end,
            granularity,
            dir,
            delay_secs,
            resume,
        } => commands::batch::run(commands::batch::BatchArgs {
            file,
            config,
            pairs,
            start,
            end,
            granularity,
            dir,
            delay_secs,
            resume,
        }),
    }
}
