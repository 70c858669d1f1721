mod config;
mod report;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tadash_core::{DataProvider, IndicatorTable, PipelineOutcome, SymbolEntry};
use tadash_data::export::write_table_csv_file;
use tadash_data::symbols::load_symbols;
use tadash_data::{CachedProvider, CsvDataProvider, YahooProvider};
use tadash_engine::{default_end_date, default_start_date, IndicatorPipeline};
use tracing_subscriber::{fmt, EnvFilter};

use config::{AppConfig, ProviderKind};

#[derive(Parser)]
#[command(name = "tadash")]
#[command(about = "Technical indicators for daily stock prices: SMA, RSI, MACD and Bollinger Bands")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", env = "TADASH_LOG")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "TADASH_LOG_FORMAT")]
    log_format: LogFormat,

    /// Config file (defaults to ./tadash.toml when present)
    #[arg(short, long, env = "TADASH_CONFIG")]
    config: Option<PathBuf>,

    /// Price data source
    #[arg(long, value_enum, env = "TADASH_PROVIDER")]
    provider: Option<ProviderKind>,

    /// Directory of <TICKER>.csv files for the csv provider
    #[arg(long, env = "TADASH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Symbol list CSV (ticker,name)
    #[arg(long, env = "TADASH_SYMBOLS_FILE")]
    symbols_file: Option<PathBuf>,

    /// Cached ranges kept in memory (0 disables the cache)
    #[arg(long, env = "TADASH_CACHE_CAPACITY")]
    cache_capacity: Option<usize>,

    /// Tickers fetched concurrently by batch runs
    #[arg(long, env = "TADASH_CONCURRENCY")]
    concurrency: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute indicators for one ticker and print its latest row
    Compute {
        /// Ticker symbol (e.g. "PETR4.SA")
        ticker: String,

        /// First date, inclusive (YYYY-MM-DD, default 2023-01-01)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last date, inclusive (YYYY-MM-DD, default today)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Write the full table as CSV
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Drop leading rows where any indicator is undefined
        #[arg(long)]
        drop_incomplete: bool,
    },

    /// Compute indicators for several tickers (default: the symbol list)
    Batch {
        tickers: Vec<String>,

        #[arg(long)]
        start: Option<NaiveDate>,

        #[arg(long)]
        end: Option<NaiveDate>,

        /// Write one <TICKER>.csv per successful ticker
        #[arg(long)]
        out_dir: Option<PathBuf>,

        #[arg(long)]
        drop_incomplete: bool,
    },

    /// List the configured symbols
    Symbols,

    /// Start the API server
    Serve {
        /// Bind address (default from config, 0.0.0.0:3000)
        #[arg(short, long, env = "TADASH_BIND")]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    match cli.log_format {
        LogFormat::Text => fmt().with_env_filter(filter).with_target(false).init(),
        LogFormat::Json => fmt().json().with_env_filter(filter).with_target(false).init(),
    }

    let mut config = AppConfig::load(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);

    match cli.command {
        Commands::Compute {
            ticker,
            start,
            end,
            out,
            drop_incomplete,
        } => {
            let pipeline = build_pipeline(&config, drop_incomplete)?;
            run_compute(&pipeline, &ticker, start, end, out.as_deref()).await?;
        }
        Commands::Batch {
            tickers,
            start,
            end,
            out_dir,
            drop_incomplete,
        } => {
            let tickers = if tickers.is_empty() {
                symbol_list(&config)?
                    .into_iter()
                    .map(|s| s.ticker.to_string())
                    .collect()
            } else {
                tickers
            };
            if tickers.is_empty() {
                anyhow::bail!("No tickers given and the symbol list is empty");
            }
            let pipeline = build_pipeline(&config, drop_incomplete)?;
            run_batch(&pipeline, &tickers, start, end, out_dir.as_deref()).await?;
        }
        Commands::Symbols => {
            let symbols = symbol_list(&config)?;
            println!("Available symbols:");
            for symbol in symbols {
                println!("  {:<12} - {}", symbol.ticker, symbol.name);
            }
        }
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let pipeline = build_pipeline(&config, config.indicators.drop_incomplete)?;
            let symbols = match &config.symbols_file {
                Some(path) => load_symbols(path)?,
                None => Vec::new(),
            };
            tadash_api::start_server(tadash_api::AppState::new(pipeline, symbols), &bind).await?;
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(kind) = cli.provider {
        config.provider.kind = kind;
    }
    if let Some(dir) = &cli.data_dir {
        config.provider.data_dir = dir.clone();
    }
    if let Some(path) = &cli.symbols_file {
        config.symbols_file = Some(path.clone());
    }
    if let Some(capacity) = cli.cache_capacity {
        config.cache.capacity = capacity;
    }
    if let Some(concurrency) = cli.concurrency {
        config.pipeline.concurrency = concurrency;
    }
}

fn build_provider(config: &AppConfig) -> Result<Arc<dyn DataProvider>> {
    let provider = &config.provider;
    let inner: Arc<dyn DataProvider> = match provider.kind {
        ProviderKind::Yahoo => Arc::new(YahooProvider::new(
            provider.base_url.clone(),
            Duration::from_secs(provider.timeout_secs),
        )?),
        ProviderKind::Csv => Arc::new(CsvDataProvider::new(&provider.data_dir)),
    };
    tracing::debug!(
        provider = inner.name(),
        cache_capacity = config.cache.capacity,
        "Configured data provider"
    );
    Ok(Arc::new(CachedProvider::new(inner, config.cache.capacity)))
}

fn build_pipeline(config: &AppConfig, drop_incomplete: bool) -> Result<IndicatorPipeline> {
    let indicators = config
        .indicators
        .clone()
        .with_drop_incomplete(config.indicators.drop_incomplete || drop_incomplete);
    let pipeline = IndicatorPipeline::new(build_provider(config)?, indicators)
        .context("Invalid [indicators] configuration")?
        .with_concurrency(config.pipeline.concurrency);
    Ok(pipeline)
}

fn symbol_list(config: &AppConfig) -> Result<Vec<SymbolEntry>> {
    let path = config
        .symbols_file
        .as_deref()
        .context("No symbol list configured (set symbols_file or --symbols-file)")?;
    Ok(load_symbols(path)?)
}

fn date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> (NaiveDate, NaiveDate) {
    (
        start.unwrap_or_else(default_start_date),
        end.unwrap_or_else(default_end_date),
    )
}

async fn run_compute(
    pipeline: &IndicatorPipeline,
    ticker: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    out: Option<&Path>,
) -> Result<()> {
    let (start, end) = date_range(start, end);
    tracing::info!(ticker, %start, %end, "Computing indicators");

    let outcome = pipeline.compute(ticker, start, end).await;
    println!("{}", report::outcome_line(ticker, &outcome));

    if let (PipelineOutcome::Table(table), Some(path)) = (&outcome, out) {
        write_table_csv_file(table, path)?;
        println!("Wrote {} rows to {}", table.len(), path.display());
    }
    Ok(())
}

async fn run_batch(
    pipeline: &IndicatorPipeline,
    tickers: &[String],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    out_dir: Option<&Path>,
) -> Result<()> {
    let (start, end) = date_range(start, end);
    tracing::info!(count = tickers.len(), %start, %end, "Computing indicators for batch");

    let results = pipeline.compute_many(tickers, start, end).await;
    let mut computed = 0;
    let mut export_failures = 0;
    for result in &results {
        println!("{}", report::outcome_line(&result.requested, &result.outcome));
        let (PipelineOutcome::Table(table), Some(dir)) = (&result.outcome, out_dir) else {
            computed += usize::from(result.outcome.is_table());
            continue;
        };
        computed += 1;
        if let Err(line) = export_into(table, dir) {
            export_failures += 1;
            println!("{}", line);
        }
    }

    println!("{}", report::batch_footer(computed, export_failures, results.len()));
    Ok(())
}

/// Write `<dir>/<TICKER>.csv`. A failure is logged and returned as the
/// `error:` line for the ticker so the rest of the batch can continue.
fn export_into(table: &IndicatorTable, dir: &Path) -> std::result::Result<PathBuf, String> {
    let path = dir.join(format!("{}.csv", table.ticker));
    match write_table_csv_file(table, &path) {
        Ok(()) => Ok(path),
        Err(e) => {
            tracing::error!(ticker = %table.ticker, path = %path.display(), error = %e, "CSV export failed");
            Err(report::export_error_line(table.ticker.as_str(), &path, &e))
        }
    }
}
