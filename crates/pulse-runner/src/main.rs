//! # pulse-runner
//!
//! Diagnostic command line for the market-data layer.
//!
//! # Usage
//!
//! ```bash
//! pulse-runner watch BTCUSDT ETHUSDT --log-level info
//! pulse-runner search eth
//! pulse-runner ticker solusdt --config config.json
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pulse_core::config::{AppConfig, load_config};
use pulse_core::format::{format_percent, format_price, format_volume};
use pulse_core::display_pair;
use pulse_md::{MarketData, PriceHistory, SymbolView};
use tracing::{error, info, warn};

/// Live crypto prices, 24h stats and symbol search.
#[derive(Parser)]
#[command(name = "pulse-runner", about = "Live crypto market data runner")]
struct Cli {
    /// Configuration file path (JSON). Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Optional log directory for file output.
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stream live prices until Ctrl+C (popular symbols if none given).
    Watch { symbols: Vec<String> },
    /// Search tradable symbols.
    Search { query: String },
    /// Print 24h statistics for one symbol.
    Ticker { symbol: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    // 2. Initialize logging
    let log_dir = cli.log_dir.clone().or_else(|| config.log_path());
    let _log_guard = pulse_core::logging::init_logging(
        &cli.log_level,
        log_dir.as_deref(),
        &config.module_name(),
    );
    info!("pulse-runner starting, log_level={}", cli.log_level);

    // 3. Start the market-data layer
    let md = Arc::new(MarketData::start(config.market_data).context("starting market data")?);

    // Only `watch` opens streams; it shuts the layer down itself.
    match cli.command {
        Command::Watch { symbols } => watch(md, symbols).await?,
        Command::Search { query } => {
            let hits = md.search(&query).await;
            if hits.is_empty() {
                println!("no matches for {query:?}");
            }
            for symbol in hits {
                println!("{:<14} {}", symbol, display_pair(&symbol));
            }
        }
        Command::Ticker { symbol } => {
            let snap = md
                .snapshot(&symbol)
                .await
                .with_context(|| format!("fetching 24h ticker for {symbol}"))?;
            println!("{}", display_pair(&snap.symbol));
            println!("  last    {}", format_price(snap.last_price));
            println!("  change  {}", format_percent(snap.price_change_percent, true));
            println!("  high    {}", format_price(snap.high_price));
            println!("  low     {}", format_price(snap.low_price));
            println!("  volume  {}", format_volume(snap.volume));
        }
    }

    Ok(())
}

async fn watch(md: Arc<MarketData>, symbols: Vec<String>) -> Result<()> {
    let symbols = if symbols.is_empty() {
        md.popular_symbols().to_vec()
    } else {
        symbols
    };

    let mut tasks = Vec::new();
    for symbol in &symbols {
        match md.observe(symbol).await {
            Ok(view) => tasks.push(tokio::spawn(print_feed(view))),
            Err(e) => error!("cannot observe {symbol}: {e}"),
        }
    }
    info!("watching {} symbol(s), press Ctrl+C to stop", tasks.len());

    // 4. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    // 5. Release everything; feeds complete and the printers exit
    md.shutdown().await;
    for task in tasks {
        if let Err(e) = task.await {
            warn!("feed printer ended abnormally: {e}");
        }
    }
    info!("all feeds stopped");
    Ok(())
}

async fn print_feed(mut view: SymbolView) {
    let pair = view.display_pair();
    match &view.snapshot {
        Ok(snap) => info!(
            "{pair}: 24h change {} volume {}",
            format_percent(snap.price_change_percent, true),
            format_volume(snap.volume)
        ),
        Err(e) => warn!("{pair}: no 24h stats ({e})"),
    }

    let mut history = PriceHistory::default();
    while let Some(event) = view.feed.next().await {
        match event {
            Ok(tick) => {
                if !history.record_tick(&tick) {
                    continue;
                }
                let range = view
                    .range_position()
                    .map(|p| format!("{p:.1}%"))
                    .unwrap_or_else(|| "-".into());
                info!(
                    "{pair} {}  range {range}  window {}",
                    format_price(Some(tick.price)),
                    format_percent(history.change_percent(), true)
                );
            }
            Err(e) => {
                error!("{pair}: {e}");
                break;
            }
        }
    }
}
