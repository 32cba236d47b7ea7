//! Collector CLI
//!
//! Resumable storefront and statistics collection into CSV files.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use collector_logging::collector_info;
use log::LevelFilter;

mod config;
mod jobs;
mod logging;

use config::CollectorConfig;
use logging::LogDestination;

#[derive(Debug, Parser)]
#[command(name = "collector")]
#[command(about = "Resumable storefront data collection to CSV", long_about = None)]
struct Cli {
    /// RON config file; built-in defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogDestination::Both, global = true)]
    log: LogDestination,

    /// Log per-item decisions.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Collect store details and review summaries for every listed app
    Store(StoreArgs),
    /// Merge per-app statistics onto a store export
    Stats(StatsArgs),
}

#[derive(Debug, Args)]
struct StoreArgs {
    #[arg(long)]
    output: Option<PathBuf>,
    /// Only process the first N listed apps.
    #[arg(long)]
    limit: Option<usize>,
    /// Seconds to wait after HTTP 429.
    #[arg(long)]
    cooldown_secs: Option<u64>,
    #[arg(long)]
    max_attempts: Option<u32>,
}

#[derive(Debug, Args)]
struct StatsArgs {
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long)]
    output: Option<PathBuf>,
    /// Rewrite the output after this many apps.
    #[arg(long)]
    checkpoint_every: Option<usize>,
    /// Seconds to wait after HTTP 429.
    #[arg(long)]
    cooldown_secs: Option<u64>,
    /// Verify TLS certificates of the statistics API.
    #[arg(long)]
    verify_tls: bool,
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    logging::initialize(cli.log, level);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = CollectorConfig::load(cli.config.as_deref())?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let summary = match cli.command {
        Commands::Store(args) => {
            apply_store_args(&mut config, args);
            runtime.block_on(jobs::store::execute(&config.store, &config.http))?
        }
        Commands::Stats(args) => {
            apply_stats_args(&mut config, args);
            runtime.block_on(jobs::stats::execute(&config.stats, &config.http))?
        }
    };

    collector_info!("Done! {}", summary);
    Ok(())
}

fn apply_store_args(config: &mut CollectorConfig, args: StoreArgs) {
    let store = &mut config.store;
    if let Some(output) = args.output {
        store.output = output;
    }
    if args.limit.is_some() {
        store.limit = args.limit;
    }
    if let Some(secs) = args.cooldown_secs {
        store.cooldown_secs = secs;
    }
    if args.max_attempts.is_some() {
        store.max_attempts = args.max_attempts;
    }
}

fn apply_stats_args(config: &mut CollectorConfig, args: StatsArgs) {
    let stats = &mut config.stats;
    if let Some(input) = args.input {
        stats.input = input;
    }
    if let Some(output) = args.output {
        stats.output = output;
    }
    if let Some(every) = args.checkpoint_every {
        stats.checkpoint_every = every;
    }
    if let Some(secs) = args.cooldown_secs {
        stats.cooldown_secs = secs;
    }
    if args.verify_tls {
        stats.accept_invalid_certs = false;
    }
}
