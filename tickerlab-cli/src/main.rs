//! Tickerlab CLI — market reference data collection commands.
//!
//! Commands:
//! - `us` — collect screener categories and write the merged ticker table
//! - `hk` — download the HKEX list of securities
//! - `sg` — fetch SGX securities prices
//!
//! Output lands in the resolved data directory as CSV, one file per source
//! plus `us_tickers.csv` for the merged US table.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tickerlab_core::{
    client, resolve_data_dir, Category, CollectedTables, CollectorConfig, CsvStore,
    HkListingFetcher, ScreenerClient, SgSpotFetcher, Table, UsCollector, HK_FILE, SG_FILE,
};

#[derive(Parser)]
#[command(
    name = "tickerlab",
    about = "Tickerlab CLI — daily market reference data collector"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect US screener data and merge the categories on ticker.
    Us {
        /// Category to collect: overview, valuation, ownership, financial,
        /// or all.
        #[arg(long, default_value = "all")]
        data_type: String,

        /// Merge and write us_tickers.csv even for a single-category run
        /// (missing categories are collected on demand).
        #[arg(long, default_value_t = false)]
        merge: bool,

        /// Output directory. Defaults to an upward search for the
        /// configured data folder.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Download the HKEX list of securities.
    Hk {
        /// Output directory. Defaults to an upward search for the
        /// configured data folder.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Fetch SGX securities prices.
    Sg {
        /// Output directory. Defaults to an upward search for the
        /// configured data folder.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Us {
            data_type,
            merge,
            data_dir,
            config,
        } => run_us(&data_type, merge, data_dir, config),
        Commands::Hk { data_dir, config } => run_hk(data_dir, config),
        Commands::Sg { data_dir, config } => run_sg(data_dir, config),
    }
}

fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<CollectorConfig> {
    match path {
        Some(path) => CollectorConfig::from_file(&path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(CollectorConfig::default()),
    }
}

/// Resolve the output directory once, before any collection starts.
fn resolve_store(data_dir: Option<PathBuf>, config: &CollectorConfig) -> Result<CsvStore> {
    let dir = match data_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            dir
        }
        None => {
            let start = std::env::current_dir().context("failed to read working directory")?;
            resolve_data_dir(&start, &config.data_folder)?
        }
    };
    Ok(CsvStore::new(dir))
}

fn run_us(
    data_type: &str,
    merge: bool,
    data_dir: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let store = resolve_store(data_dir, &config)?;
    let http = client::build_client(config.timeout(), &config.user_agent)?;
    let screener = ScreenerClient::new(http, &config.screener_url, config.retry_policy());
    let collector = UsCollector::new(screener, store.clone());

    if data_type == "all" {
        let merged = collector.collect_all()?;
        print_table_summary("merged US table", &merged, &store.path_for(tickerlab_core::MERGED_FILE));
        return Ok(());
    }

    let category: Category = match data_type.parse() {
        Ok(category) => category,
        Err(_) => bail!(
            "unknown data type '{data_type}'. Valid: overview, valuation, ownership, financial, all"
        ),
    };

    let mut tables = CollectedTables::default();
    collector.collect_category(&mut tables, category)?;
    if let Some(table) = tables.get(category) {
        print_table_summary(category.name(), table, &store.path_for(&category.file_name()));
    }

    if merge {
        let merged = collector.merge_all(&mut tables)?;
        print_table_summary("merged US table", &merged, &store.path_for(tickerlab_core::MERGED_FILE));
    }

    Ok(())
}

fn run_hk(data_dir: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let store = resolve_store(data_dir, &config)?;
    let http = client::build_client(config.timeout(), &config.user_agent)?;

    let table = HkListingFetcher::new(http, &config.hkex_listing_url).collect()?;
    let path = store.write(HK_FILE, &table)?;
    print_table_summary("HK listing", &table, &path);
    Ok(())
}

fn run_sg(data_dir: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let store = resolve_store(data_dir, &config)?;
    let http = client::build_client(config.timeout(), &config.user_agent)?;

    let table = SgSpotFetcher::new(http, &config.sgx_prices_url).collect()?;
    let path = store.write(SG_FILE, &table)?;
    print_table_summary("SG spot", &table, &path);
    Ok(())
}

fn print_table_summary(label: &str, table: &Table, path: &std::path::Path) {
    println!(
        "{label}: {} rows x {} columns -> {}",
        table.len(),
        table.columns().len(),
        path.display()
    );
}
