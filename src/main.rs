use anyhow::Result;
use clap::Parser;
use listing_harvester::config::{load_config, Config};
use listing_harvester::pipeline::Pipeline;
use listing_harvester::schedule::run_until_shutdown;
use listing_harvester::scrapers::HttpFetcher;
use listing_harvester::store::{InMemoryStore, ListingStore, SqliteStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Harvest rental listings into a local database on a fixed schedule
#[derive(Parser, Debug)]
#[command(name = "listing-harvester", version)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Keep records in memory instead of the SQLite database
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    info!("🏠 Listing Harvester");
    info!("====================");

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    let store: Arc<dyn ListingStore> = if cli.memory {
        info!("Using in-memory store, records are dropped on exit");
        Arc::new(InMemoryStore::new())
    } else {
        Arc::new(SqliteStore::connect(&config.db.path).await?)
    };

    let fetcher = Arc::new(HttpFetcher::new(&config.http)?);
    let interval = Duration::from_secs(config.schedule.interval_secs);
    let pipeline = Pipeline::new(config, fetcher, store);

    if cli.once {
        pipeline.run_cycle().await;
        return Ok(());
    }

    // Listen once for the whole run so a Ctrl-C during a cycle is not lost
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, finishing current cycle before shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    let cycles = run_until_shutdown(&pipeline, interval, shutdown_rx).await;
    info!("Stopped after {} cycle(s)", cycles);

    Ok(())
}
