//! Validator dashboard HTTP server entry point

use anyhow::Context;
use clap::Parser;
use dashboard_config::DashboardConfig;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use validator_dashboard::{
    DashboardServer, DashboardService, EpochRefresher, MemoryStore, RelationalStore,
    SharedLatestEpoch, WideColumnStore,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address
    #[arg(long)]
    bind_address: Option<String>,

    /// Port
    #[arg(short, long)]
    port: Option<u16>,

    /// Postgres connection string
    #[arg(long)]
    database_url: Option<String>,

    /// Enable CORS
    #[arg(long)]
    enable_cors: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    info!("Starting validator dashboard");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = DashboardConfig::load(args.config.as_deref())?;
    if let Some(bind_address) = args.bind_address {
        config.server.bind_address = bind_address;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(database_url) = args.database_url {
        config.storage.database_url = Some(database_url);
    }
    if args.enable_cors {
        config.server.enable_cors = true;
    }
    config.validate().context("Invalid dashboard configuration")?;

    let metrics = Arc::new(MemoryStore::new());
    if let Some(path) = &config.storage.effectiveness_path {
        metrics
            .load_effectiveness_file(path)
            .await
            .with_context(|| format!("Failed to seed effectiveness from {:?}", path))?;
    }

    let relational = relational_store(&config, metrics.clone()).await?;
    let metrics: Arc<dyn WideColumnStore> = metrics;

    // latestEpoch follows the indexer's head, not the wall clock
    let latest_epoch = Arc::new(SharedLatestEpoch::default());
    let refresher = EpochRefresher::new(
        relational.clone(),
        latest_epoch.clone(),
        config.chain_clock(),
        Duration::from_millis(config.storage.latest_epoch_refresh_ms),
    );
    match refresher.refresh().await {
        Ok(Some(epoch)) => info!("Latest indexed epoch: {}", epoch),
        Ok(None) => {}
        Err(e) => warn!("Initial latest epoch read failed: {}", e),
    }
    let refresh_task = tokio::spawn(refresher.run());

    let service = Arc::new(DashboardService::from_config(
        &config,
        relational,
        metrics,
        latest_epoch,
    ));
    let server = DashboardServer::new(config.server.clone(), service);

    tokio::select! {
        result = server.start() => {
            if let Err(e) = result {
                error!("Dashboard server error: {}", e);
                return Err(e.into());
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to install CTRL+C signal handler")?;
            info!("Shutting down dashboard server");
        }
    }

    refresh_task.abort();

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "validator_dashboard=info,warn".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[cfg(feature = "postgres")]
async fn relational_store(
    config: &DashboardConfig,
    fallback: Arc<MemoryStore>,
) -> anyhow::Result<Arc<dyn RelationalStore>> {
    match &config.storage.database_url {
        Some(url) => {
            let store = validator_dashboard::store::PostgresStore::connect(
                url,
                config.storage.max_connections,
            )
            .await
            .context("Failed to connect to relational store")?;
            info!("Connected to relational store");
            Ok(Arc::new(store))
        }
        None => {
            warn!("No database_url configured; serving from the in-memory store");
            Ok(fallback)
        }
    }
}

#[cfg(not(feature = "postgres"))]
async fn relational_store(
    config: &DashboardConfig,
    fallback: Arc<MemoryStore>,
) -> anyhow::Result<Arc<dyn RelationalStore>> {
    if config.storage.database_url.is_some() {
        warn!("Built without the postgres feature; ignoring database_url");
    }
    Ok(fallback)
}
