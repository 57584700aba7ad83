//! SkyOracle Watcher
//!
//! Mirrors flight status records from the flight feed into the InsuranceHub
//! contract for every flight that has an active policy.

mod config;
mod shutdown;

use anyhow::Context;
use clap::Parser;
use config::{ConfigLoader, LoadedConfig, Overrides, get_private_key};
use shutdown::{ShutdownSignals, spawn_shutdown_handler};
use skyoracle_core::events::oracle_event_channel;
use skyoracle_core::ledger::HubClient;
use skyoracle_core::processors::{OracleWatcher, SettlementReporter};
use skyoracle_sdk::client::FeedClient;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

const DEFAULT_CONFIG_PATH: &str = "./skyoracle.toml";

/// SkyOracle - flight status oracle for the InsuranceHub contract
#[derive(Parser, Debug)]
#[command(name = "skyoracle-watcher")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON-RPC endpoint of the node
    #[arg(long, env = "RPC_URL")]
    rpc_url: Option<Url>,

    /// Base URL of the flight feed
    #[arg(long, env = "API_BASE_URL")]
    feed_url: Option<Url>,

    /// Address of the InsuranceHub contract
    #[arg(long, env = "HUB_ADDRESS")]
    hub_address: Option<String>,

    /// Deployments JSON file to read the hub address from
    #[arg(long, env = "DEPLOYMENTS_FILE")]
    deployments_file: Option<PathBuf>,

    /// Seconds between the end of one tick and the start of the next
    #[arg(long, env = "POLL_INTERVAL_SECONDS")]
    poll_interval: Option<u64>,

    /// Blocks scanned behind the head on the first discovery pass
    #[arg(long, env = "LOOKBACK_BLOCKS")]
    lookback_blocks: Option<u64>,

    /// Deadline in seconds for each RPC call and feed request
    #[arg(long, env = "CALL_TIMEOUT_SECONDS")]
    call_timeout: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long, default_value = "false")]
    log_json: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            rpc_url: self.rpc_url.clone(),
            feed_url: self.feed_url.clone(),
            hub_address: self.hub_address.clone(),
            deployments_file: self.deployments_file.clone(),
            poll_interval_secs: self.poll_interval,
            lookback_blocks: self.lookback_blocks,
            call_timeout_secs: self.call_timeout,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    init_tracing(args.log_json);

    tracing::info!("Starting skyoracle-watcher v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let (config_path, required) = match &args.config {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };
    let config = ConfigLoader::new(&config_path, required, args.overrides())
        .load()
        .map_err(|e| {
            tracing::error!("Failed to load configuration: {}", e);
            e
        })?;
    tracing::info!(
        rpc_url = %config.rpc_url,
        feed_url = %config.feed_url,
        hub = %config.hub_address,
        poll_interval_secs = config.poll_interval.as_secs(),
        lookback_blocks = config.lookback_blocks,
        "Configuration loaded"
    );

    // Get the oracle key from the environment
    let private_key = get_private_key().map_err(|e| {
        tracing::error!("{}", e);
        e
    })?;

    let signals = ShutdownSignals::install().context("failed to install signal handlers")?;

    let hub = connect_hub(&config, private_key).await?;
    let feed = build_feed(&config)?;

    let (events_tx, events_rx) = oracle_event_channel();
    let watcher = OracleWatcher::new(Arc::new(hub), Arc::new(feed), config.watcher_config())
        .with_events(events_tx);

    // An unreachable ledger at boot is fatal
    watcher.preflight().await.map_err(|e| {
        tracing::error!("Ledger unreachable at startup: {}", e);
        e
    })?;

    let reporter = tokio::spawn(SettlementReporter::new(events_rx).run());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal_handler = spawn_shutdown_handler(signals, shutdown_tx);

    let ticks = watcher.run(shutdown_rx).await;

    // The watcher dropped the only event sender; let the reporter drain.
    let reported = reporter.await.context("settlement reporter panicked")?;
    signal_handler.abort();

    tracing::info!(ticks, reported, "Watcher shutdown complete");
    Ok(())
}

async fn connect_hub(config: &LoadedConfig, private_key: String) -> anyhow::Result<HubClient> {
    let hub = HubClient::connect(config.hub_client_config(private_key)).map_err(|e| {
        tracing::error!("Failed to set up ledger client: {}", e);
        e
    })?;
    tracing::info!(oracle = %hub.oracle_address(), hub = %hub.hub_address(), "Oracle account ready");

    match hub.oracle_balance().await {
        Ok(balance) => tracing::info!(
            balance_eth = %alloy::primitives::utils::format_ether(balance),
            "Oracle balance"
        ),
        Err(e) => tracing::warn!("Could not read oracle balance: {}", e),
    }

    Ok(hub)
}

fn build_feed(config: &LoadedConfig) -> anyhow::Result<FeedClient> {
    let http = reqwest::Client::builder()
        .timeout(config.call_timeout)
        .build()
        .context("failed to build HTTP client")?;
    Ok(FeedClient::new(config.feed_url.clone()).with_http_client(http))
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,alloy=warn,hyper_util=warn,reqwest=warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
