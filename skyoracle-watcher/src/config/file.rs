//! TOML file configuration structures.
//!
//! These structs directly map to the `skyoracle.toml` file format. Every
//! section and key is optional; a missing file behaves like an empty one.

use serde::{Deserialize, Serialize};
use skyoracle_core::ledger::hub::DEFAULT_GAS_LIMIT;
use skyoracle_core::processors::DEFAULT_LOOKBACK_BLOCKS;
use std::path::PathBuf;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub ledger: LedgerConfig,
    pub feed: FeedConfig,
    pub watcher: WatcherConfig,
}

/// Ledger configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint of the node.
    pub rpc_url: Url,
    /// Address of the `InsuranceHub` contract. Takes precedence over
    /// `deployments_file`.
    pub hub_address: Option<String>,
    /// JSON file written by the deploy scripts, read for its `hub` field.
    pub deployments_file: Option<PathBuf>,
    pub gas_limit: u64,
    /// EIP-1559 fee cap in wei; estimated by the node when unset.
    pub max_fee_per_gas: Option<u64>,
    pub max_priority_fee_per_gas: Option<u64>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            hub_address: None,
            deployments_file: None,
            gas_limit: DEFAULT_GAS_LIMIT,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
        }
    }
}

/// Flight feed configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub base_url: Url,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_feed_url(),
        }
    }
}

/// Polling and timeout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub poll_interval_secs: u64,
    pub lookback_blocks: u64,
    /// Deadline for each RPC call and each feed request.
    pub call_timeout_secs: u64,
    /// Deadline for a submitted transaction to be mined.
    pub receipt_timeout_secs: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            lookback_blocks: DEFAULT_LOOKBACK_BLOCKS,
            call_timeout_secs: 10,
            receipt_timeout_secs: 60,
        }
    }
}

fn default_rpc_url() -> Url {
    "http://127.0.0.1:8545".parse().expect("valid default url")
}

fn default_feed_url() -> Url {
    "http://127.0.0.1:8000".parse().expect("valid default url")
}
