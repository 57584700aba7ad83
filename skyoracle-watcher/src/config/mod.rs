//! Configuration module for skyoracle-watcher.
//!
//! Handles loading configuration from the TOML file, CLI arguments and
//! environment variables, and resolving the hub address.

pub mod file;

use crate::config::file::FileConfig;
use alloy::primitives::Address;
use serde::Deserialize;
use skyoracle_core::ledger::HubClientConfig;
use skyoracle_core::processors::WatcherConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Environment variable holding the oracle signer key.
pub const PRIVATE_KEY_ENV: &str = "ORACLE_PRIVATE_KEY";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to parse deployments file {}: {source}", path.display())]
    DeploymentsError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("no hub address: set HUB_ADDRESS, ledger.hub_address or a deployments file")]
    MissingHubAddress,

    #[error("ORACLE_PRIVATE_KEY environment variable not set")]
    MissingPrivateKey,
}

/// Values given on the command line or through the environment.
///
/// Each one replaces the matching file value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub rpc_url: Option<Url>,
    pub feed_url: Option<Url>,
    pub hub_address: Option<String>,
    pub deployments_file: Option<PathBuf>,
    pub poll_interval_secs: Option<u64>,
    pub lookback_blocks: Option<u64>,
    pub call_timeout_secs: Option<u64>,
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub rpc_url: Url,
    pub hub_address: Address,
    pub feed_url: Url,
    pub gas_limit: u64,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
    pub poll_interval: Duration,
    pub lookback_blocks: u64,
    pub call_timeout: Duration,
    pub receipt_timeout: Duration,
}

impl LoadedConfig {
    pub fn hub_client_config(&self, private_key: String) -> HubClientConfig {
        HubClientConfig {
            rpc_url: self.rpc_url.clone(),
            hub_address: self.hub_address,
            private_key,
            call_timeout: self.call_timeout,
            receipt_timeout: self.receipt_timeout,
            gas_limit: self.gas_limit,
            max_fee_per_gas: self.max_fee_per_gas,
            max_priority_fee_per_gas: self.max_priority_fee_per_gas,
        }
    }

    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            poll_interval: self.poll_interval,
            lookback: self.lookback_blocks,
        }
    }
}

/// Shape of the deploy scripts' address book. Other keys are ignored.
#[derive(Debug, Deserialize)]
struct Deployments {
    hub: String,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    /// Whether the path was given explicitly; only then is a missing file an
    /// error.
    required: bool,
    overrides: Overrides,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, required: bool, overrides: Overrides) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            required,
            overrides,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file, if there is one
    /// 2. Apply CLI and environment overrides
    /// 3. Validate the configuration
    /// 4. Resolve the hub address
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let mut file_config = self.read_file()?;
        self.apply_overrides(&mut file_config);
        validate(&file_config)?;
        let hub_address = resolve_hub_address(&file_config)?;

        let ledger = file_config.ledger;
        let watcher = file_config.watcher;
        Ok(LoadedConfig {
            rpc_url: ledger.rpc_url,
            hub_address,
            feed_url: file_config.feed.base_url,
            gas_limit: ledger.gas_limit,
            max_fee_per_gas: ledger.max_fee_per_gas.map(u128::from),
            max_priority_fee_per_gas: ledger.max_priority_fee_per_gas.map(u128::from),
            poll_interval: Duration::from_secs(watcher.poll_interval_secs),
            lookback_blocks: watcher.lookback_blocks,
            call_timeout: Duration::from_secs(watcher.call_timeout_secs),
            receipt_timeout: Duration::from_secs(watcher.receipt_timeout_secs),
        })
    }

    fn read_file(&self) -> Result<FileConfig, ConfigError> {
        match std::fs::read_to_string(&self.config_path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !self.required => {
                tracing::info!(
                    path = %self.config_path.display(),
                    "No config file, using defaults"
                );
                Ok(FileConfig::default())
            }
            Err(source) => Err(ConfigError::IoError {
                path: self.config_path.clone(),
                source,
            }),
        }
    }

    fn apply_overrides(&self, config: &mut FileConfig) {
        let o = &self.overrides;
        if let Some(rpc_url) = &o.rpc_url {
            config.ledger.rpc_url = rpc_url.clone();
        }
        if let Some(feed_url) = &o.feed_url {
            config.feed.base_url = feed_url.clone();
        }
        if let Some(hub_address) = &o.hub_address {
            config.ledger.hub_address = Some(hub_address.clone());
        }
        if let Some(deployments_file) = &o.deployments_file {
            config.ledger.deployments_file = Some(deployments_file.clone());
        }
        if let Some(secs) = o.poll_interval_secs {
            config.watcher.poll_interval_secs = secs;
        }
        if let Some(blocks) = o.lookback_blocks {
            config.watcher.lookback_blocks = blocks;
        }
        if let Some(secs) = o.call_timeout_secs {
            config.watcher.call_timeout_secs = secs;
        }
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    let watcher = &config.watcher;
    for (name, value) in [
        ("watcher.poll_interval_secs", watcher.poll_interval_secs),
        ("watcher.call_timeout_secs", watcher.call_timeout_secs),
        ("watcher.receipt_timeout_secs", watcher.receipt_timeout_secs),
    ] {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{name} must be greater than zero"
            )));
        }
    }
    if config.ledger.gas_limit == 0 {
        return Err(ConfigError::ValidationError(
            "ledger.gas_limit must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Explicit address first, then the deployments file.
fn resolve_hub_address(config: &FileConfig) -> Result<Address, ConfigError> {
    if let Some(address) = &config.ledger.hub_address {
        return parse_address(address);
    }

    let Some(path) = &config.ledger.deployments_file else {
        return Err(ConfigError::MissingHubAddress);
    };
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
        path: path.clone(),
        source,
    })?;
    let deployments: Deployments =
        serde_json::from_str(&content).map_err(|source| ConfigError::DeploymentsError {
            path: path.clone(),
            source,
        })?;
    tracing::info!(path = %path.display(), hub = %deployments.hub, "Hub address read from deployments file");
    parse_address(&deployments.hub)
}

fn parse_address(value: &str) -> Result<Address, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::ValidationError(format!("invalid hub address {value:?}: {e}")))
}

/// Get the oracle signer key from the environment.
pub fn get_private_key() -> Result<String, ConfigError> {
    std::env::var(PRIVATE_KEY_ENV)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or(ConfigError::MissingPrivateKey)
}
