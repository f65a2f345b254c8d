//! Configuration management for FeedLink
//!
//! Loads from YAML files + environment variables via .env

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::types::Network;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub feed: FeedConfig,
    pub chainlink: ChainlinkConfig,
    pub pyth: PythConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Network to query ("arbitrum", "arbitrum-sepolia")
    pub network: String,
    /// Reject readings older than this many seconds (0 = no policy)
    pub stale_after_secs: u64,
    /// Auto-refresh interval in milliseconds (0 = fetch once)
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainlinkConfig {
    /// AggregatorV3 contract address (empty = source disabled)
    pub feed_address: String,
    /// Custom RPC URL (empty = public RPC for the network)
    pub rpc_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PythConfig {
    /// 32-byte price feed id (empty = source disabled)
    pub feed_id: String,
    /// Custom attestation endpoint (empty = Hermes default)
    pub endpoint: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Config::builder()
            // Feed defaults
            .set_default("feed.network", "arbitrum")?
            .set_default("feed.stale_after_secs", 60)?
            .set_default("feed.poll_interval_ms", 5000)?
            // Chainlink defaults
            .set_default("chainlink.feed_address", "")?
            .set_default("chainlink.rpc_url", "")?
            // Pyth defaults
            .set_default("pyth.feed_id", "")?
            .set_default("pyth.endpoint", "")?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (FEEDLINK_*)
            .add_source(Environment::with_prefix("FEEDLINK").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;
        Ok(app_config)
    }

    /// Resolved network enum
    pub fn network(&self) -> Result<Network> {
        Network::from_str(&self.feed.network)
            .with_context(|| format!("Unsupported network {:?}", self.feed.network))
    }

    fn validate(&self) -> Result<()> {
        self.network()?;

        if self.chainlink.feed_address.is_empty() && self.pyth.feed_id.is_empty() {
            bail!("No feeds configured: set chainlink.feed_address and/or pyth.feed_id");
        }

        Ok(())
    }

    /// Generate a digest of the config for logging
    pub fn digest(&self) -> String {
        format!(
            "network={} stale_after={}s interval={}ms chainlink={} pyth={}",
            self.feed.network,
            self.feed.stale_after_secs,
            self.feed.poll_interval_ms,
            if self.chainlink.feed_address.is_empty() {
                "off"
            } else {
                &self.chainlink.feed_address
            },
            if self.pyth.feed_id.is_empty() {
                "off"
            } else {
                &self.pyth.feed_id
            },
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
