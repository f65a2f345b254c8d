//! Core types used throughout FeedLink
//!
//! Defines the supported networks and their per-source endpoint mapping.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    Arbitrum,
    ArbitrumSepolia,
}

impl Default for Network {
    fn default() -> Self {
        Network::Arbitrum
    }
}

impl Network {
    /// EVM chain id
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Arbitrum => 42161,
            Network::ArbitrumSepolia => 421614,
        }
    }

    /// Canonical public JSON-RPC endpoint
    pub fn rpc_url(&self) -> &'static str {
        match self {
            Network::Arbitrum => "https://arb1.arbitrum.io/rpc",
            Network::ArbitrumSepolia => "https://sepolia-rollup.arbitrum.io/rpc",
        }
    }

    /// Chain tag understood by the attestation service
    pub fn chain_tag(&self) -> &'static str {
        match self {
            Network::Arbitrum => "arbitrum",
            Network::ArbitrumSepolia => "arbitrum_sepolia",
        }
    }

    pub fn is_test_network(&self) -> bool {
        matches!(self, Network::ArbitrumSepolia)
    }

    /// Main network counterpart. Feeds unpublished on a test network are
    /// retried against this network's tag.
    pub fn main_network(&self) -> Network {
        match self {
            Network::Arbitrum | Network::ArbitrumSepolia => Network::Arbitrum,
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "arbitrum" => Some(Network::Arbitrum),
            "arbitrum-sepolia" => Some(Network::ArbitrumSepolia),
            _ => None,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Arbitrum => write!(f, "arbitrum"),
            Network::ArbitrumSepolia => write!(f, "arbitrum-sepolia"),
        }
    }
}
