//! Oracle module - Uniform price retrieval from push and pull feeds
//!
//! Two readers (on-chain aggregator, attestation service) produce the same
//! normalized reading: a formatted decimal price, the source-native
//! fixed-point value, and a staleness verdict.

pub mod normalize;
pub mod poller;
pub mod sources;
pub mod staleness;

pub use poller::{start_polling, PollHandle, PollOptions, PollState};
pub use sources::{ChainlinkReader, PriceReader, PythReader};

use ethers::types::I256;
use thiserror::Error;

use crate::types::Network;

/// Errors surfaced by a single `read()` call
#[derive(Debug, Clone, Error)]
pub enum FeedError {
    /// Malformed feed identifier. Raised before any network I/O.
    #[error("Invalid feed identifier: {0}")]
    Validation(String),

    /// Network or service failure after exhausting the defined fallbacks.
    #[error("Source unavailable: {detail}")]
    SourceUnavailable {
        /// HTTP status when the failure came from an HTTP response
        status: Option<u16>,
        detail: String,
    },

    /// Success-status response whose body does not match the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl FeedError {
    pub(crate) fn unavailable(status: Option<u16>, detail: impl Into<String>) -> Self {
        FeedError::SourceUnavailable {
            status,
            detail: detail.into(),
        }
    }
}

/// Parameters for one retrieval. Constructed per call by the caller and not
/// retained beyond it.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub network: Network,
    /// Feed address (push, 20 bytes) or feed id (pull, 32 bytes), 0x-hex
    pub feed_id: String,
    /// Reject readings older than this many seconds
    pub stale_after_secs: Option<u64>,
    /// Custom RPC URL (push) or attestation base URL (pull)
    pub endpoint_override: Option<String>,
}

impl QueryOptions {
    pub fn new(network: Network, feed_id: impl Into<String>) -> Self {
        Self {
            network,
            feed_id: feed_id.into(),
            stale_after_secs: None,
            endpoint_override: None,
        }
    }

    pub fn with_stale_after(mut self, secs: u64) -> Self {
        self.stale_after_secs = Some(secs);
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint_override = Some(endpoint.into());
        self
    }
}

/// Source-specific round/version detail carried alongside a reading
#[derive(Debug, Clone)]
pub enum SourceInfo {
    Chainlink {
        round_id: u128,
        started_at: i64,
        answered_in_round: u128,
        decimals: u8,
    },
    Pyth {
        /// Feed id as returned by the service (no 0x prefix)
        id: String,
        /// Confidence interval in the same fixed-point scale as the price
        conf: String,
    },
}

/// Source-native decoded value. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct RawReading {
    /// Signed fixed-point magnitude; true value is `magnitude * 10^exponent`
    pub magnitude: I256,
    /// Power of ten, negative for fractional scales
    pub exponent: i32,
    /// Publish time in Unix seconds
    pub published_at: i64,
    pub source_info: SourceInfo,
}

/// Normalized, source-agnostic price reading
#[derive(Debug, Clone)]
pub struct PriceReading {
    /// Human-readable decimal price, truncated to 6 fractional digits
    pub formatted_price: String,
    pub raw: RawReading,
    pub is_stale: bool,
}

impl PriceReading {
    /// Derive a reading from a raw value, a staleness threshold and the
    /// current wall-clock time in Unix seconds.
    pub fn from_raw(raw: RawReading, stale_after_secs: Option<u64>, now: i64) -> Self {
        let formatted_price = normalize::format_fixed_point(raw.magnitude, raw.exponent);
        let is_stale = staleness::is_stale(raw.published_at, stale_after_secs, now);
        Self {
            formatted_price,
            raw,
            is_stale,
        }
    }
}
