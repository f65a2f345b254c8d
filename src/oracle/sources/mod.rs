//! Price reader implementations (Chainlink aggregator, Pyth attestation)

mod chainlink;
mod pyth;

pub use chainlink::ChainlinkReader;
pub use pyth::{AttestationTransport, HttpReply, HttpTransport, PythReader};

use async_trait::async_trait;

use crate::oracle::{FeedError, PriceReading, QueryOptions};

/// Trait for price feed readers
#[async_trait]
pub trait PriceReader: Send + Sync {
    /// Get the source name
    fn name(&self) -> &'static str;

    /// Retrieve the latest reading for the feed addressed by `options`
    async fn read(&self, options: &QueryOptions) -> Result<PriceReading, FeedError>;
}

/// Check that `id` is `0x` followed by exactly `expected_bytes * 2` hex
/// characters. Runs before any network call.
pub(crate) fn validate_hex_id(id: &str, expected_bytes: usize) -> Result<(), FeedError> {
    let digits = id.strip_prefix("0x").ok_or_else(|| {
        FeedError::Validation(format!("Expected 0x-prefixed hex string, got {:?}", id))
    })?;

    if digits.len() != expected_bytes * 2 {
        return Err(FeedError::Validation(format!(
            "Expected {}-byte hex string (0x + {} hex chars), got {} chars",
            expected_bytes,
            expected_bytes * 2,
            digits.len()
        )));
    }

    hex::decode(digits)
        .map_err(|_| FeedError::Validation(format!("Non-hex characters in identifier {:?}", id)))?;

    Ok(())
}
