//! Chainlink AggregatorV3 reader (push feed)
//!
//! Reads the latest stored round from an on-chain aggregator contract via
//! JSON-RPC. The reporter network pushes updates to the contract; this
//! reader only issues two view calls and decodes the result.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use ethers::contract::abigen;
use ethers::providers::{Http, Provider};
use ethers::types::{Address, I256, U256};

use crate::oracle::sources::{validate_hex_id, PriceReader};
use crate::oracle::{FeedError, PriceReading, QueryOptions, RawReading, SourceInfo};

// Chainlink Aggregator ABI for type-safe calls
abigen!(
    AggregatorV3,
    r#"[
        function decimals() external view returns (uint8)
        function latestRoundData() external view returns (uint80 roundId, int256 answer, uint256 startedAt, uint256 updatedAt, uint80 answeredInRound)
    ]"#,
);

/// Reader for Chainlink Data Feeds (AggregatorV3Interface)
#[derive(Debug, Clone, Default)]
pub struct ChainlinkReader;

impl ChainlinkReader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PriceReader for ChainlinkReader {
    fn name(&self) -> &'static str {
        "Chainlink"
    }

    async fn read(&self, options: &QueryOptions) -> Result<PriceReading, FeedError> {
        validate_hex_id(&options.feed_id, 20)?;
        let address: Address = options
            .feed_id
            .parse()
            .map_err(|_| FeedError::Validation(format!("Invalid feed address {:?}", options.feed_id)))?;

        let rpc_url = options
            .endpoint_override
            .as_deref()
            .unwrap_or_else(|| options.network.rpc_url());
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| FeedError::unavailable(None, format!("Invalid RPC endpoint: {}", e)))?;

        let feed = AggregatorV3::new(address, Arc::new(provider));

        tracing::debug!(
            source = %"Chainlink",
            network = %options.network,
            feed = %options.feed_id,
            "Reading latest round"
        );

        // Both calls are side-effect-free reads; issue them concurrently
        let decimals_call = feed.decimals();
        let round_call = feed.latest_round_data();
        let (decimals, round) = tokio::try_join!(decimals_call.call(), round_call.call())
            .map_err(|e| FeedError::unavailable(None, e.to_string()))?;

        let raw = raw_from_round(decimals, round)?;
        let now = Utc::now().timestamp();
        Ok(PriceReading::from_raw(raw, options.stale_after_secs, now))
    }
}

/// Decode the five-field round tuple into a raw reading. The contract's
/// `updatedAt` is the publish time; `decimals` gives the price scale as a
/// negative power of ten.
fn raw_from_round(
    decimals: u8,
    round: (u128, I256, U256, U256, u128),
) -> Result<RawReading, FeedError> {
    let (round_id, answer, started_at, updated_at, answered_in_round) = round;

    Ok(RawReading {
        magnitude: answer,
        exponent: -(decimals as i32),
        published_at: decode_timestamp(updated_at, "updatedAt")?,
        source_info: SourceInfo::Chainlink {
            round_id,
            started_at: decode_timestamp(started_at, "startedAt")?,
            answered_in_round,
            decimals,
        },
    })
}

fn decode_timestamp(value: U256, field: &str) -> Result<i64, FeedError> {
    if value.bits() > 63 {
        return Err(FeedError::MalformedResponse(format!(
            "{} does not fit in a Unix timestamp: {}",
            field, value
        )));
    }
    Ok(value.low_u64() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Network;

    fn round_tuple(answer: i64, updated_at: u64) -> (u128, I256, U256, U256, u128) {
        (
            18_446_744_073_709_551_700u128,
            I256::from(answer),
            U256::from(updated_at - 1),
            U256::from(updated_at),
            18_446_744_073_709_551_700u128,
        )
    }

    #[test]
    fn test_round_tuple_decoding() {
        let raw = raw_from_round(8, round_tuple(250_000_000_000, 1_700_000_000)).unwrap();

        assert_eq!(raw.magnitude, I256::from(250_000_000_000i64));
        assert_eq!(raw.exponent, -8);
        assert_eq!(raw.published_at, 1_700_000_000);
        match raw.source_info {
            SourceInfo::Chainlink {
                round_id,
                started_at,
                decimals,
                ..
            } => {
                assert_eq!(round_id, 18_446_744_073_709_551_700u128);
                assert_eq!(started_at, 1_699_999_999);
                assert_eq!(decimals, 8);
            }
            _ => panic!("expected aggregator metadata"),
        }
    }

    #[test]
    fn test_negative_answer_survives_decoding() {
        let raw = raw_from_round(2, round_tuple(-12345, 1_700_000_000)).unwrap();
        assert_eq!(raw.magnitude, I256::from(-12345));
    }

    #[test]
    fn test_oversized_timestamp_is_malformed() {
        let round = (1u128, I256::from(1), U256::from(1), U256::MAX, 1u128);
        assert!(matches!(
            raw_from_round(8, round),
            Err(FeedError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_address_fails_before_any_network_call() {
        let reader = ChainlinkReader::new();
        // Unroutable endpoint: a network attempt would surface as
        // SourceUnavailable, not Validation
        let options = QueryOptions::new(Network::Arbitrum, "0xnot-an-address")
            .with_endpoint("http://127.0.0.1:1");

        match reader.read(&options).await {
            Err(FeedError::Validation(_)) => {}
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_short_address_rejected() {
        let reader = ChainlinkReader::new();
        let options = QueryOptions::new(Network::Arbitrum, format!("0x{}", "ab".repeat(19)));

        assert!(matches!(
            reader.read(&options).await,
            Err(FeedError::Validation(_))
        ));
    }
}
