//! Pyth attestation reader (pull feed)
//!
//! Fetches signed price updates from a Hermes relay over HTTP. Test-network
//! feeds are frequently unpublished, so a 404 walks a fallback ladder:
//! main-network chain tag first, then no chain tag at all.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use ethers::types::I256;
use reqwest::Client;
use serde::Deserialize;

use crate::oracle::sources::{validate_hex_id, PriceReader};
use crate::oracle::{FeedError, PriceReading, QueryOptions, RawReading, SourceInfo};

/// Hermes latest-update endpoint.
/// Docs: https://hermes.pyth.network/docs/#/rest/latest_price_updates
const HERMES_API_URL: &str = "https://hermes.pyth.network/v2/updates/price/latest";

/// Raw HTTP outcome, decoupled from the client so the fallback ladder can be
/// exercised without a network.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// Transport seam for the attestation service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttestationTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpReply, FeedError>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AttestationTransport for HttpTransport {
    async fn get(&self, url: &str) -> Result<HttpReply, FeedError> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedError::unavailable(None, e.to_string()))?;

        let status = res.status().as_u16();
        let body = res.text().await.unwrap_or_else(|_| String::new());
        Ok(HttpReply { status, body })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct LatestPriceResponse {
    parsed: Option<Vec<ParsedAttestation>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ParsedAttestation {
    id: String,
    price: AttestationPrice,
}

#[derive(Debug, Clone, Deserialize)]
struct AttestationPrice {
    price: String,
    conf: String,
    expo: i32,
    publish_time: i64,
}

/// Reader for Pyth price feeds served by a Hermes relay
pub struct PythReader {
    transport: Arc<dyn AttestationTransport>,
}

impl PythReader {
    pub fn new() -> Self {
        Self {
            transport: Arc::new(HttpTransport::new()),
        }
    }

    pub fn with_transport(transport: Arc<dyn AttestationTransport>) -> Self {
        Self { transport }
    }

    async fn fetch(
        &self,
        base: &str,
        feed_id: &str,
        chain_tag: Option<&str>,
    ) -> Result<HttpReply, FeedError> {
        let url = build_url(base, feed_id, chain_tag);
        tracing::debug!(source = %"Pyth", url = %url, "Requesting attestation");
        self.transport.get(&url).await
    }
}

impl Default for PythReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceReader for PythReader {
    fn name(&self) -> &'static str {
        "Pyth"
    }

    async fn read(&self, options: &QueryOptions) -> Result<PriceReading, FeedError> {
        validate_hex_id(&options.feed_id, 32)?;

        let base = options
            .endpoint_override
            .as_deref()
            .unwrap_or(HERMES_API_URL);

        let mut reply = self
            .fetch(base, &options.feed_id, Some(options.network.chain_tag()))
            .await?;

        // Test-network feeds are often unpublished; the main-network feed is
        // an acceptable substitute for display purposes
        if reply.status == 404 && options.network.is_test_network() {
            let main_tag = options.network.main_network().chain_tag();
            tracing::debug!(source = %"Pyth", chain = %main_tag, "Feed not found, retrying main network");
            reply = self.fetch(base, &options.feed_id, Some(main_tag)).await?;
        }

        // Some feeds are chain-agnostic
        if reply.status == 404 {
            tracing::debug!(source = %"Pyth", "Feed not found, retrying without chain tag");
            reply = self.fetch(base, &options.feed_id, None).await?;
        }

        if !(200..300).contains(&reply.status) {
            return Err(FeedError::unavailable(Some(reply.status), reply.body));
        }

        let raw = parse_attestation(&reply.body, &options.feed_id)?;
        let now = Utc::now().timestamp();
        Ok(PriceReading::from_raw(raw, options.stale_after_secs, now))
    }
}

// The service expects an array-style ids parameter (ids%5B%5D = ids[])
fn build_url(base: &str, feed_id: &str, chain_tag: Option<&str>) -> String {
    let mut url = format!("{}?ids%5B%5D={}", base, feed_id);
    if let Some(tag) = chain_tag {
        url.push_str("&chain=");
        url.push_str(tag);
    }
    url
}

/// The service answers ids without the 0x prefix; compare on the stripped,
/// lowercased form.
fn canonical_feed_id(id: &str) -> String {
    id.trim_start_matches("0x").to_lowercase()
}

fn parse_attestation(body: &str, requested_id: &str) -> Result<RawReading, FeedError> {
    let response: LatestPriceResponse = serde_json::from_str(body)
        .map_err(|e| FeedError::MalformedResponse(format!("Undecodable attestation body: {}", e)))?;

    let parsed = response.parsed.unwrap_or_default();
    if parsed.is_empty() {
        return Err(FeedError::MalformedResponse(
            "No attestations in response".to_string(),
        ));
    }

    // Exact id match when possible; first entry as a defensive default
    let wanted = canonical_feed_id(requested_id);
    let entry = parsed
        .iter()
        .find(|p| canonical_feed_id(&p.id) == wanted)
        .unwrap_or(&parsed[0]);

    let magnitude = I256::from_dec_str(&entry.price.price).map_err(|e| {
        FeedError::MalformedResponse(format!("Undecodable price {:?}: {}", entry.price.price, e))
    })?;

    Ok(RawReading {
        magnitude,
        exponent: entry.price.expo,
        published_at: entry.price.publish_time,
        source_info: SourceInfo::Pyth {
            id: entry.id.clone(),
            conf: entry.price.conf.clone(),
        },
    })
}
