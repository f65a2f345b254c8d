//! FeedLink watch-mode CLI
//!
//! Polls the configured oracle feeds and logs each reading until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use feedlink::config::AppConfig;
use feedlink::oracle::{
    start_polling, ChainlinkReader, PollHandle, PollOptions, PriceReader, PythReader, QueryOptions,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load()?;
    let network = config.network()?;
    info!(config = %config.digest(), "Starting FeedLink");

    let stale_after = match config.feed.stale_after_secs {
        0 => None,
        secs => Some(secs),
    };
    let interval_ms = match config.feed.poll_interval_ms {
        0 => None,
        ms => Some(ms),
    };

    let mut watches: Vec<(&'static str, PollHandle)> = Vec::new();

    if !config.chainlink.feed_address.is_empty() {
        let mut query = QueryOptions::new(network, config.chainlink.feed_address.clone());
        query.stale_after_secs = stale_after;
        if !config.chainlink.rpc_url.is_empty() {
            query.endpoint_override = Some(config.chainlink.rpc_url.clone());
        }

        let reader: Arc<dyn PriceReader> = Arc::new(ChainlinkReader::new());
        let mut options = PollOptions::new(query);
        options.interval_ms = interval_ms;
        watches.push(("Chainlink", start_polling(reader, options)));
    }

    if !config.pyth.feed_id.is_empty() {
        let mut query = QueryOptions::new(network, config.pyth.feed_id.clone());
        query.stale_after_secs = stale_after;
        if !config.pyth.endpoint.is_empty() {
            query.endpoint_override = Some(config.pyth.endpoint.clone());
        }

        let reader: Arc<dyn PriceReader> = Arc::new(PythReader::new());
        let mut options = PollOptions::new(query);
        options.interval_ms = interval_ms;
        watches.push(("Pyth", start_polling(reader, options)));
    }

    info!(feeds = watches.len(), "✅ Watching price feeds (Ctrl-C to stop)");

    let mut display = tokio::time::interval(Duration::from_millis(
        config.feed.poll_interval_ms.max(1000),
    ));

    loop {
        tokio::select! {
            _ = display.tick() => {
                for (source, handle) in &watches {
                    report(source, handle);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    for (_, handle) in &watches {
        handle.stop();
    }

    Ok(())
}

fn report(source: &str, handle: &PollHandle) {
    let state = handle.observe();

    if let Some(reading) = state.latest {
        info!(
            source = %source,
            price = %reading.formatted_price,
            stale = reading.is_stale,
            published_at = reading.raw.published_at,
            "Latest reading"
        );
    }

    if let Some(error) = state.last_error {
        warn!(source = %source, error = %error, "Last retrieval failed");
    }
}
