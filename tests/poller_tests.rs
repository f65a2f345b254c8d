//! Polling controller integration tests
//!
//! Drives `start_polling` through a scripted reader instead of a network
//! source to pin down the activation, refetch and teardown contract.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethers::types::I256;
use tokio::time::sleep;

use feedlink::oracle::{
    start_polling, FeedError, PollOptions, PriceReader, PriceReading, QueryOptions, RawReading,
    SourceInfo,
};
use feedlink::types::Network;

/// Reader whose outcome and latency are controlled by the test
struct ScriptedReader {
    delay_ms: u64,
    fail: AtomicBool,
    price: AtomicI64,
    calls: AtomicUsize,
}

impl ScriptedReader {
    fn new(delay_ms: u64, price: i64) -> Arc<Self> {
        Arc::new(Self {
            delay_ms,
            fail: AtomicBool::new(false),
            price: AtomicI64::new(price),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceReader for ScriptedReader {
    fn name(&self) -> &'static str {
        "Scripted"
    }

    async fn read(&self, _options: &QueryOptions) -> Result<PriceReading, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.delay_ms > 0 {
            sleep(Duration::from_millis(self.delay_ms)).await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(FeedError::SourceUnavailable {
                status: Some(503),
                detail: "scripted outage".to_string(),
            });
        }

        let raw = RawReading {
            magnitude: I256::from(self.price.load(Ordering::SeqCst)),
            exponent: -2,
            published_at: 1000,
            source_info: SourceInfo::Pyth {
                id: "aa".repeat(32),
                conf: "1".to_string(),
            },
        };
        Ok(PriceReading::from_raw(raw, None, 1000))
    }
}

fn poll_options(interval_ms: Option<u64>) -> PollOptions {
    let query = QueryOptions::new(Network::Arbitrum, format!("0x{}", "aa".repeat(32)));
    PollOptions {
        query,
        interval_ms,
    }
}

#[tokio::test]
async fn test_activation_fetches_immediately_without_interval() {
    let reader = ScriptedReader::new(0, 100);
    let handle = start_polling(reader.clone(), poll_options(None));

    sleep(Duration::from_millis(100)).await;

    let state = handle.observe();
    assert_eq!(reader.calls(), 1);
    assert!(!state.is_fetching);
    assert!(state.last_error.is_none());
    assert_eq!(state.latest.unwrap().formatted_price, "1.00");
}

#[tokio::test]
async fn test_interval_refetches_on_schedule() {
    let reader = ScriptedReader::new(0, 100);
    let handle = start_polling(reader.clone(), poll_options(Some(50)));

    sleep(Duration::from_millis(240)).await;

    // Immediate fetch plus at least three interval ticks
    assert!(reader.calls() >= 4, "only {} calls", reader.calls());
    handle.stop();
}

#[tokio::test]
async fn test_manual_refetch_applies_newest_completion() {
    let reader = ScriptedReader::new(0, 100);
    let handle = start_polling(reader.clone(), poll_options(None));

    sleep(Duration::from_millis(100)).await;
    assert_eq!(handle.observe().latest.unwrap().formatted_price, "1.00");

    reader.price.store(250, Ordering::SeqCst);
    handle.refetch();
    sleep(Duration::from_millis(100)).await;

    assert_eq!(reader.calls(), 2);
    assert_eq!(handle.observe().latest.unwrap().formatted_price, "2.50");
}

#[tokio::test]
async fn test_error_keeps_previous_reading_and_polling_continues() {
    let reader = ScriptedReader::new(0, 100);
    let handle = start_polling(reader.clone(), poll_options(None));

    sleep(Duration::from_millis(100)).await;

    reader.fail.store(true, Ordering::SeqCst);
    handle.refetch();
    sleep(Duration::from_millis(100)).await;

    let state = handle.observe();
    assert_eq!(
        state.latest.as_ref().unwrap().formatted_price,
        "1.00",
        "previous reading must survive a failed cycle"
    );
    assert!(matches!(
        state.last_error,
        Some(FeedError::SourceUnavailable { status: Some(503), .. })
    ));

    // Recovery clears the recorded error
    reader.fail.store(false, Ordering::SeqCst);
    reader.price.store(300, Ordering::SeqCst);
    handle.refetch();
    sleep(Duration::from_millis(100)).await;

    let state = handle.observe();
    assert_eq!(state.latest.unwrap().formatted_price, "3.00");
    assert!(state.last_error.is_none());
}

#[tokio::test]
async fn test_stop_discards_in_flight_completion() {
    let reader = ScriptedReader::new(200, 100);
    let handle = start_polling(reader.clone(), poll_options(None));

    // Let the first retrieval get in flight, then stop before it resolves
    sleep(Duration::from_millis(50)).await;
    assert_eq!(reader.calls(), 1);
    handle.stop();

    sleep(Duration::from_millis(300)).await;

    let state = handle.observe();
    assert!(handle.is_stopped());
    assert!(
        state.latest.is_none(),
        "late completion must not be applied after stop()"
    );
    assert!(state.last_error.is_none());
    assert_eq!(reader.calls(), 1);
}

#[tokio::test]
async fn test_stop_cancels_pending_timer() {
    let reader = ScriptedReader::new(0, 100);
    let handle = start_polling(reader.clone(), poll_options(Some(50)));

    sleep(Duration::from_millis(70)).await;
    handle.stop();
    let calls_at_stop = reader.calls();

    sleep(Duration::from_millis(200)).await;
    assert_eq!(
        reader.calls(),
        calls_at_stop,
        "no retrieval may start after stop()"
    );
}

#[tokio::test]
async fn test_refetch_after_stop_is_ignored() {
    let reader = ScriptedReader::new(0, 100);
    let handle = start_polling(reader.clone(), poll_options(None));

    sleep(Duration::from_millis(100)).await;
    handle.stop();
    sleep(Duration::from_millis(50)).await;

    handle.refetch();
    sleep(Duration::from_millis(100)).await;

    assert_eq!(reader.calls(), 1);
}
