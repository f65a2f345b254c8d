//! Polling controller
//!
//! Wraps any reader in a fixed-interval retrieval loop with an immediate
//! first fetch, manual refetch and deterministic teardown. One controller
//! task owns its `PollState`; nothing else writes to it, and nothing at all
//! writes to it after `stop()` — a completion arriving late is discarded,
//! not applied.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::oracle::{FeedError, PriceReading, QueryOptions};

use super::sources::PriceReader;

/// Latest outcome of a polling loop
#[derive(Debug, Clone, Default)]
pub struct PollState {
    /// Most recent successful reading; kept across failed cycles
    pub latest: Option<PriceReading>,
    pub is_fetching: bool,
    pub last_error: Option<FeedError>,
}

/// Polling parameters
#[derive(Debug, Clone)]
pub struct PollOptions {
    pub query: QueryOptions,
    /// Re-fetch interval; `None` fetches once and then only on `refetch()`
    pub interval_ms: Option<u64>,
}

impl PollOptions {
    pub fn new(query: QueryOptions) -> Self {
        Self {
            query,
            interval_ms: None,
        }
    }

    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = Some(interval_ms);
        self
    }
}

/// Handle to a running polling loop. Dropping the handle stops the loop.
pub struct PollHandle {
    state: Arc<Mutex<PollState>>,
    stopped: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    refetch_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Snapshot of the current poll state
    pub fn observe(&self) -> PollState {
        self.state.lock().expect("poll state lock poisoned").clone()
    }

    /// Trigger an immediate re-fetch without resetting the timer schedule.
    /// Coalesces with a refetch already pending.
    pub fn refetch(&self) {
        let _ = self.refetch_tx.try_send(());
    }

    /// Stop polling. The pending timer is cancelled and no further state
    /// mutation occurs, including from a retrieval already in flight.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop();
        self.task.abort();
    }
}

/// Start polling `reader` with the given options. The first fetch is issued
/// immediately; interval ticks follow from one full period later.
pub fn start_polling(reader: Arc<dyn PriceReader>, options: PollOptions) -> PollHandle {
    let state = Arc::new(Mutex::new(PollState::default()));
    let stopped = Arc::new(AtomicBool::new(false));
    let shutdown = Arc::new(Notify::new());
    let (refetch_tx, refetch_rx) = mpsc::channel(1);

    let task = tokio::spawn(run_loop(
        reader,
        options,
        Arc::clone(&state),
        Arc::clone(&stopped),
        Arc::clone(&shutdown),
        refetch_rx,
    ));

    PollHandle {
        state,
        stopped,
        shutdown,
        refetch_tx,
        task,
    }
}

async fn run_loop(
    reader: Arc<dyn PriceReader>,
    options: PollOptions,
    state: Arc<Mutex<PollState>>,
    stopped: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    mut refetch_rx: mpsc::Receiver<()>,
) {
    fetch_once(reader.as_ref(), &options.query, &state, &stopped).await;

    let mut ticker = options.interval_ms.map(|ms| {
        let period = Duration::from_millis(ms.max(1));
        // First fetch already happened; first tick fires one period from now
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    loop {
        if stopped.load(Ordering::SeqCst) {
            break;
        }

        tokio::select! {
            _ = tick(&mut ticker) => {
                fetch_once(reader.as_ref(), &options.query, &state, &stopped).await;
            }
            received = refetch_rx.recv() => {
                match received {
                    Some(()) => fetch_once(reader.as_ref(), &options.query, &state, &stopped).await,
                    None => break,
                }
            }
            _ = shutdown.notified() => break,
        }
    }
}

async fn tick(ticker: &mut Option<tokio::time::Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => futures_util::future::pending().await,
    }
}

async fn fetch_once(
    reader: &dyn PriceReader,
    query: &QueryOptions,
    state: &Mutex<PollState>,
    stopped: &AtomicBool,
) {
    if stopped.load(Ordering::SeqCst) {
        return;
    }

    {
        let mut state = state.lock().expect("poll state lock poisoned");
        state.is_fetching = true;
    }

    let result = reader.read(query).await;

    let mut state = state.lock().expect("poll state lock poisoned");
    // A stop() issued while the read was in flight wins: discard the result
    if stopped.load(Ordering::SeqCst) {
        return;
    }
    state.is_fetching = false;

    match result {
        Ok(reading) => {
            tracing::debug!(
                source = %reader.name(),
                price = %reading.formatted_price,
                stale = reading.is_stale,
                "Reading updated"
            );
            state.latest = Some(reading);
            state.last_error = None;
        }
        Err(e) => {
            tracing::warn!(source = %reader.name(), error = %e, "Retrieval failed");
            state.last_error = Some(e);
        }
    }
}
