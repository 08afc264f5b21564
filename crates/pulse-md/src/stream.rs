//! Price Stream Manager: one live trade stream per symbol, shared by any
//! number of observers.
//!
//! # Architecture
//!
//! ```text
//! observe("BTCUSDT") ──► registry["btcusdt"] ──► Subscription task
//!                              │                    │  connect ─► pump ticks ─► publish
//!                              │                    │  unsolicited close ─► backoff ─► reconnect
//!                              ▼                    ▼
//!                          PriceFeed  ◄── watch (last price) + broadcast (events)
//! ```
//!
//! Each Subscription is a single tokio task and the only writer of its state,
//! its connection and its feed. The manager owns the registry; a task touches
//! the registry only to check its own membership after a backoff, or to
//! remove itself once its reconnect budget is spent.
//!
//! Delivery is at-most-once: ticks arriving while a connection is down are
//! lost, and a feed that falls more than `feed_capacity` events behind skips
//! the overflow.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use ahash::AHashMap;
use parking_lot::Mutex;
use pulse_core::config::{MarketDataConfig, ReleasePolicy};
use pulse_core::ws::{StreamConnector, TextStream};
use pulse_core::{ConnState, MarketDataError, MdResult, PriceTick, stream_key};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::binance::{self, json_parser};

type Registry = Arc<Mutex<AHashMap<String, Subscription>>>;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Tunables for the stream manager.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Base URL; `/{symbol}@trade` is appended per subscription.
    pub ws_base_url: String,
    /// Consecutive unsolicited closes tolerated before the feed fails.
    pub max_reconnect_attempts: u32,
    /// Fixed delay before each reconnect.
    pub reconnect_delay: Duration,
    /// Whether `release` is reference-counted.
    pub release_policy: ReleasePolicy,
    /// Broadcast buffer per subscription.
    pub feed_capacity: usize,
}

impl StreamSettings {
    pub fn from_config(cfg: &MarketDataConfig) -> Self {
        Self {
            ws_base_url: cfg.ws_base_url.clone(),
            max_reconnect_attempts: cfg.max_reconnect_attempts,
            reconnect_delay: cfg.reconnect_delay(),
            release_policy: cfg.release_policy,
            feed_capacity: cfg.feed_capacity,
        }
    }
}

// ---------------------------------------------------------------------------
// PriceFeed
// ---------------------------------------------------------------------------

/// Events carried on a subscription's broadcast channel.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    Price(PriceTick),
    /// Released; the feed completes without error.
    Closed,
    /// Reconnect budget exhausted; the feed completes with this error.
    Failed(MarketDataError),
}

/// A long-lived handle on one symbol's live price.
///
/// The handle outlives individual connections: reconnects are invisible
/// except for a gap in ticks.
pub struct PriceFeed {
    symbol: String,
    latest: watch::Receiver<Option<f64>>,
    events: broadcast::Receiver<FeedEvent>,
    finished: bool,
}

impl PriceFeed {
    /// Stream key (lowercase) of the observed symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Last known price, `None` until the first valid tick arrives.
    pub fn current(&self) -> Option<f64> {
        *self.latest.borrow()
    }

    /// Next tick, in arrival order.
    ///
    /// Returns `None` once the subscription is released, and a single
    /// `Some(Err(_))` if it failed permanently (then `None` after that).
    pub async fn next(&mut self) -> Option<MdResult<PriceTick>> {
        if self.finished {
            return None;
        }
        loop {
            match self.events.recv().await {
                Ok(FeedEvent::Price(tick)) => return Some(Ok(tick)),
                Ok(FeedEvent::Closed) | Err(RecvError::Closed) => {
                    self.finished = true;
                    return None;
                }
                Ok(FeedEvent::Failed(e)) => {
                    self.finished = true;
                    return Some(Err(e));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("[feed-{}] slow observer skipped {skipped} events", self.symbol);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Subscription state
// ---------------------------------------------------------------------------

/// State shared between a subscription's task and its feeds.
///
/// Every emission and state change goes through `state`'s lock, so once the
/// state is `Closed` nothing else reaches the feed.
struct SubscriptionShared {
    symbol: String,
    state: Mutex<ConnState>,
    attempts: AtomicU32,
    latest: watch::Sender<Option<f64>>,
    events: broadcast::Sender<FeedEvent>,
}

impl SubscriptionShared {
    fn new(symbol: String, capacity: usize) -> Self {
        let (latest, _) = watch::channel(None);
        let (events, _) = broadcast::channel(capacity);
        Self {
            symbol,
            state: Mutex::new(ConnState::Connecting),
            attempts: AtomicU32::new(0),
            latest,
            events,
        }
    }

    fn feed(&self) -> PriceFeed {
        PriceFeed {
            symbol: self.symbol.clone(),
            latest: self.latest.subscribe(),
            events: self.events.subscribe(),
            finished: false,
        }
    }

    fn state(&self) -> ConnState {
        *self.state.lock()
    }

    /// Move to `next`; returns `false` if the subscription is already closed.
    fn transition(&self, next: ConnState) -> bool {
        let mut state = self.state.lock();
        if state.is_terminal() {
            return false;
        }
        *state = next;
        true
    }

    fn publish(&self, tick: PriceTick) {
        let state = self.state.lock();
        if state.is_terminal() {
            return;
        }
        self.latest.send_replace(Some(tick.price));
        // No receivers is fine: nobody is listening right now.
        let _ = self.events.send(FeedEvent::Price(tick));
    }

    /// Enter the terminal state and emit the final event, once.
    fn finish(&self, event: FeedEvent) -> bool {
        let mut state = self.state.lock();
        if state.is_terminal() {
            return false;
        }
        *state = ConnState::Closed;
        let _ = self.events.send(event);
        true
    }
}

/// Registry entry for one symbol.
struct Subscription {
    id: u64,
    observers: usize,
    shared: Arc<SubscriptionShared>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Complete the feed and signal the task to close its connection.
    fn close(mut self) -> Option<JoinHandle<()>> {
        self.shared.finish(FeedEvent::Closed);
        let _ = self.shutdown_tx.send(true);
        self.task.take()
    }
}

// ---------------------------------------------------------------------------
// Subscription task
// ---------------------------------------------------------------------------

struct SubscriptionTask {
    id: u64,
    url: String,
    shared: Arc<SubscriptionShared>,
    connector: Arc<dyn StreamConnector>,
    registry: Registry,
    max_attempts: u32,
    delay: Duration,
}

impl SubscriptionTask {
    /// Connect and pump ticks, reconnecting until released or out of attempts.
    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let label = format!("stream-{}", self.shared.symbol);

        loop {
            if *shutdown_rx.borrow() || !self.shared.transition(ConnState::Connecting) {
                return;
            }
            info!("[{label}] connecting to {}", self.url);

            let connected = tokio::select! {
                biased;
                _ = shutdown_rx.changed() => return,
                res = self.connector.connect(&self.url) => res,
            };

            match connected {
                Ok(mut stream) => {
                    if !self.shared.transition(ConnState::Open) {
                        stream.close().await;
                        return;
                    }
                    self.shared.attempts.store(0, Ordering::Relaxed);
                    info!("[{label}] connected");

                    if self.pump(&label, stream.as_mut(), &mut shutdown_rx).await {
                        stream.close().await;
                        info!("[{label}] closed");
                        return;
                    }
                }
                Err(e) => warn!("[{label}] connection failed: {e}"),
            }

            // Unsolicited close, or a connect that never opened.
            let attempts = self.shared.attempts.load(Ordering::Relaxed);
            if attempts >= self.max_attempts {
                error!("[{label}] giving up after {attempts} reconnect attempts");
                self.deregister();
                self.shared.finish(FeedEvent::Failed(MarketDataError::ReconnectExhausted {
                    symbol: self.shared.symbol.clone(),
                    attempts,
                }));
                return;
            }
            self.shared.attempts.store(attempts + 1, Ordering::Relaxed);
            if !self.shared.transition(ConnState::Reconnecting) {
                return;
            }
            warn!(
                "[{label}] disconnected, reconnect {}/{} in {:?}",
                attempts + 1,
                self.max_attempts,
                self.delay
            );

            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => return,
                _ = tokio::time::sleep(self.delay) => {}
            }
            if !self.is_registered() {
                debug!("[{label}] reconnect timer fired after release, ignoring");
                return;
            }
        }
    }

    /// Forward ticks until the connection drops (`false`) or a release
    /// arrives (`true`).
    async fn pump(
        &self,
        label: &str,
        stream: &mut dyn TextStream,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> bool {
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => return true,
                msg = stream.next_text() => match msg {
                    Some(Ok(text)) => {
                        match json_parser::parse_trade_tick(&self.shared.symbol, &text) {
                            Ok(tick) => self.shared.publish(tick),
                            Err(e) => warn!("[{label}] dropped tick: {e}"),
                        }
                    }
                    Some(Err(e)) => {
                        warn!("[{label}] read error: {e}");
                        return false;
                    }
                    None => {
                        warn!("[{label}] stream closed by remote");
                        return false;
                    }
                },
            }
        }
    }

    fn is_registered(&self) -> bool {
        self.registry
            .lock()
            .get(&self.shared.symbol)
            .is_some_and(|sub| sub.id == self.id)
    }

    fn deregister(&self) {
        let mut registry = self.registry.lock();
        if registry
            .get(&self.shared.symbol)
            .is_some_and(|sub| sub.id == self.id)
        {
            registry.remove(&self.shared.symbol);
        }
    }
}

// ---------------------------------------------------------------------------
// PriceStreamManager
// ---------------------------------------------------------------------------

/// Registry of live price subscriptions, at most one connection per symbol.
pub struct PriceStreamManager {
    settings: StreamSettings,
    connector: Arc<dyn StreamConnector>,
    registry: Registry,
    next_id: AtomicU64,
}

impl PriceStreamManager {
    pub fn new(settings: StreamSettings, connector: Arc<dyn StreamConnector>) -> Self {
        Self {
            settings,
            connector,
            registry: Arc::new(Mutex::new(AHashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Get a feed for `symbol`, opening a connection only if none exists.
    ///
    /// Must be called from within a tokio runtime.
    pub fn observe(&self, symbol: &str) -> MdResult<PriceFeed> {
        let key = stream_key(symbol)?;
        let mut registry = self.registry.lock();

        if let Some(sub) = registry.get_mut(&key) {
            sub.observers += 1;
            debug!("[stream-{key}] observer attached ({} total)", sub.observers);
            return Ok(sub.shared.feed());
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::new(SubscriptionShared::new(key.clone(), self.settings.feed_capacity));
        let feed = shared.feed();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = SubscriptionTask {
            id,
            url: binance::trade_stream_url(&self.settings.ws_base_url, &key),
            shared: Arc::clone(&shared),
            connector: Arc::clone(&self.connector),
            registry: Arc::clone(&self.registry),
            max_attempts: self.settings.max_reconnect_attempts,
            delay: self.settings.reconnect_delay,
        };
        let handle = tokio::spawn(task.run(shutdown_rx));

        registry.insert(
            key.clone(),
            Subscription {
                id,
                observers: 1,
                shared,
                shutdown_tx,
                task: Some(handle),
            },
        );
        info!("[stream-{key}] subscription created");
        Ok(feed)
    }

    /// Detach one observer; tear the subscription down per the release policy.
    ///
    /// Unknown symbols are a no-op.
    pub fn release(&self, symbol: &str) {
        let Ok(key) = stream_key(symbol) else {
            return;
        };

        let removed = {
            let mut registry = self.registry.lock();
            let Some(sub) = registry.get_mut(&key) else {
                debug!("[stream-{key}] release without subscription, ignoring");
                return;
            };
            if self.settings.release_policy == ReleasePolicy::RefCounted && sub.observers > 1 {
                sub.observers -= 1;
                debug!("[stream-{key}] observer detached ({} left)", sub.observers);
                return;
            }
            registry.remove(&key)
        };

        if let Some(sub) = removed {
            // The task closes its own connection; no need to wait for it here.
            drop(sub.close());
            info!("[stream-{key}] released");
        }
    }

    /// Release every subscription and wait for their tasks to finish.
    pub async fn release_all(&self) {
        let drained: Vec<Subscription> = self.registry.lock().drain().map(|(_, s)| s).collect();
        let count = drained.len();

        let handles: Vec<JoinHandle<()>> = drained
            .into_iter()
            .filter_map(Subscription::close)
            .collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("[stream] subscription task ended abnormally: {e}");
            }
        }
        info!("[stream] released {count} subscription(s)");
    }

    /// Diagnostic snapshot of every registered subscription's state.
    pub fn connection_status(&self) -> BTreeMap<String, ConnState> {
        self.registry
            .lock()
            .iter()
            .map(|(symbol, sub)| (symbol.clone(), sub.shared.state()))
            .collect()
    }

    /// Number of observers attached to `symbol` (0 if not registered).
    pub fn observer_count(&self, symbol: &str) -> usize {
        let Ok(key) = stream_key(symbol) else {
            return 0;
        };
        self.registry.lock().get(&key).map_or(0, |sub| sub.observers)
    }
}

impl Drop for PriceStreamManager {
    fn drop(&mut self) {
        let drained: Vec<Subscription> = self.registry.lock().drain().map(|(_, s)| s).collect();
        for sub in drained {
            drop(sub.close());
        }
    }
}
