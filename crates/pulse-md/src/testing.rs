//! In-memory transports for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pulse_core::ws::{StreamConnector, TextStream};
use pulse_core::{MarketDataError, MdResult, SymbolInfo, TickerSnapshot};
use tokio::sync::{Notify, mpsc};

use crate::rest::{SnapshotSource, SymbolDirectory};

// ---------------------------------------------------------------------------
// Streams
// ---------------------------------------------------------------------------

/// One connection handed out by [`ScriptedConnector`].
///
/// Dropping it ends the stream as if the remote hung up.
pub(crate) struct MockSession {
    pub url: String,
    tx: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

impl MockSession {
    pub fn send(&self, text: &str) {
        let _ = self.tx.send(text.to_string());
    }

    /// Whether the owner closed this connection itself.
    pub fn closed_normally(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct MockStream {
    rx: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl TextStream for MockStream {
    async fn next_text(&mut self) -> Option<Result<String, MarketDataError>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Connector whose sessions are driven by the test.
pub(crate) struct ScriptedConnector {
    sessions: mpsc::UnboundedSender<MockSession>,
    connects: AtomicUsize,
    /// Connects beyond this count are refused.
    succeed_first: Option<usize>,
    /// When set, every connect waits for a permit before proceeding.
    gate: Option<Arc<Notify>>,
}

impl ScriptedConnector {
    pub fn new(succeed_first: Option<usize>) -> (Arc<Self>, mpsc::UnboundedReceiver<MockSession>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            sessions: tx,
            connects: AtomicUsize::new(0),
            succeed_first,
            gate: None,
        });
        (connector, rx)
    }

    /// A connector whose connects hang until the returned `Notify` is
    /// signalled.
    pub fn gated() -> (Arc<Self>, mpsc::UnboundedReceiver<MockSession>, Arc<Notify>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let gate = Arc::new(Notify::new());
        let connector = Arc::new(Self {
            sessions: tx,
            connects: AtomicUsize::new(0),
            succeed_first: None,
            gate: Some(Arc::clone(&gate)),
        });
        (connector, rx, gate)
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamConnector for ScriptedConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn TextStream>, MarketDataError> {
        let n = self.connects.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.succeed_first.is_some_and(|limit| n > limit) {
            return Err(MarketDataError::WebSocket("connection refused".into()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let _ = self.sessions.send(MockSession {
            url: url.to_string(),
            tx,
            closed: Arc::clone(&closed),
        });
        Ok(Box::new(MockStream { rx, closed }))
    }
}

// ---------------------------------------------------------------------------
// REST
// ---------------------------------------------------------------------------

/// Counting REST double with a configurable latency.
pub(crate) struct MockRest {
    delay: Duration,
    ticker_calls: AtomicUsize,
    directory_calls: AtomicUsize,
    /// Number of upcoming ticker fetches that fail.
    failures_left: AtomicUsize,
    directory: Mutex<Option<Vec<SymbolInfo>>>,
}

impl MockRest {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ticker_calls: AtomicUsize::new(0),
            directory_calls: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(0),
            directory: Mutex::new(Some(Vec::new())),
        })
    }

    pub fn fail_next_tickers(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    /// `None` makes every directory fetch fail.
    pub fn set_directory(&self, symbols: Option<Vec<SymbolInfo>>) {
        *self.directory.lock() = symbols;
    }

    pub fn ticker_calls(&self) -> usize {
        self.ticker_calls.load(Ordering::SeqCst)
    }

    pub fn directory_calls(&self) -> usize {
        self.directory_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for MockRest {
    async fn fetch_ticker(&self, symbol: &str) -> MdResult<TickerSnapshot> {
        let call = self.ticker_calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(MarketDataError::Http("503 Service Unavailable".into()));
        }
        Ok(TickerSnapshot {
            symbol: symbol.to_string(),
            last_price: Some(100.0 + call as f64),
            price_change_percent: Some(1.5),
            volume: Some(1_000.0),
            high_price: Some(110.0),
            low_price: Some(90.0),
        })
    }
}

#[async_trait]
impl SymbolDirectory for MockRest {
    async fn fetch_symbols(&self) -> MdResult<Vec<SymbolInfo>> {
        self.directory_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.directory
            .lock()
            .clone()
            .ok_or_else(|| MarketDataError::Http("connection reset".into()))
    }
}

pub(crate) fn symbol(name: &str, quote: &str, status: &str) -> SymbolInfo {
    SymbolInfo {
        symbol: name.to_string(),
        base_asset: name.trim_end_matches(quote).to_string(),
        quote_asset: quote.to_string(),
        status: status.to_string(),
    }
}
