//! Ticker Cache: short-lived, de-duplicated 24h ticker fetches.
//!
//! An entry is created by the first request for a symbol and holds the
//! shared in-flight fetch. Every request inside the entry's lifetime awaits
//! that same fetch, so concurrent callers trigger one HTTP request between
//! them. The lifetime is absolute from creation; reads never extend it.
//!
//! A fetch that fails evicts its own entry, so the next caller retries
//! instead of receiving a cached error.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use ahash::AHashMap;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use pulse_core::{MdResult, TickerSnapshot, rest_key};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::rest::SnapshotSource;

type SharedFetch = Shared<BoxFuture<'static, MdResult<TickerSnapshot>>>;
type Entries = Mutex<AHashMap<String, CacheEntry>>;

struct CacheEntry {
    id: u64,
    fetch: SharedFetch,
    expires_at: Instant,
}

pub struct TickerCache {
    source: Arc<dyn SnapshotSource>,
    ttl: Duration,
    entries: Arc<Entries>,
    next_id: AtomicU64,
}

impl TickerCache {
    pub fn new(source: Arc<dyn SnapshotSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            entries: Arc::new(Mutex::new(AHashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// 24h statistics for `symbol` (any casing).
    pub async fn get_snapshot(&self, symbol: &str) -> MdResult<TickerSnapshot> {
        let key = rest_key(symbol)?;
        let fetch = self.entry(&key);
        fetch.await
    }

    /// Return the live entry's fetch, or create one.
    fn entry(&self, key: &str) -> SharedFetch {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.get(key).filter(|e| now < e.expires_at) {
            debug!("[ticker-cache] hit {key}");
            return entry.fetch.clone();
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let expires_at = now + self.ttl;
        let fetch = self.shared_fetch(key.to_string(), id);

        entries.insert(
            key.to_string(),
            CacheEntry {
                id,
                fetch: fetch.clone(),
                expires_at,
            },
        );
        debug!("[ticker-cache] miss {key}, fetching");

        let weak = Arc::downgrade(&self.entries);
        let symbol = key.to_string();
        tokio::spawn(async move {
            tokio::time::sleep_until(expires_at).await;
            if let Some(entries) = weak.upgrade() {
                evict(&entries, &symbol, id);
            }
        });

        fetch
    }

    fn shared_fetch(&self, symbol: String, id: u64) -> SharedFetch {
        let source = Arc::clone(&self.source);
        let weak = Arc::downgrade(&self.entries);
        async move {
            let result = source.fetch_ticker(&symbol).await;
            if let Err(e) = &result {
                warn!("[ticker-cache] fetch {symbol} failed: {e}");
                if let Some(entries) = weak.upgrade() {
                    evict(&entries, &symbol, id);
                }
            }
            result
        }
        .boxed()
        .shared()
    }
}

/// Remove `symbol` only if it still holds entry `id`.
fn evict(entries: &Entries, symbol: &str, id: u64) {
    let mut entries = entries.lock();
    if entries.get(symbol).is_some_and(|e| e.id == id) {
        entries.remove(symbol);
    }
}
