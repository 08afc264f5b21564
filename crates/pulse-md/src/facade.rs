//! Market Data Facade: the single entry point for consumers.
//!
//! Owns the stream manager, the ticker cache and the search gateway for the
//! lifetime of the process; share it behind an `Arc`.

use std::collections::BTreeMap;
use std::sync::Arc;

use pulse_core::config::MarketDataConfig;
use pulse_core::ws::{StreamConnector, WsConnConfig, WsConnector};
use pulse_core::{ConnState, MarketDataError, MdResult, TickerSnapshot, display_pair};
use tracing::{info, warn};

use crate::rest::{BinanceRest, SnapshotSource, SymbolDirectory};
use crate::search::SymbolSearch;
use crate::stream::{PriceFeed, PriceStreamManager, StreamSettings};
use crate::ticker_cache::TickerCache;

/// Live feed plus 24h statistics for one observed symbol.
pub struct SymbolView {
    /// Uppercase symbol, e.g. `BTCUSDT`.
    pub symbol: String,
    pub feed: PriceFeed,
    /// A failed snapshot leaves the feed running; release is still owed.
    pub snapshot: MdResult<TickerSnapshot>,
}

impl SymbolView {
    /// `BTC/USDT` style label.
    pub fn display_pair(&self) -> String {
        display_pair(&self.symbol)
    }

    /// Live price once a tick has arrived, the snapshot's last price before.
    pub fn price(&self) -> Option<f64> {
        self.feed.current().or_else(|| {
            self.snapshot
                .as_ref()
                .ok()
                .and_then(|snap| snap.last_price)
        })
    }

    /// Position of the current price inside the 24h range, in percent.
    pub fn range_position(&self) -> Option<f64> {
        let snap = self.snapshot.as_ref().ok()?;
        snap.range_position(self.price()?)
    }
}

pub struct MarketData {
    config: MarketDataConfig,
    streams: PriceStreamManager,
    tickers: TickerCache,
    search: SymbolSearch,
}

impl MarketData {
    /// Validate `config` and wire up the Binance transports.
    pub fn start(config: MarketDataConfig) -> MdResult<Self> {
        config.validate()?;
        let connector = Arc::new(WsConnector::new(WsConnConfig {
            extra_headers: config.extra_headers.clone(),
        }));
        let rest = Arc::new(BinanceRest::new(&config.rest_base_url, config.http_timeout())?);
        info!(
            "[market-data] started (rest={}, ws={})",
            config.rest_base_url, config.ws_base_url
        );
        Ok(Self::with_sources(config, connector, rest))
    }

    /// Build over caller-supplied transports.
    pub fn with_sources<R>(
        config: MarketDataConfig,
        connector: Arc<dyn StreamConnector>,
        rest: Arc<R>,
    ) -> Self
    where
        R: SnapshotSource + SymbolDirectory + 'static,
    {
        let snapshots: Arc<dyn SnapshotSource> = rest.clone();
        let directory: Arc<dyn SymbolDirectory> = rest;
        Self {
            streams: PriceStreamManager::new(StreamSettings::from_config(&config), connector),
            tickers: TickerCache::new(snapshots, config.ticker_ttl()),
            search: SymbolSearch::new(directory, &config),
            config,
        }
    }

    /// Fetch the 24h snapshot, then start (or join) the live feed.
    ///
    /// The observer is attached only after the last await, so dropping this
    /// future early never leaves an observer behind.
    pub async fn observe(&self, symbol: &str) -> MdResult<SymbolView> {
        let snapshot = match self.tickers.get_snapshot(symbol).await {
            Err(e @ MarketDataError::InvalidSymbol(_)) => return Err(e),
            other => other,
        };
        if let Err(e) = &snapshot {
            warn!("[market-data] snapshot for {symbol} unavailable: {e}");
        }
        let feed = self.streams.observe(symbol)?;
        Ok(SymbolView {
            symbol: feed.symbol().to_uppercase(),
            feed,
            snapshot,
        })
    }

    pub fn release(&self, symbol: &str) {
        self.streams.release(symbol);
    }

    /// Symbol search; queries shorter than the configured minimum return
    /// nothing without a request.
    pub async fn search(&self, query: &str) -> Vec<String> {
        if query.trim().chars().count() < self.config.search_min_query_len {
            return Vec::new();
        }
        self.search.search(query).await
    }

    pub async fn snapshot(&self, symbol: &str) -> MdResult<TickerSnapshot> {
        self.tickers.get_snapshot(symbol).await
    }

    pub fn connection_status(&self) -> BTreeMap<String, ConnState> {
        self.streams.connection_status()
    }

    pub fn popular_symbols(&self) -> &[String] {
        &self.config.popular_symbols
    }

    /// Release every subscription and wait for the connections to close.
    pub async fn shutdown(&self) {
        self.streams.release_all().await;
        info!("[market-data] shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockRest, ScriptedConnector, symbol};
    use std::time::Duration;

    type Sessions = tokio::sync::mpsc::UnboundedReceiver<crate::testing::MockSession>;

    fn facade() -> (MarketData, Arc<ScriptedConnector>, Arc<MockRest>, Sessions) {
        let (connector, sessions) = ScriptedConnector::new(None);
        let rest = MockRest::new(Duration::ZERO);
        let md =
            MarketData::with_sources(MarketDataConfig::default(), connector.clone(), rest.clone());
        (md, connector, rest, sessions)
    }

    #[tokio::test(start_paused = true)]
    async fn observe_combines_feed_and_snapshot() {
        let (md, connector, _rest, mut sessions) = facade();

        let mut view = md.observe("btcusdt").await.unwrap();
        assert_eq!(view.symbol, "BTCUSDT");
        assert_eq!(view.display_pair(), "BTC/USDT");
        assert_eq!(view.price(), Some(101.0));
        assert!((view.range_position().unwrap() - 55.0).abs() < 1e-9);

        let session = sessions.recv().await.unwrap();
        session.send(r#"{"p":"105"}"#);
        assert_eq!(view.feed.next().await.unwrap().unwrap().price, 105.0);
        assert_eq!(view.price(), Some(105.0));
        assert!((view.range_position().unwrap() - 75.0).abs() < 1e-9);
        assert_eq!(connector.connects(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_snapshot_keeps_feed() {
        let (md, _connector, rest, _sessions) = facade();
        rest.fail_next_tickers(1);

        let mut view = md.observe("ETHUSDT").await.unwrap();
        assert!(matches!(view.snapshot, Err(MarketDataError::Http(_))));
        assert_eq!(view.range_position(), None);
        assert!(md.connection_status().contains_key("ethusdt"));

        md.release("ethusdt");
        assert!(view.feed.next().await.is_none());
        assert!(md.connection_status().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_observe_leaves_no_observer() {
        let (connector, _sessions) = ScriptedConnector::new(None);
        let rest = MockRest::new(Duration::from_secs(2));
        let md =
            MarketData::with_sources(MarketDataConfig::default(), connector.clone(), rest.clone());

        let timed_out =
            tokio::time::timeout(Duration::from_millis(100), md.observe("BTCUSDT")).await;
        assert!(timed_out.is_err());
        assert!(md.connection_status().is_empty());
        assert_eq!(connector.connects(), 0);

        // One full observe/release cycle must tear the stream down again.
        let mut view = md.observe("BTCUSDT").await.unwrap();
        assert_eq!(md.connection_status().len(), 1);
        md.release("BTCUSDT");
        assert!(view.feed.next().await.is_none());
        assert!(md.connection_status().is_empty());
        assert_eq!(rest.ticker_calls(), 1);
    }

    #[tokio::test]
    async fn invalid_symbol_touches_nothing() {
        let (md, connector, rest, _sessions) = facade();
        assert!(matches!(md.observe("").await, Err(MarketDataError::InvalidSymbol(_))));
        assert_eq!(connector.connects(), 0);
        assert_eq!(rest.ticker_calls(), 0);
    }

    #[tokio::test]
    async fn search_applies_length_guard() {
        let (md, _connector, rest, _sessions) = facade();
        rest.set_directory(Some(vec![symbol("BTCUSDT", "USDT", "TRADING")]));

        assert!(md.search("").await.is_empty());
        assert!(md.search("b").await.is_empty());
        assert_eq!(rest.directory_calls(), 0);

        assert_eq!(md.search("bt").await, vec!["BTCUSDT"]);
        assert_eq!(rest.directory_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_releases_everything() {
        let (md, _connector, _rest, _sessions) = facade();
        let mut a = md.observe("BTCUSDT").await.unwrap();
        let mut b = md.observe("ETHUSDT").await.unwrap();
        assert_eq!(md.connection_status().len(), 2);

        md.shutdown().await;
        assert!(a.feed.next().await.is_none());
        assert!(b.feed.next().await.is_none());
        assert!(md.connection_status().is_empty());
    }

    #[test]
    fn popular_defaults() {
        let (md, _connector, _rest, _sessions) = facade();
        assert_eq!(md.popular_symbols(), ["BTCUSDT", "ETHUSDT", "BNBUSDT"]);
    }

    #[test]
    fn start_rejects_bad_config() {
        let config = MarketDataConfig {
            ws_base_url: "https://not-a-socket".into(),
            ..Default::default()
        };
        assert!(matches!(MarketData::start(config), Err(MarketDataError::Config(_))));
    }
}
