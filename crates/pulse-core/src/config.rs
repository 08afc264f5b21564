//! Configuration parsing for the market-data layer.
//!
//! Settings are read from a single JSON file. Every field has a production
//! default, so `{}` is a complete config and only overrides need to be
//! written down.
//!
//! # Example config
//!
//! ```json
//! {
//!   "logging": { "module_name": "pulse", "log_path": "/tmp/log" },
//!   "market_data": {
//!     "max_reconnect_attempts": 5,
//!     "reconnect_delay_ms": 3000,
//!     "ticker_ttl_ms": 5000,
//!     "release_policy": "ref_counted",
//!     "popular_symbols": ["BTCUSDT", "ETHUSDT"]
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::error::MarketDataError;

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Logging metadata (name, log path).
    #[serde(default)]
    pub logging: Option<LoggingMeta>,

    /// Market-data access layer settings.
    #[serde(default)]
    pub market_data: MarketDataConfig,
}

/// Logging metadata block.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingMeta {
    pub module_name: Option<String>,
    pub log_path: Option<String>,
}

impl AppConfig {
    /// Returns the module name used as the log file prefix.
    pub fn module_name(&self) -> String {
        self.logging
            .as_ref()
            .and_then(|m| m.module_name.clone())
            .unwrap_or_else(|| "pulse".to_string())
    }

    /// Returns the log directory, if file logging is configured.
    pub fn log_path(&self) -> Option<String> {
        self.logging.as_ref().and_then(|m| m.log_path.clone())
    }
}

/// What `release(symbol)` does when several observers share one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleasePolicy {
    /// Tear the stream down only when the last observer releases it.
    #[default]
    RefCounted,
    /// Tear the stream down on any release, regardless of other observers.
    Eager,
}

/// Settings for the price streams, the ticker cache and symbol search.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketDataConfig {
    /// REST base URL (e.g. `https://api.binance.com`).
    pub rest_base_url: String,

    /// Per-symbol stream base URL; `/{symbol}@trade` is appended.
    pub ws_base_url: String,

    /// Consecutive unsolicited closes tolerated before a stream fails.
    pub max_reconnect_attempts: u32,

    /// Fixed backoff before each reconnect, in milliseconds.
    pub reconnect_delay_ms: u64,

    /// Absolute lifetime of a cached 24h ticker fetch, in milliseconds.
    pub ticker_ttl_ms: u64,

    /// Quote asset a search result must trade against.
    pub search_quote_asset: String,

    /// Trading status a search result must have.
    pub search_status: String,

    /// Maximum number of search results.
    pub search_limit: usize,

    /// Queries shorter than this return no results without a request.
    pub search_min_query_len: usize,

    /// Buffered events per price feed before slow observers skip ahead.
    pub feed_capacity: usize,

    /// Shared-stream release behavior.
    pub release_policy: ReleasePolicy,

    /// Symbols shown when nothing has been searched.
    pub popular_symbols: Vec<String>,

    /// Extra HTTP headers for the WebSocket handshake.
    pub extra_headers: HashMap<String, String>,

    /// REST request timeout, in milliseconds.
    pub http_timeout_ms: u64,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            rest_base_url: default_rest_base_url(),
            ws_base_url: default_ws_base_url(),
            max_reconnect_attempts: 5,
            reconnect_delay_ms: 3_000,
            ticker_ttl_ms: 5_000,
            search_quote_asset: "USDT".into(),
            search_status: "TRADING".into(),
            search_limit: 10,
            search_min_query_len: 2,
            feed_capacity: 1024,
            release_policy: ReleasePolicy::default(),
            popular_symbols: vec!["BTCUSDT".into(), "ETHUSDT".into(), "BNBUSDT".into()],
            extra_headers: HashMap::new(),
            http_timeout_ms: 10_000,
        }
    }
}

impl MarketDataConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn ticker_ttl(&self) -> Duration {
        Duration::from_millis(self.ticker_ttl_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Check endpoint URLs and numeric bounds.
    pub fn validate(&self) -> Result<(), MarketDataError> {
        check_url(&self.rest_base_url, &["https", "http"])?;
        check_url(&self.ws_base_url, &["wss", "ws"])?;

        if self.ticker_ttl_ms == 0 {
            return Err(MarketDataError::Config("ticker_ttl_ms must be > 0".into()));
        }
        if self.search_limit == 0 {
            return Err(MarketDataError::Config("search_limit must be > 0".into()));
        }
        if self.feed_capacity == 0 {
            return Err(MarketDataError::Config("feed_capacity must be > 0".into()));
        }
        Ok(())
    }
}

fn check_url(raw: &str, schemes: &[&str]) -> Result<(), MarketDataError> {
    let parsed =
        url::Url::parse(raw).map_err(|e| MarketDataError::Config(format!("{raw}: {e}")))?;
    if !schemes.contains(&parsed.scheme()) {
        return Err(MarketDataError::Config(format!(
            "{raw}: scheme must be one of {schemes:?}"
        )));
    }
    Ok(())
}

fn default_rest_base_url() -> String {
    "https://api.binance.com".into()
}

fn default_ws_base_url() -> String {
    "wss://stream.binance.com:9443/ws".into()
}

/// Load and parse a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: AppConfig = serde_json::from_str(&content)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}
