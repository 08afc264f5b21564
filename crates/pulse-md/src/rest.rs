//! Binance public REST client.
//!
//! | Operation    | Method | Path                    |
//! |--------------|--------|-------------------------|
//! | 24h ticker   | GET    | `/api/v3/ticker/24hr`   |
//! | Exchange info| GET    | `/api/v3/exchangeInfo`  |
//!
//! The two traits are the seams the ticker cache and symbol search are built
//! on; tests substitute in-memory implementations.

use std::time::Duration;

use async_trait::async_trait;
use pulse_core::{MarketDataError, MdResult, SymbolInfo, TickerSnapshot};
use tracing::debug;

use crate::binance::{self, json_parser};

/// Source of 24h ticker snapshots.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the snapshot for an uppercase REST key.
    async fn fetch_ticker(&self, symbol: &str) -> MdResult<TickerSnapshot>;
}

/// Source of the full tradable-symbol directory.
#[async_trait]
pub trait SymbolDirectory: Send + Sync {
    async fn fetch_symbols(&self) -> MdResult<Vec<SymbolInfo>>;
}

/// Unauthenticated Binance REST client.
pub struct BinanceRest {
    /// Shared HTTP client.
    http: reqwest::Client,
    /// REST base URL (e.g. `https://api.binance.com`).
    base_url: String,
}

impl BinanceRest {
    pub fn new(base_url: &str, timeout: Duration) -> MdResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MarketDataError::Http(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    /// GET `url` and return the body, failing on non-2xx status.
    async fn get_text(&self, url: &str) -> MdResult<String> {
        debug!("[rest] GET {url}");
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| MarketDataError::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| MarketDataError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(MarketDataError::Http(format!("{status}: {body}")));
        }
        Ok(body)
    }
}

#[async_trait]
impl SnapshotSource for BinanceRest {
    async fn fetch_ticker(&self, symbol: &str) -> MdResult<TickerSnapshot> {
        let url = binance::ticker_url(&self.base_url, symbol);
        let body = self.get_text(&url).await?;
        json_parser::parse_ticker(symbol, &body)
    }
}

#[async_trait]
impl SymbolDirectory for BinanceRest {
    async fn fetch_symbols(&self) -> MdResult<Vec<SymbolInfo>> {
        let url = binance::exchange_info_url(&self.base_url);
        let body = self.get_text(&url).await?;
        json_parser::parse_exchange_info(&body)
    }
}
