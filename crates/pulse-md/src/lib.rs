//! # pulse-md
//!
//! Market-data access layer over Binance public endpoints.
//!
//! ## Architecture
//!
//! [`MarketData`] is the single entry point. It composes three components,
//! each owning its own state:
//!
//! - [`stream`]: one WebSocket trade stream per symbol, bounded reconnect,
//!   fan-out to any number of [`PriceFeed`]s
//! - [`ticker_cache`]: 24h ticker fetches shared per symbol for a short TTL
//! - [`search`]: exchange directory filtered by query, quote asset, status
//!
//! ## Shared infrastructure
//!
//! - [`rest`]: REST client and the transport traits tests substitute
//! - [`binance`]: endpoint URLs and payload parsers
//! - [`json_util`]: numeric field helpers
//! - [`history`]: rolling price window for consumers of a feed

pub mod binance;
pub mod facade;
pub mod history;
pub mod json_util;
pub mod rest;
pub mod search;
pub mod stream;
pub mod ticker_cache;

#[cfg(test)]
mod testing;

pub use facade::{MarketData, SymbolView};
pub use history::PriceHistory;
pub use stream::{FeedEvent, PriceFeed, PriceStreamManager, StreamSettings};
