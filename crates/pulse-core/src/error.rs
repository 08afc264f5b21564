//! Typed error definitions for the market-data layer.
//!
//! [`MarketDataError`] is what crosses component boundaries. Only terminal or
//! caller-visible conditions are represented here; retryable faults (a single
//! malformed tick, a dropped connection that is still within its reconnect
//! budget) are handled and logged inside the owning component.
//!
//! The enum is `Clone` so one failed snapshot fetch can be handed to every
//! caller that was waiting on it.

use thiserror::Error;

/// Domain-specific errors for the market-data layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketDataError {
    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// A symbol that cannot identify a trading pair (empty, whitespace).
    #[error("invalid symbol: {0:?}")]
    InvalidSymbol(String),

    /// WebSocket connection, handshake, or communication error.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// REST request failed (transport, timeout, or non-success status).
    #[error("http error: {0}")]
    Http(String),

    /// Exchange payload could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// A price stream gave up after exhausting its reconnect budget.
    #[error("{symbol}: connection failed after {attempts} attempts")]
    ReconnectExhausted { symbol: String, attempts: u32 },
}

/// Result alias used by the library crates.
pub type MdResult<T> = std::result::Result<T, MarketDataError>;
