//! # pulse-core
//!
//! Core crate for the pulse market-data layer, providing:
//!
//! - **Types** (`types`): connection state, price ticks, ticker snapshots, symbol utils
//! - **Configuration** (`config`): JSON config deserialization with defaults
//! - **Error types** (`error`): domain-specific `MarketDataError` via thiserror
//! - **WebSocket** (`ws`): connector + text session seam over tokio-tungstenite
//! - **Formatting** (`format`): price / percent / volume rendering
//! - **Time utilities** (`time_util`): wall-clock timestamps
//! - **Logging** (`logging`): tracing-based structured logging

pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod time_util;
pub mod types;
pub mod ws;

// Re-export types at crate root for convenience.
pub use error::{MarketDataError, MdResult};
pub use types::*;
