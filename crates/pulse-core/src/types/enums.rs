//! Enumerations shared across the market-data layer.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Connection state
// ---------------------------------------------------------------------------

/// Lifecycle state of one per-symbol price subscription.
///
/// ```text
/// Connecting ──open──► Open ──release──► Closed
///     ▲                 │
///     │           unsolicited close
///     │                 ▼
///     └──backoff── Reconnecting ──budget exhausted──► Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnState {
    /// A connection has been requested and is not yet open.
    Connecting,
    /// Ticks are flowing to the feed.
    Open,
    /// The connection dropped; waiting out the backoff before reconnecting.
    Reconnecting,
    /// Terminal. No further transitions.
    Closed,
}

impl ConnState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl std::fmt::Display for ConnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Reconnecting => write!(f, "reconnecting"),
            Self::Closed => write!(f, "closed"),
        }
    }
}
