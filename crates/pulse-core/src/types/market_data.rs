//! Market data structures flowing out of the access layer.
//!
//! # Absent values
//!
//! Exchange decimals arrive as strings. A field that is missing or does not
//! parse as a finite number is `None`, never `0.0`, so a consumer can tell
//! "no data" apart from a real zero.

use serde::Serialize;

// ---------------------------------------------------------------------------
// PriceTick
// ---------------------------------------------------------------------------

/// One validated trade price delivered on a live feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceTick {
    /// Stream key of the subscription (lowercase).
    pub symbol: String,
    /// Trade price, always finite and strictly positive.
    pub price: f64,
    /// Exchange trade time in milliseconds, when the payload carries one.
    pub trade_time_ms: Option<u64>,
    /// Local receive time in milliseconds since Unix epoch.
    pub received_at_ms: u64,
}

// ---------------------------------------------------------------------------
// TickerSnapshot
// ---------------------------------------------------------------------------

/// 24-hour rolling statistics for one symbol.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TickerSnapshot {
    pub symbol: String,
    pub last_price: Option<f64>,
    pub price_change_percent: Option<f64>,
    pub volume: Option<f64>,
    pub high_price: Option<f64>,
    pub low_price: Option<f64>,
}

impl TickerSnapshot {
    /// Where `price` sits inside the 24h low..high range, in percent.
    ///
    /// `None` if either bound is absent, the range is empty, or `price` is
    /// not positive.
    pub fn range_position(&self, price: f64) -> Option<f64> {
        let (low, high) = (self.low_price?, self.high_price?);
        if price <= 0.0 || high <= low {
            return None;
        }
        Some((price - low) / (high - low) * 100.0)
    }
}

// ---------------------------------------------------------------------------
// SymbolInfo
// ---------------------------------------------------------------------------

/// One entry of the exchange symbol directory.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SymbolInfo {
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub status: String,
}

impl std::fmt::Display for PriceTick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tick({} {:.8} t={})", self.symbol, self.price, self.received_at_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(low: Option<f64>, high: Option<f64>) -> TickerSnapshot {
        TickerSnapshot {
            symbol: "BTCUSDT".into(),
            low_price: low,
            high_price: high,
            ..Default::default()
        }
    }

    #[test]
    fn range_position_midpoint() {
        let s = snapshot(Some(100.0), Some(200.0));
        assert_eq!(s.range_position(150.0), Some(50.0));
        assert_eq!(s.range_position(100.0), Some(0.0));
    }

    #[test]
    fn range_position_absent_inputs() {
        assert_eq!(snapshot(None, Some(200.0)).range_position(150.0), None);
        assert_eq!(snapshot(Some(100.0), Some(100.0)).range_position(100.0), None);
        assert_eq!(snapshot(Some(100.0), Some(200.0)).range_position(0.0), None);
    }
}
