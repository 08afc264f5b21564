//! Symbol normalization.
//!
//! The streaming endpoint addresses symbols in lowercase (`btcusdt@trade`)
//! while the REST endpoints expect uppercase (`?symbol=BTCUSDT`). Both forms
//! name the same trading pair; these helpers are the only place the two
//! canonical casings are produced.

use crate::error::MarketDataError;

/// Quote assets recognised when rendering a pair for display.
const DISPLAY_QUOTES: &[&str] = &["USDT", "USDC", "BUSD"];

/// Canonical key for the streaming path: trimmed, lowercase.
pub fn stream_key(symbol: &str) -> Result<String, MarketDataError> {
    let trimmed = symbol.trim();
    if trimmed.is_empty() {
        return Err(MarketDataError::InvalidSymbol(symbol.to_string()));
    }
    Ok(trimmed.to_ascii_lowercase())
}

/// Canonical key for the REST path: trimmed, uppercase.
pub fn rest_key(symbol: &str) -> Result<String, MarketDataError> {
    let trimmed = symbol.trim();
    if trimmed.is_empty() {
        return Err(MarketDataError::InvalidSymbol(symbol.to_string()));
    }
    Ok(trimmed.to_ascii_uppercase())
}

/// Render a concatenated pair with a slash before its quote asset.
///
/// `BTCUSDT` becomes `BTC/USDT`. Symbols without a recognised quote suffix
/// are returned unchanged.
pub fn display_pair(symbol: &str) -> String {
    for quote in DISPLAY_QUOTES {
        match symbol.strip_suffix(quote) {
            Some(base) if !base.is_empty() => return format!("{base}/{quote}"),
            _ => {}
        }
    }
    symbol.to_string()
}
