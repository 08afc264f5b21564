//! Binance JSON payload parsers.
//!
//! - `<symbol>@trade` stream frames → [`PriceTick`]
//! - `GET /api/v3/ticker/24hr` → [`TickerSnapshot`]
//! - `GET /api/v3/exchangeInfo` → `Vec<SymbolInfo>`

use pulse_core::{MarketDataError, PriceTick, SymbolInfo, TickerSnapshot, time_util};
use serde::Deserialize;

use crate::json_util::{parse_f64_field, parse_str_u64};

/// Parse one trade-stream frame for the subscription keyed `symbol`.
///
/// Fails on anything that is not a usable price: invalid JSON, a missing or
/// non-numeric `p`, or a price that is not strictly positive.
pub fn parse_trade_tick(symbol: &str, text: &str) -> Result<PriceTick, MarketDataError> {
    let v: serde_json::Value =
        serde_json::from_str(text).map_err(|e| MarketDataError::Parse(e.to_string()))?;

    let price = parse_f64_field(&v, "p")
        .ok_or_else(|| MarketDataError::Parse(format!("missing or non-numeric price: {text}")))?;
    if price <= 0.0 {
        return Err(MarketDataError::Parse(format!("non-positive price {price}")));
    }

    Ok(PriceTick {
        symbol: symbol.to_string(),
        price,
        trade_time_ms: parse_str_u64(v.get("T")),
        received_at_ms: time_util::now_ms(),
    })
}

/// Parse a 24h ticker response.
///
/// Numeric fields that are missing or malformed become `None`. The symbol
/// falls back to `requested` when the payload omits it.
pub fn parse_ticker(requested: &str, text: &str) -> Result<TickerSnapshot, MarketDataError> {
    let v: serde_json::Value =
        serde_json::from_str(text).map_err(|e| MarketDataError::Parse(e.to_string()))?;
    if !v.is_object() {
        return Err(MarketDataError::Parse("ticker payload is not an object".into()));
    }

    let symbol = v
        .get("symbol")
        .and_then(|s| s.as_str())
        .unwrap_or(requested)
        .to_string();

    Ok(TickerSnapshot {
        symbol,
        last_price: parse_f64_field(&v, "lastPrice").or_else(|| parse_f64_field(&v, "price")),
        price_change_percent: parse_f64_field(&v, "priceChangePercent"),
        volume: parse_f64_field(&v, "volume"),
        high_price: parse_f64_field(&v, "highPrice"),
        low_price: parse_f64_field(&v, "lowPrice"),
    })
}

#[derive(Deserialize)]
struct ExchangeInfo {
    symbols: Vec<RawSymbol>,
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawSymbol {
    symbol: String,
    base_asset: String,
    quote_asset: String,
    status: String,
}

/// Parse the symbol directory, preserving the exchange's order.
///
/// Entries with missing fields are kept with empty strings; they simply never
/// match a search filter.
pub fn parse_exchange_info(text: &str) -> Result<Vec<SymbolInfo>, MarketDataError> {
    let info: ExchangeInfo =
        serde_json::from_str(text).map_err(|e| MarketDataError::Parse(e.to_string()))?;
    Ok(info
        .symbols
        .into_iter()
        .map(|s| SymbolInfo {
            symbol: s.symbol,
            base_asset: s.base_asset,
            quote_asset: s.quote_asset,
            status: s.status,
        })
        .collect())
}
