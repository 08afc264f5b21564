//! Binance public market data: endpoint layout and payload parsing.
//!
//! | Purpose        | Endpoint                                   |
//! |----------------|--------------------------------------------|
//! | Live trades    | `{ws_base}/{lowercase}@trade`              |
//! | 24h ticker     | `GET {rest_base}/api/v3/ticker/24hr?symbol=` |
//! | Symbol list    | `GET {rest_base}/api/v3/exchangeInfo`      |
//!
//! All endpoints are public; no request signing.

pub mod json_parser;

/// Trade stream URL for a lowercase stream key.
pub fn trade_stream_url(ws_base: &str, stream_key: &str) -> String {
    format!("{}/{stream_key}@trade", ws_base.trim_end_matches('/'))
}

/// 24h ticker URL for an uppercase REST key.
pub fn ticker_url(rest_base: &str, rest_key: &str) -> String {
    format!(
        "{}/api/v3/ticker/24hr?symbol={}",
        rest_base.trim_end_matches('/'),
        urlencoding::encode(rest_key)
    )
}

/// Exchange directory URL.
pub fn exchange_info_url(rest_base: &str) -> String {
    format!("{}/api/v3/exchangeInfo", rest_base.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls() {
        assert_eq!(
            trade_stream_url("wss://stream.binance.com:9443/ws/", "btcusdt"),
            "wss://stream.binance.com:9443/ws/btcusdt@trade"
        );
        assert_eq!(
            ticker_url("https://api.binance.com", "BTCUSDT"),
            "https://api.binance.com/api/v3/ticker/24hr?symbol=BTCUSDT"
        );
        assert_eq!(
            exchange_info_url("https://api.binance.com/"),
            "https://api.binance.com/api/v3/exchangeInfo"
        );
    }
}
