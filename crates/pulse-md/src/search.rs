//! Symbol Search Gateway.
//!
//! Each query fetches the full exchange directory and filters it locally:
//! the query must be contained in the symbol, the pair must quote in the
//! configured asset and be actively trading. Results keep the directory's
//! order. Failures degrade to an empty result; search never errors.

use std::sync::Arc;

use pulse_core::SymbolInfo;
use pulse_core::config::MarketDataConfig;
use tracing::{debug, warn};

use crate::rest::SymbolDirectory;

pub struct SymbolSearch {
    directory: Arc<dyn SymbolDirectory>,
    quote_asset: String,
    status: String,
    limit: usize,
}

impl SymbolSearch {
    pub fn new(directory: Arc<dyn SymbolDirectory>, cfg: &MarketDataConfig) -> Self {
        Self {
            directory,
            quote_asset: cfg.search_quote_asset.clone(),
            status: cfg.search_status.clone(),
            limit: cfg.search_limit,
        }
    }

    /// Matching symbols, at most `limit`, or empty on any failure.
    pub async fn search(&self, query: &str) -> Vec<String> {
        let needle = query.trim().to_uppercase();
        if needle.is_empty() {
            return Vec::new();
        }

        match self.directory.fetch_symbols().await {
            Ok(symbols) => {
                let hits = self.filter(&needle, &symbols);
                debug!("[search] {needle:?}: {} match(es)", hits.len());
                hits
            }
            Err(e) => {
                warn!("[search] directory fetch failed: {e}");
                Vec::new()
            }
        }
    }

    fn filter(&self, needle: &str, symbols: &[SymbolInfo]) -> Vec<String> {
        symbols
            .iter()
            .filter(|s| {
                s.symbol.contains(needle)
                    && s.quote_asset == self.quote_asset
                    && s.status == self.status
            })
            .take(self.limit)
            .map(|s| s.symbol.clone())
            .collect()
    }
}
