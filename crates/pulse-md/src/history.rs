//! Rolling window of recent prices for one symbol, fed from a `PriceFeed`.

use std::collections::VecDeque;

use pulse_core::PriceTick;

pub const DEFAULT_HISTORY_LEN: usize = 50;

/// One retained price and its local receive time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub at_ms: u64,
    pub price: f64,
}

/// Bounded history of distinct consecutive prices, oldest first.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    points: VecDeque<PricePoint>,
    capacity: usize,
}

impl Default for PriceHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_LEN)
    }
}

impl PriceHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a price. Returns `false` if it was ignored: not a positive
    /// finite price, or equal to the latest retained one.
    pub fn record(&mut self, at_ms: u64, price: f64) -> bool {
        if !price.is_finite() || price <= 0.0 {
            return false;
        }
        if self.latest().is_some_and(|p| p.price == price) {
            return false;
        }
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(PricePoint { at_ms, price });
        true
    }

    pub fn record_tick(&mut self, tick: &PriceTick) -> bool {
        self.record(tick.received_at_ms, tick.price)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest(&self) -> Option<PricePoint> {
        self.points.back().copied()
    }

    pub fn min(&self) -> Option<f64> {
        self.points.iter().map(|p| p.price).reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.points.iter().map(|p| p.price).reduce(f64::max)
    }

    /// Percent change from the oldest retained price to the latest.
    pub fn change_percent(&self) -> Option<f64> {
        let first = self.points.front()?;
        let last = self.points.back()?;
        Some((last.price - first.price) / first.price * 100.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PricePoint> {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_repeats_and_bad_prices() {
        let mut h = PriceHistory::default();
        assert!(h.record(1, 100.0));
        assert!(!h.record(2, 100.0));
        assert!(!h.record(3, 0.0));
        assert!(!h.record(4, -3.0));
        assert!(!h.record(5, f64::NAN));
        assert!(h.record(6, 101.0));
        assert!(h.record(7, 100.0));
        assert_eq!(h.len(), 3);
    }

    #[test]
    fn window_drops_oldest() {
        let mut h = PriceHistory::with_capacity(3);
        for (i, p) in [1.0, 2.0, 3.0, 4.0].into_iter().enumerate() {
            h.record(i as u64, p);
        }
        let prices: Vec<f64> = h.iter().map(|p| p.price).collect();
        assert_eq!(prices, vec![2.0, 3.0, 4.0]);
        assert_eq!(h.min(), Some(2.0));
        assert_eq!(h.max(), Some(4.0));
        assert_eq!(h.change_percent(), Some(100.0));
    }

    #[test]
    fn empty_history() {
        let h = PriceHistory::default();
        assert!(h.is_empty());
        assert_eq!(h.min(), None);
        assert_eq!(h.change_percent(), None);
        assert_eq!(h.latest(), None);
    }

    #[test]
    fn records_ticks() {
        let mut h = PriceHistory::default();
        let tick = PriceTick {
            symbol: "btcusdt".into(),
            price: 65_000.0,
            trade_time_ms: None,
            received_at_ms: 42,
        };
        assert!(h.record_tick(&tick));
        assert_eq!(h.latest(), Some(PricePoint { at_ms: 42, price: 65_000.0 }));
    }
}
