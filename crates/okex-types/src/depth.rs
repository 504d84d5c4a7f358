//! Depth price levels

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A single price level of a depth snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthRecord {
    /// Price of this level
    pub price: f64,
    /// Amount (contracts) at this price
    pub amount: f64,
}

impl DepthRecord {
    /// Create a new price level
    pub fn new(price: f64, amount: f64) -> Self {
        Self { price, amount }
    }

    /// Check if this level has zero amount
    pub fn is_zero(&self) -> bool {
        self.amount == 0.0
    }
}

/// Sort levels by descending price
///
/// Uses a total order so NaN prices cannot break the sort; they end up
/// first.
pub fn sort_descending(levels: &mut [DepthRecord]) {
    levels.sort_by(|a, b| b.price.total_cmp(&a.price));
}

/// Check that levels are strictly descending by price
pub fn is_strictly_descending(levels: &[DepthRecord]) -> bool {
    levels
        .windows(2)
        .all(|w| w[0].price.partial_cmp(&w[1].price) == Some(Ordering::Greater))
}
