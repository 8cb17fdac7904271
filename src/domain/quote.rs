//! Decoded price updates and the per-asset book entry they produce.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::AssetId;
use super::money::Price;

/// One decoded top-of-book update, as produced by a feed decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceUpdate {
    pub asset_id: AssetId,
    pub bid: Option<Price>,
    pub ask: Option<Price>,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
}

impl PriceUpdate {
    #[must_use]
    pub const fn new(
        asset_id: AssetId,
        bid: Option<Price>,
        ask: Option<Price>,
        sequence: u64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            asset_id,
            bid,
            ask,
            sequence,
            timestamp,
        }
    }
}

/// Stored state for one asset. Replaced whole on every accepted update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookEntry {
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    /// Midpoint of bid and ask; absent unless both sides are quoted.
    pub mid_price: Option<Price>,
    pub last_update: DateTime<Utc>,
    pub sequence: u64,
}

impl BookEntry {
    /// Build the entry an update would store.
    #[must_use]
    pub fn from_update(update: &PriceUpdate) -> Self {
        let mid_price = match (update.bid, update.ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            _ => None,
        };
        Self {
            best_bid: update.bid,
            best_ask: update.ask,
            mid_price,
            last_update: update.timestamp,
            sequence: update.sequence,
        }
    }
}
