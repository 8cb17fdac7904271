//! Per-tick consumer report.
//!
//! Everything a dashboard needs to render, with no computation left to it:
//! every registered asset's book (present or not) and every metric.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::book::age_between;
use crate::domain::{
    AssetId, AssetRegistry, AssetRole, BookSnapshot, DerivedMetric, MarketId, Price, RejectionStats,
};
use crate::exchange::stats::FeedStatsSnapshot;

/// One registered asset as seen at report time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookView {
    pub asset_id: AssetId,
    pub name: String,
    pub market_id: MarketId,
    pub role: AssetRole,
    pub bid: Option<Price>,
    pub ask: Option<Price>,
    pub mid: Option<Price>,
    /// `None` until the asset is first observed.
    pub sequence: Option<u64>,
    pub last_update: Option<DateTime<Utc>>,
    pub age_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub healthy: bool,
    pub feed: FeedStatsSnapshot,
    pub rejections: RejectionStats,
    pub books: Vec<BookView>,
    pub metrics: Vec<DerivedMetric>,
}

impl Report {
    /// Report with no observations, published before the first tick.
    pub fn empty(registry: &AssetRegistry, now: DateTime<Utc>) -> Self {
        Self {
            generated_at: now,
            healthy: false,
            feed: FeedStatsSnapshot::default(),
            rejections: RejectionStats::default(),
            books: book_views(registry, &BookSnapshot::new(), now),
            metrics: Vec::new(),
        }
    }

    pub fn books_for(&self, market: &MarketId) -> impl Iterator<Item = &BookView> {
        let market = market.clone();
        self.books.iter().filter(move |view| view.market_id == market)
    }

    pub fn metrics_for<'a>(&'a self, market: &'a MarketId) -> impl Iterator<Item = &'a DerivedMetric> {
        self.metrics.iter().filter(move |metric| metric.depends_on(market))
    }

    /// Number of OK metrics.
    pub fn ok_metrics(&self) -> usize {
        self.metrics
            .iter()
            .filter(|metric| metric.confidence_state.is_ok())
            .count()
    }
}

/// Views in registry order.
pub fn book_views(registry: &AssetRegistry, snapshot: &BookSnapshot, now: DateTime<Utc>) -> Vec<BookView> {
    registry
        .entries()
        .iter()
        .map(|entry| {
            let book = snapshot.get(&entry.asset_id);
            BookView {
                asset_id: entry.asset_id.clone(),
                name: entry.logical_name.clone(),
                market_id: entry.market_id.clone(),
                role: entry.role,
                bid: book.and_then(|b| b.best_bid),
                ask: book.and_then(|b| b.best_ask),
                mid: book.and_then(|b| b.mid_price),
                sequence: book.map(|b| b.sequence),
                last_update: book.map(|b| b.last_update),
                age_ms: book.map(|b| age_between(b.last_update, now).as_millis() as u64),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BookEntry;
    use crate::testkit::domain::{election_registry, epoch, update, DEM_NOMINATION};
    use rust_decimal_macros::dec;

    #[test]
    fn every_registered_asset_is_listed() {
        let registry = election_registry();
        let mut snapshot = BookSnapshot::new();
        let observed = update("dn-alice", "0.29", "0.31", 1);
        snapshot.insert(observed.asset_id.clone(), BookEntry::from_update(&observed));

        let views = book_views(&registry, &snapshot, epoch() + chrono::Duration::seconds(11));
        assert_eq!(views.len(), registry.len());

        let alice = views.iter().find(|v| v.asset_id.as_str() == "dn-alice").unwrap();
        assert_eq!(alice.mid, Some(dec!(0.30)));
        assert_eq!(alice.age_ms, Some(10_000));

        let bob = views.iter().find(|v| v.asset_id.as_str() == "dn-bob").unwrap();
        assert_eq!(bob.sequence, None);
        assert_eq!(bob.mid, None);
    }

    #[test]
    fn empty_report_is_unhealthy() {
        let registry = election_registry();
        let report = Report::empty(&registry, epoch());
        assert!(!report.healthy);
        assert_eq!(report.books_for(&MarketId::new(DEM_NOMINATION)).count(), 2);
    }
}
