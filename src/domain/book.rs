//! Thread-safe per-asset price store.
//!
//! [`MarketBook`] is the only shared mutable state in the pipeline. Feed
//! tasks write through [`MarketBook::apply`]; the tick task reads through
//! [`MarketBook::snapshot`] and [`MarketBook::age_of`]. Each accepted update
//! replaces the stored [`BookEntry`] in a single map insert under the write
//! lock, so a reader never pairs a new bid with an old ask.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use chrono::Utc;
//! use kingmaker::domain::{AssetId, AssetRegistry, AssetRole, AssetSpec, MarketBook, MarketSpec, PriceUpdate};
//! use rust_decimal_macros::dec;
//!
//! let registry = AssetRegistry::from_specs(
//!     vec![MarketSpec {
//!         id: "winner".into(),
//!         role: AssetRole::Winner,
//!         party: None,
//!         assets: vec![AssetSpec { name: "A".into(), asset_id: "a".into() }],
//!     }],
//!     &Default::default(),
//! );
//! let book = MarketBook::new(Arc::new(registry));
//!
//! let id = AssetId::new("a");
//! book.apply(&PriceUpdate::new(id.clone(), Some(dec!(0.40)), Some(dec!(0.42)), 1, Utc::now())).unwrap();
//! assert_eq!(book.get(&id).unwrap().mid_price, Some(dec!(0.41)));
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::error::{LookupError, Rejection};
use super::id::AssetId;
use super::money::is_probability;
use super::quote::{BookEntry, PriceUpdate};
use super::registry::AssetRegistry;

/// Point-in-time copy of every stored entry.
pub type BookSnapshot = HashMap<AssetId, BookEntry>;

/// Rejection counters, one per reason.
#[derive(Debug, Default)]
struct RejectionCounters {
    unknown_asset: AtomicU64,
    stale_or_duplicate: AtomicU64,
    invariant_violation: AtomicU64,
}

/// Plain copy of the rejection counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionStats {
    pub unknown_asset: u64,
    pub stale_or_duplicate: u64,
    pub invariant_violation: u64,
}

impl RejectionStats {
    pub fn total(&self) -> u64 {
        self.unknown_asset + self.stale_or_duplicate + self.invariant_violation
    }
}

/// Per-asset book store validated against the registry.
pub struct MarketBook {
    registry: Arc<AssetRegistry>,
    entries: RwLock<BookSnapshot>,
    rejections: RejectionCounters,
}

impl MarketBook {
    pub fn new(registry: Arc<AssetRegistry>) -> Self {
        Self {
            registry,
            entries: RwLock::new(HashMap::new()),
            rejections: RejectionCounters::default(),
        }
    }

    /// Validate and store an update.
    ///
    /// Checks, in order: the asset is registered, both prices are
    /// probabilities, the book is not crossed, the sequence is newer than the
    /// stored one. The sequence check and the insert happen under one write
    /// lock so concurrent writers for the same asset cannot interleave.
    pub fn apply(&self, update: &PriceUpdate) -> Result<(), Rejection> {
        let result = self.try_apply(update);
        if let Err(rejection) = &result {
            let counter = match rejection {
                Rejection::UnknownAsset { .. } => &self.rejections.unknown_asset,
                Rejection::StaleOrDuplicate { .. } => &self.rejections.stale_or_duplicate,
                Rejection::InvariantViolation { .. } => &self.rejections.invariant_violation,
            };
            counter.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    fn try_apply(&self, update: &PriceUpdate) -> Result<(), Rejection> {
        let asset_id = &update.asset_id;
        if self.registry.resolve(asset_id).is_err() {
            return Err(Rejection::UnknownAsset {
                asset_id: asset_id.clone(),
            });
        }

        for (side, price) in [("bid", update.bid), ("ask", update.ask)] {
            if let Some(price) = price {
                if !is_probability(price) {
                    return Err(Rejection::out_of_range(asset_id, side, price));
                }
            }
        }
        if let (Some(bid), Some(ask)) = (update.bid, update.ask) {
            if bid > ask {
                return Err(Rejection::crossed(asset_id, bid, ask));
            }
        }

        let entry = BookEntry::from_update(update);
        let mut entries = self.entries.write();
        if let Some(stored) = entries.get(asset_id) {
            if update.sequence <= stored.sequence {
                return Err(Rejection::StaleOrDuplicate {
                    asset_id: asset_id.clone(),
                    incoming: update.sequence,
                    stored: stored.sequence,
                });
            }
        }
        entries.insert(asset_id.clone(), entry);
        Ok(())
    }

    /// Copy of every entry, taken under a single read lock.
    pub fn snapshot(&self) -> BookSnapshot {
        self.entries.read().clone()
    }

    /// Copy of one entry.
    pub fn get(&self, asset_id: &AssetId) -> Option<BookEntry> {
        self.entries.read().get(asset_id).cloned()
    }

    /// Time since the asset's last accepted update.
    ///
    /// Timestamps ahead of `now` count as zero age.
    pub fn age_of(&self, asset_id: &AssetId, now: DateTime<Utc>) -> Result<Duration, LookupError> {
        let last_update = self
            .entries
            .read()
            .get(asset_id)
            .map(|entry| entry.last_update)
            .ok_or_else(|| LookupError::NoData(asset_id.clone()))?;
        Ok(age_between(last_update, now))
    }

    pub fn rejections(&self) -> RejectionStats {
        RejectionStats {
            unknown_asset: self.rejections.unknown_asset.load(Ordering::Relaxed),
            stale_or_duplicate: self.rejections.stale_or_duplicate.load(Ordering::Relaxed),
            invariant_violation: self.rejections.invariant_violation.load(Ordering::Relaxed),
        }
    }

    pub fn registry(&self) -> &Arc<AssetRegistry> {
        &self.registry
    }

    /// Number of assets observed so far.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Non-negative duration from `then` to `now`.
pub fn age_between(then: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - then).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::registry::{AssetRole, AssetSpec, MarketSpec};
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn book() -> MarketBook {
        let registry = AssetRegistry::from_specs(
            vec![MarketSpec {
                id: "winner".into(),
                role: AssetRole::Winner,
                party: None,
                assets: vec![
                    AssetSpec {
                        name: "A".into(),
                        asset_id: "a".into(),
                    },
                    AssetSpec {
                        name: "B".into(),
                        asset_id: "b".into(),
                    },
                ],
            }],
            &Default::default(),
        );
        MarketBook::new(Arc::new(registry))
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn quote(asset: &str, bid: Decimal, ask: Decimal, sequence: u64) -> PriceUpdate {
        PriceUpdate::new(
            AssetId::new(asset),
            Some(bid),
            Some(ask),
            sequence,
            at(sequence as i64),
        )
    }

    #[test]
    fn applies_valid_update() {
        let book = book();
        book.apply(&quote("a", dec!(0.40), dec!(0.44), 1)).unwrap();

        let entry = book.get(&AssetId::new("a")).unwrap();
        assert_eq!(entry.best_bid, Some(dec!(0.40)));
        assert_eq!(entry.best_ask, Some(dec!(0.44)));
        assert_eq!(entry.mid_price, Some(dec!(0.42)));
        assert_eq!(entry.sequence, 1);
    }

    #[test]
    fn rejects_crossed_book_and_keeps_entry() {
        let book = book();
        book.apply(&quote("a", dec!(0.50), dec!(0.52), 1)).unwrap();

        let result = book.apply(&quote("a", dec!(0.6), dec!(0.55), 2));
        assert!(matches!(result, Err(Rejection::InvariantViolation { .. })));

        let entry = book.get(&AssetId::new("a")).unwrap();
        assert_eq!(entry.sequence, 1);
        assert_eq!(entry.best_bid, Some(dec!(0.50)));
        assert_eq!(book.rejections().invariant_violation, 1);
    }

    #[test]
    fn rejects_out_of_range_price() {
        let book = book();
        let result = book.apply(&quote("a", dec!(0.5), dec!(1.2), 1));
        assert!(matches!(result, Err(Rejection::InvariantViolation { .. })));
        assert!(book.is_empty());
    }

    #[test]
    fn rejects_lower_and_duplicate_sequence() {
        let book = book();
        book.apply(&quote("a", dec!(0.40), dec!(0.44), 5)).unwrap();

        assert!(matches!(
            book.apply(&quote("a", dec!(0.10), dec!(0.12), 4)),
            Err(Rejection::StaleOrDuplicate {
                incoming: 4,
                stored: 5,
                ..
            })
        ));
        assert!(book.apply(&quote("a", dec!(0.10), dec!(0.12), 5)).is_err());

        let entry = book.get(&AssetId::new("a")).unwrap();
        assert_eq!(entry.best_bid, Some(dec!(0.40)));
        assert_eq!(book.rejections().stale_or_duplicate, 2);
    }

    #[test]
    fn rejects_unknown_asset() {
        let book = book();
        let result = book.apply(&quote("zzz", dec!(0.40), dec!(0.44), 1));
        assert!(matches!(result, Err(Rejection::UnknownAsset { .. })));
        assert_eq!(book.rejections().unknown_asset, 1);
    }

    #[test]
    fn one_sided_update_is_accepted() {
        let book = book();
        let update = PriceUpdate::new(AssetId::new("b"), None, Some(dec!(0.02)), 1, at(0));
        book.apply(&update).unwrap();
        assert_eq!(book.get(&AssetId::new("b")).unwrap().mid_price, None);
    }

    #[test]
    fn age_of_measures_from_last_update() {
        let book = book();
        book.apply(&quote("a", dec!(0.40), dec!(0.44), 10)).unwrap();

        let age = book.age_of(&AssetId::new("a"), at(70)).unwrap();
        assert_eq!(age, Duration::from_secs(60));

        let future = book.age_of(&AssetId::new("a"), at(0)).unwrap();
        assert_eq!(future, Duration::ZERO);
    }

    #[test]
    fn age_of_unobserved_asset_is_no_data() {
        let book = book();
        assert_eq!(
            book.age_of(&AssetId::new("b"), at(0)),
            Err(LookupError::NoData(AssetId::new("b")))
        );
    }

    #[test]
    fn snapshot_is_a_detached_copy() {
        let book = book();
        book.apply(&quote("a", dec!(0.40), dec!(0.44), 1)).unwrap();
        let snapshot = book.snapshot();

        book.apply(&quote("a", dec!(0.45), dec!(0.47), 2)).unwrap();
        assert_eq!(snapshot[&AssetId::new("a")].sequence, 1);
        assert_eq!(book.snapshot()[&AssetId::new("a")].sequence, 2);
    }

    #[test]
    fn concurrent_writers_converge_on_highest_sequence() {
        let book = Arc::new(book());
        let handles: Vec<_> = (0..4u64)
            .map(|worker| {
                let book = Arc::clone(&book);
                std::thread::spawn(move || {
                    for seq in (worker..200).step_by(4) {
                        let _ = book.apply(&quote("a", dec!(0.40), dec!(0.44), seq + 1));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(book.get(&AssetId::new("a")).unwrap().sequence, 200);
    }
}
