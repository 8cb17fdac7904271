//! Feed freshness tracking.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::domain::book::age_between;
use crate::domain::MarketId;

/// Receipt time of the last applied update, per market channel.
///
/// Written by every channel task, read by the tick task; `DashMap` keeps the
/// two from contending on one lock.
#[derive(Debug, Clone)]
pub struct FeedHealth {
    last_applied: Arc<DashMap<MarketId, DateTime<Utc>>>,
    freshness_window: Duration,
}

impl FeedHealth {
    pub fn new(freshness_window: Duration) -> Self {
        Self {
            last_applied: Arc::new(DashMap::new()),
            freshness_window,
        }
    }

    /// Note that `market`'s channel applied an update at `at`.
    pub fn record(&self, market: &MarketId, at: DateTime<Utc>) {
        self.last_applied
            .entry(market.clone())
            .and_modify(|last| {
                if at > *last {
                    *last = at;
                }
            })
            .or_insert(at);
    }

    /// True if any channel applied an update within the freshness window.
    pub fn is_healthy(&self) -> bool {
        self.is_healthy_at(Utc::now())
    }

    pub fn is_healthy_at(&self, now: DateTime<Utc>) -> bool {
        self.last_applied
            .iter()
            .any(|entry| age_between(*entry.value(), now) <= self.freshness_window)
    }

    #[cfg(test)]
    fn last_applied(&self, market: &MarketId) -> Option<DateTime<Utc>> {
        self.last_applied.get(market).map(|entry| *entry.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::domain::{epoch, market_id};

    #[test]
    fn unhealthy_until_something_is_applied() {
        let health = FeedHealth::new(Duration::from_secs(30));
        assert!(!health.is_healthy_at(epoch()));

        health.record(&market_id("m"), epoch());
        assert!(health.is_healthy_at(epoch() + chrono::Duration::seconds(30)));
        assert!(!health.is_healthy_at(epoch() + chrono::Duration::seconds(31)));
    }

    #[test]
    fn one_fresh_channel_is_enough() {
        let health = FeedHealth::new(Duration::from_secs(30));
        health.record(&market_id("quiet"), epoch());
        health.record(&market_id("busy"), epoch() + chrono::Duration::seconds(100));
        assert!(health.is_healthy_at(epoch() + chrono::Duration::seconds(110)));
    }

    #[test]
    fn older_receipt_does_not_rewind() {
        let health = FeedHealth::new(Duration::from_secs(30));
        let m = market_id("m");
        health.record(&m, epoch() + chrono::Duration::seconds(10));
        health.record(&m, epoch());
        assert_eq!(health.last_applied(&m), Some(epoch() + chrono::Duration::seconds(10)));
    }
}
