//! Feed counters shared by every channel task.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Lock-free counters updated from the channel tasks.
#[derive(Debug, Default)]
pub struct FeedStats {
    decoded: AtomicU64,
    unparsable: AtomicU64,
    applied: AtomicU64,
    rejected: AtomicU64,
    reconnects: AtomicU64,
    fatal_channels: AtomicU64,
}

/// Plain copy of [`FeedStats`], as published in reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedStatsSnapshot {
    pub decoded: u64,
    pub unparsable: u64,
    pub applied: u64,
    pub rejected: u64,
    pub reconnects: u64,
    pub fatal_channels: u64,
}

impl FeedStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_decoded(&self) {
        self.decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unparsable(&self) {
        self.unparsable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_applied(&self) {
        self.applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fatal(&self) {
        self.fatal_channels.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FeedStatsSnapshot {
        FeedStatsSnapshot {
            decoded: self.decoded.load(Ordering::Relaxed),
            unparsable: self.unparsable.load(Ordering::Relaxed),
            applied: self.applied.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            fatal_channels: self.fatal_channels.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_independently() {
        let stats = FeedStats::new();
        stats.record_decoded();
        stats.record_decoded();
        stats.record_applied();
        stats.record_unparsable();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.decoded, 2);
        assert_eq!(snapshot.applied, 1);
        assert_eq!(snapshot.unparsable, 1);
        assert_eq!(snapshot.rejected, 0);
    }
}
