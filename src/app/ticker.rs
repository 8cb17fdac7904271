//! Periodic tick: metrics, report publication and persistence.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::feed::shutdown_signalled;
use super::health::FeedHealth;
use super::report::{book_views, Report};
use super::snapshot::SnapshotStore;
use super::status_file::StatusWriter;
use crate::domain::{unresolvable_markets, MarketBook, MarketId, MetricEngine, MetricKind};
use crate::error::SnapshotError;
use crate::exchange::stats::FeedStats;

/// Tracks consecutive `NO_VALID_STATES` ticks per market.
#[derive(Debug)]
pub struct EscalationTracker {
    threshold: u32,
    streaks: HashMap<MarketId, u32>,
    escalated: HashSet<MarketId>,
}

/// Change worth logging after a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Escalation {
    /// Unresolvable for `ticks` ticks in a row; reported once per episode.
    Raised { market: MarketId, ticks: u32 },
    /// Left the unresolvable state after having been raised.
    Recovered { market: MarketId },
}

impl EscalationTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            streaks: HashMap::new(),
            escalated: HashSet::new(),
        }
    }

    /// Feed one tick's unresolvable markets.
    pub fn observe(&mut self, unresolved: &[MarketId]) -> Vec<Escalation> {
        let mut changes = Vec::new();

        let recovered: Vec<MarketId> = self
            .streaks
            .keys()
            .filter(|market| !unresolved.contains(market))
            .cloned()
            .collect();
        for market in recovered {
            self.streaks.remove(&market);
            if self.escalated.remove(&market) {
                changes.push(Escalation::Recovered { market });
            }
        }

        for market in unresolved {
            let ticks = self.streaks.entry(market.clone()).or_insert(0);
            *ticks += 1;
            if *ticks >= self.threshold && self.escalated.insert(market.clone()) {
                changes.push(Escalation::Raised {
                    market: market.clone(),
                    ticks: *ticks,
                });
            }
        }
        changes
    }
}

/// Everything the tick task needs.
pub struct Ticker {
    engine: MetricEngine,
    book: Arc<MarketBook>,
    health: FeedHealth,
    stats: Arc<FeedStats>,
    reports: watch::Sender<Arc<Report>>,
    status: Option<StatusWriter>,
    store: Option<SnapshotStore>,
    escalation: EscalationTracker,
    signalled: HashSet<(MetricKind, String)>,
}

impl Ticker {
    pub fn new(
        engine: MetricEngine,
        book: Arc<MarketBook>,
        health: FeedHealth,
        stats: Arc<FeedStats>,
        reports: watch::Sender<Arc<Report>>,
    ) -> Self {
        let escalation = EscalationTracker::new(engine.config().no_valid_states_escalation_ticks);
        Self {
            engine,
            book,
            health,
            stats,
            reports,
            status: None,
            store: None,
            escalation,
            signalled: HashSet::new(),
        }
    }

    #[must_use]
    pub fn with_status_file(mut self, writer: StatusWriter) -> Self {
        self.status = Some(writer);
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: SnapshotStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Compute and publish one report.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Arc<Report> {
        let registry = self.book.registry();
        let snapshot = self.book.snapshot();
        let metrics = self.engine.compute(registry, &snapshot, now);

        for change in self.escalation.observe(&unresolvable_markets(registry, &snapshot)) {
            match change {
                Escalation::Raised { market, ticks } => warn!(
                    market = %market,
                    ticks,
                    "Market has had no valid states for consecutive ticks; check the asset mapping"
                ),
                Escalation::Recovered { market } => {
                    info!(market = %market, "Market has valid states again")
                }
            }
        }

        let mut signalled = HashSet::new();
        for metric in metrics.iter().filter(|m| m.signal) {
            let key = (metric.kind, metric.entity.clone());
            if !self.signalled.contains(&key) {
                info!(
                    kind = %metric.kind,
                    entity = %metric.entity,
                    value = ?metric.value,
                    "Arbitrage signal"
                );
            }
            signalled.insert(key);
        }
        self.signalled = signalled;

        let report = Arc::new(Report {
            generated_at: now,
            healthy: self.health.is_healthy_at(now),
            feed: self.stats.snapshot(),
            rejections: self.book.rejections(),
            books: book_views(registry, &snapshot, now),
            metrics,
        });
        debug!(
            metrics = report.metrics.len(),
            ok = report.ok_metrics(),
            healthy = report.healthy,
            "Tick"
        );
        self.reports.send_replace(Arc::clone(&report));
        report
    }

    /// Write the status file and append snapshot records on the blocking pool.
    ///
    /// Awaited, so a tick's writes finish before the next tick or shutdown.
    async fn write_out(&self, report: Arc<Report>) {
        let status = self.status.clone();
        let store = self.store.clone();
        if status.is_none() && store.is_none() {
            return;
        }

        let joined = tokio::task::spawn_blocking(move || {
            if let Some(writer) = status {
                if let Err(e) = writer.write(&report) {
                    warn!(error = %e, "Failed to write status file");
                }
            }
            match store {
                Some(store) => store.persist(&report).map(Some),
                None => Ok(None),
            }
        })
        .await
        .map_err(|e| SnapshotError::Task(e.to_string()));

        match joined {
            Ok(Ok(Some(records))) => debug!(records, "Snapshot persisted"),
            Ok(Ok(None)) => {}
            Ok(Err(e)) | Err(e) => error!(error = %e, "Snapshot persist failed; retrying next tick"),
        }
    }

    /// Tick every `interval` until shutdown.
    pub async fn run(mut self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticks = tokio::time::interval(interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown_signalled(&mut shutdown) => break,
                _ = ticks.tick() => {}
            }
            let report = self.tick(Utc::now());
            self.write_out(report).await;
        }
        info!("Tick task stopped");
    }
}
