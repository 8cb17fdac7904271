//! Application layer: wires the feed, the book, the tick task and
//! persistence together.

pub mod feed;
pub mod health;
pub mod report;
pub mod snapshot;
pub mod status_file;
pub mod ticker;

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub use feed::FeedClient;
pub use health::FeedHealth;
pub use report::{BookView, Report};
pub use snapshot::{SnapshotRecord, SnapshotStore};
pub use status_file::StatusWriter;
pub use ticker::Ticker;

use crate::adapter::polymarket;
use crate::config::Config;
use crate::domain::{AssetRegistry, MarketBook, MetricEngine, PriceUpdate};
use crate::error::Result;
use crate::exchange::stats::FeedStats;
use crate::exchange::StreamFactory;
use feed::shutdown_signalled;

/// The running pipeline, independent of where its streams come from.
pub struct Monitor {
    config: Config,
    book: Arc<MarketBook>,
    health: FeedHealth,
    stats: Arc<FeedStats>,
    reports: watch::Sender<Arc<Report>>,
}

impl Monitor {
    pub fn new(config: Config, registry: AssetRegistry) -> Self {
        let registry = Arc::new(registry);
        let (reports, _) = watch::channel(Arc::new(Report::empty(&registry, Utc::now())));
        Self {
            health: FeedHealth::new(config.feed.freshness_window()),
            book: Arc::new(MarketBook::new(registry)),
            stats: Arc::new(FeedStats::new()),
            reports,
            config,
        }
    }

    /// Pull handle on the latest report.
    pub fn reports(&self) -> watch::Receiver<Arc<Report>> {
        self.reports.subscribe()
    }

    pub fn book(&self) -> &Arc<MarketBook> {
        &self.book
    }

    pub fn health(&self) -> &FeedHealth {
        &self.health
    }

    pub fn stats(&self) -> &Arc<FeedStats> {
        &self.stats
    }

    /// Seed the book from each market's newest snapshot record.
    ///
    /// Records go through [`MarketBook::apply`], so assets no longer in the
    /// registry are dropped. Returns the number of entries restored.
    pub fn restore(&self, store: &SnapshotStore) -> usize {
        let mut restored = 0;
        for market in self.book.registry().markets() {
            let record = match store.latest(&market.id) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    warn!(market = %market.id, error = %e, "Could not read snapshot");
                    continue;
                }
            };
            for view in record.books {
                let (Some(sequence), Some(timestamp)) = (view.sequence, view.last_update) else {
                    continue;
                };
                let update = PriceUpdate::new(view.asset_id, view.bid, view.ask, sequence, timestamp);
                match self.book.apply(&update) {
                    Ok(()) => restored += 1,
                    Err(rejection) => debug!(%rejection, "Snapshot entry not restored"),
                }
            }
        }
        info!(restored, "Restored book entries from snapshots");
        restored
    }

    /// Run the feed and the tick task until `shutdown` fires.
    ///
    /// Returns an error only when every feed channel failed permanently.
    pub async fn run(self, factory: StreamFactory, shutdown: watch::Receiver<bool>) -> Result<()> {
        let snapshot = &self.config.snapshot;
        let store = snapshot
            .enabled
            .then(|| SnapshotStore::new(snapshot.directory.clone()));
        if let (Some(store), true) = (&store, snapshot.restore_on_start) {
            self.restore(store);
        }

        let shutdown_timeout = self.config.feed.shutdown_timeout();
        let (stop_tx, stop_rx) = watch::channel(false);
        let stop_tx = Arc::new(stop_tx);
        let forward = {
            let stop_tx = Arc::clone(&stop_tx);
            let mut shutdown = shutdown;
            tokio::spawn(async move {
                shutdown_signalled(&mut shutdown).await;
                info!("Shutdown signal received");
                let _ = stop_tx.send(true);
            })
        };

        let mut ticker = Ticker::new(
            MetricEngine::new(self.config.metrics.clone()),
            Arc::clone(&self.book),
            self.health.clone(),
            Arc::clone(&self.stats),
            self.reports,
        );
        if let Some(store) = store {
            ticker = ticker.with_store(store);
        }
        if let Some(path) = &snapshot.status_file {
            ticker = ticker.with_status_file(StatusWriter::new(path.clone()));
        }
        let tick_task = tokio::spawn(ticker.run(self.config.metrics.tick_interval(), stop_rx.clone()));

        let feed = FeedClient::new(
            Arc::clone(&self.book),
            self.health.clone(),
            Arc::clone(&self.stats),
            factory,
            self.config.feed.reconnection.clone(),
        );
        info!(
            markets = self.book.registry().markets().len(),
            assets = self.book.registry().len(),
            "Monitor started"
        );

        let feed_run = feed.run(stop_rx.clone());
        tokio::pin!(feed_run);
        let mut stop_watch = stop_rx;
        let feed_result = tokio::select! {
            result = &mut feed_run => result,
            _ = async {
                shutdown_signalled(&mut stop_watch).await;
                tokio::time::sleep(shutdown_timeout).await;
            } => {
                warn!(timeout_secs = shutdown_timeout.as_secs(), "Feed channels did not stop in time");
                Ok(())
            }
        };

        let _ = stop_tx.send(true);
        forward.abort();
        match tokio::time::timeout(shutdown_timeout, tick_task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Tick task failed"),
            Err(_) => warn!("Tick task did not stop in time"),
        }

        info!("Monitor stopped");
        feed_result.map_err(Into::into)
    }
}

/// Production entry point.
pub struct App;

impl App {
    /// Load the registry and run against the Polymarket feed.
    pub async fn run_with_shutdown(config: Config, shutdown: watch::Receiver<bool>) -> Result<()> {
        let registry = AssetRegistry::load(&config.registry)?;
        info!(
            registry = %config.registry.display(),
            markets = registry.markets().len(),
            assets = registry.len(),
            skipped = registry.skipped(),
            "Asset registry loaded"
        );
        let factory = polymarket::stream_factory(&config.feed);
        Monitor::new(config, registry).run(factory, shutdown).await
    }
}
