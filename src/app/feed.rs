//! Feed client: one reconnecting channel task per tracked market.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::health::FeedHealth;
use crate::config::ReconnectionConfig;
use crate::domain::{AssetId, MarketBook, MarketId, PriceUpdate, Rejection};
use crate::error::FeedError;
use crate::exchange::reconnecting::{ChannelState, ReconnectingDataStream};
use crate::exchange::stats::FeedStats;
use crate::exchange::{MarketDataStream, MarketEvent, StreamFactory};

/// How a channel task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelExit {
    Shutdown,
    Fatal(String),
}

/// Drives every market channel into the shared [`MarketBook`].
pub struct FeedClient {
    book: Arc<MarketBook>,
    health: FeedHealth,
    stats: Arc<FeedStats>,
    factory: StreamFactory,
    reconnection: ReconnectionConfig,
}

/// Per-task handles, cloned into each spawned channel.
#[derive(Clone)]
struct ChannelContext {
    market: MarketId,
    book: Arc<MarketBook>,
    health: FeedHealth,
    stats: Arc<FeedStats>,
}

impl FeedClient {
    pub fn new(
        book: Arc<MarketBook>,
        health: FeedHealth,
        stats: Arc<FeedStats>,
        factory: StreamFactory,
        reconnection: ReconnectionConfig,
    ) -> Self {
        Self {
            book,
            health,
            stats,
            factory,
            reconnection,
        }
    }

    pub fn stats(&self) -> &Arc<FeedStats> {
        &self.stats
    }

    pub fn is_healthy(&self) -> bool {
        self.health.is_healthy()
    }

    /// Run until `shutdown` fires or every channel has failed permanently.
    ///
    /// A fatal channel is logged and counted; the others keep running.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<(), FeedError> {
        let registry = Arc::clone(self.book.registry());
        let mut tasks = JoinSet::new();

        for market in registry.markets() {
            let assets = registry.assets_for_market(&market.id);
            if assets.is_empty() {
                warn!(market = %market.id, "Market has no valid assets; not subscribing");
                continue;
            }

            let stream = ReconnectingDataStream::new((self.factory)(&market.id), self.reconnection.clone())
                .with_stats(Arc::clone(&self.stats))
                .with_label(market.id.to_string());
            let ctx = ChannelContext {
                market: market.id.clone(),
                book: Arc::clone(&self.book),
                health: self.health.clone(),
                stats: Arc::clone(&self.stats),
            };
            let shutdown = shutdown.clone();
            let market_id = market.id.clone();
            tasks.spawn(async move {
                let exit = run_channel(ctx, stream, assets, shutdown).await;
                (market_id, exit)
            });
        }

        let channels = tasks.len();
        info!(channels, "Feed channels started");
        if channels == 0 {
            warn!("No market channels to run; waiting for shutdown");
            let mut shutdown = shutdown;
            shutdown_signalled(&mut shutdown).await;
            return Ok(());
        }

        let mut failures = Vec::new();
        let mut stopped = 0usize;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, ChannelExit::Shutdown)) => stopped += 1,
                Ok((market, ChannelExit::Fatal(reason))) => {
                    error!(market = %market, reason = %reason, "Feed channel terminated");
                    failures.push(format!("{market}: {reason}"));
                }
                Err(e) => {
                    error!(error = %e, "Feed channel task failed");
                    self.stats.record_fatal();
                    failures.push(e.to_string());
                }
            }
        }

        if stopped == 0 && !failures.is_empty() {
            return Err(FeedError::AllChannelsFailed(failures.join("; ")));
        }
        info!(channels = stopped, "Feed channels stopped");
        Ok(())
    }
}

/// Resolves once shutdown is requested or the sender is gone.
pub(crate) async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

async fn run_channel(
    ctx: ChannelContext,
    mut stream: ReconnectingDataStream<Box<dyn MarketDataStream>>,
    assets: Vec<AssetId>,
    mut shutdown: watch::Receiver<bool>,
) -> ChannelExit {
    let started = tokio::select! {
        _ = shutdown_signalled(&mut shutdown) => false,
        _ = async {
            // Failures here are already folded into the stream's state.
            let _ = stream.connect().await;
            let _ = stream.subscribe(&assets).await;
        } => true,
    };
    if !started {
        stream.close().await;
        return ChannelExit::Shutdown;
    }

    loop {
        let event = tokio::select! {
            _ = shutdown_signalled(&mut shutdown) => None,
            event = stream.next_event() => Some(event),
        };

        match event {
            None => {
                debug!(market = %ctx.market, "Channel shutting down");
                stream.close().await;
                return ChannelExit::Shutdown;
            }
            Some(None) => {
                ctx.stats.record_fatal();
                let reason = match stream.state() {
                    ChannelState::Fatal { reason } => reason.clone(),
                    other => format!("stream ended in state {other:?}"),
                };
                stream.close().await;
                return ChannelExit::Fatal(reason);
            }
            Some(Some(MarketEvent::Quote(update))) => ctx.handle(&update),
            Some(Some(MarketEvent::Unparsable { reason })) => {
                ctx.stats.record_unparsable();
                debug!(market = %ctx.market, reason = %reason, "Dropped unparsable message");
            }
            // Reconnection already handled by the wrapper.
            Some(Some(MarketEvent::Disconnected { .. })) => {}
        }
    }
}

impl ChannelContext {
    fn handle(&self, update: &PriceUpdate) {
        self.stats.record_decoded();
        match self.book.apply(update) {
            Ok(()) => {
                self.stats.record_applied();
                self.health.record(&self.market, Utc::now());
            }
            Err(rejection) => {
                self.stats.record_rejected();
                let kind = rejection.kind();
                match &rejection {
                    Rejection::StaleOrDuplicate { .. } => {
                        debug!(market = %self.market, kind, %rejection, "Dropped stale update");
                    }
                    Rejection::UnknownAsset { .. } => {
                        debug!(market = %self.market, kind, %rejection, "Dropped update for unmapped asset");
                    }
                    Rejection::InvariantViolation { .. } => {
                        warn!(market = %self.market, kind, %rejection, "Data anomaly");
                    }
                }
            }
        }
    }
}
