//! Exchange abstraction layer.
//!
//! A [`MarketDataStream`] is one streaming connection carrying one market
//! channel. [`reconnecting::ReconnectingDataStream`] wraps any stream with the
//! retry state machine; [`stats::FeedStats`] counts what flows through.

pub mod reconnecting;
pub mod stats;

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{AssetId, MarketId, PriceUpdate};
use crate::error::Error;

/// Events produced by a market data stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketEvent {
    /// A decoded top-of-book update.
    Quote(PriceUpdate),
    /// A frame that could not be decoded; already dropped.
    Unparsable { reason: String },
    /// The connection was lost.
    Disconnected { reason: String },
}

/// Trait for real-time market data streams.
#[async_trait]
pub trait MarketDataStream: Send {
    /// Connect to the exchange's real-time data feed.
    async fn connect(&mut self) -> Result<(), Error>;

    /// Subscribe to market data for the given assets.
    async fn subscribe(&mut self, asset_ids: &[AssetId]) -> Result<(), Error>;

    /// Receive the next market event.
    ///
    /// Blocks until an event is available or the connection closes. Returns
    /// `None` when the stream is closed.
    async fn next_event(&mut self) -> Option<MarketEvent>;

    /// Close the connection. Default is a no-op.
    async fn close(&mut self) {}

    /// Get the exchange name for logging/debugging.
    fn exchange_name(&self) -> &'static str;
}

/// Implement MarketDataStream for boxed trait objects to allow use with generic wrappers.
#[async_trait]
impl MarketDataStream for Box<dyn MarketDataStream> {
    async fn connect(&mut self) -> Result<(), Error> {
        (**self).connect().await
    }

    async fn subscribe(&mut self, asset_ids: &[AssetId]) -> Result<(), Error> {
        (**self).subscribe(asset_ids).await
    }

    async fn next_event(&mut self) -> Option<MarketEvent> {
        (**self).next_event().await
    }

    async fn close(&mut self) {
        (**self).close().await;
    }

    fn exchange_name(&self) -> &'static str {
        (**self).exchange_name()
    }
}

/// Builds a fresh stream for a market channel.
pub type StreamFactory = Arc<dyn Fn(&MarketId) -> Box<dyn MarketDataStream> + Send + Sync>;
