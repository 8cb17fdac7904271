//! Mock [`MarketDataStream`] implementations for testing.
//!
//! - [`ScriptedStream`] - Pre-loaded connect/subscribe results and events.
//!   Best for: error handling, reconnection logic, retry behavior.
//!
//! - [`ChannelStream`] - Channel-backed stream with external control handle.
//!   Best for: integration tests needing precise, on-demand event delivery.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::domain::AssetId;
use crate::error::Result;
use crate::exchange::{MarketDataStream, MarketEvent};

// ---------------------------------------------------------------------------
// ScriptedStream
// ---------------------------------------------------------------------------

/// A mock stream with scripted connect/subscribe results and a fixed event queue.
///
/// Each call to `connect()` or `subscribe()` pops the next result from the
/// corresponding queue (defaults to `Ok(())` when exhausted). Once the event
/// queue is drained `next_event` returns `None`.
pub struct ScriptedStream {
    connect_results: VecDeque<Result<()>>,
    subscribe_results: VecDeque<Result<()>>,
    events: VecDeque<Option<MarketEvent>>,
    connect_count: Arc<AtomicU32>,
    subscribe_count: Arc<AtomicU32>,
}

impl ScriptedStream {
    pub fn new() -> Self {
        Self {
            connect_results: VecDeque::new(),
            subscribe_results: VecDeque::new(),
            events: VecDeque::new(),
            connect_count: Arc::new(AtomicU32::new(0)),
            subscribe_count: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn with_connect_results(mut self, results: Vec<Result<()>>) -> Self {
        self.connect_results = results.into();
        self
    }

    pub fn with_subscribe_results(mut self, results: Vec<Result<()>>) -> Self {
        self.subscribe_results = results.into();
        self
    }

    pub fn with_events(mut self, events: Vec<Option<MarketEvent>>) -> Self {
        self.events = events.into();
        self
    }

    /// Get shared counters for asserting connect/subscribe call counts.
    pub fn counts(&self) -> (Arc<AtomicU32>, Arc<AtomicU32>) {
        (self.connect_count.clone(), self.subscribe_count.clone())
    }
}

impl Default for ScriptedStream {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataStream for ScriptedStream {
    async fn connect(&mut self) -> Result<()> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        self.connect_results.pop_front().unwrap_or(Ok(()))
    }

    async fn subscribe(&mut self, _asset_ids: &[AssetId]) -> Result<()> {
        self.subscribe_count.fetch_add(1, Ordering::SeqCst);
        self.subscribe_results.pop_front().unwrap_or(Ok(()))
    }

    async fn next_event(&mut self) -> Option<MarketEvent> {
        self.events.pop_front().flatten()
    }

    fn exchange_name(&self) -> &'static str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// ChannelStream
// ---------------------------------------------------------------------------

/// A mock stream controlled externally via a [`ChannelStreamHandle`].
///
/// Events are sent into the handle and read by the consumer via
/// `next_event()`. No real network I/O. Connect results can be scripted so a
/// channel can be made to fail fatally on its first attempt.
pub struct ChannelStream {
    event_rx: mpsc::Receiver<Option<MarketEvent>>,
    connect_results: VecDeque<Result<()>>,
    connect_count: Arc<AtomicU32>,
    subscribe_count: Arc<AtomicU32>,
    subscribed_assets: Arc<Mutex<Vec<AssetId>>>,
}

/// Control handle for a [`ChannelStream`].
#[derive(Clone)]
pub struct ChannelStreamHandle {
    event_tx: mpsc::Sender<Option<MarketEvent>>,
    connect_count: Arc<AtomicU32>,
    subscribe_count: Arc<AtomicU32>,
    subscribed_assets: Arc<Mutex<Vec<AssetId>>>,
}

impl ChannelStreamHandle {
    /// Send an event to the stream.
    pub async fn send(&self, event: MarketEvent) {
        let _ = self.event_tx.send(Some(event)).await;
    }

    /// Signal end-of-stream (causes `next_event` to return `None` once).
    pub async fn close(&self) {
        let _ = self.event_tx.send(None).await;
    }

    /// How many times `connect()` was called.
    pub fn connect_count(&self) -> u32 {
        self.connect_count.load(Ordering::SeqCst)
    }

    /// How many times `subscribe()` was called.
    pub fn subscribe_count(&self) -> u32 {
        self.subscribe_count.load(Ordering::SeqCst)
    }

    /// Which assets were last subscribed to.
    pub fn subscribed_assets(&self) -> Vec<AssetId> {
        self.subscribed_assets.lock().clone()
    }
}

impl ChannelStream {
    pub fn with_connect_results(mut self, results: Vec<Result<()>>) -> Self {
        self.connect_results = results.into();
        self
    }
}

/// Create a [`ChannelStream`] and its control [`ChannelStreamHandle`].
pub fn channel_stream(buffer: usize) -> (ChannelStream, ChannelStreamHandle) {
    let (tx, rx) = mpsc::channel(buffer);
    let cc = Arc::new(AtomicU32::new(0));
    let sc = Arc::new(AtomicU32::new(0));
    let sa = Arc::new(Mutex::new(Vec::new()));
    (
        ChannelStream {
            event_rx: rx,
            connect_results: VecDeque::new(),
            connect_count: cc.clone(),
            subscribe_count: sc.clone(),
            subscribed_assets: sa.clone(),
        },
        ChannelStreamHandle {
            event_tx: tx,
            connect_count: cc,
            subscribe_count: sc,
            subscribed_assets: sa,
        },
    )
}

#[async_trait]
impl MarketDataStream for ChannelStream {
    async fn connect(&mut self) -> Result<()> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        self.connect_results.pop_front().unwrap_or(Ok(()))
    }

    async fn subscribe(&mut self, asset_ids: &[AssetId]) -> Result<()> {
        self.subscribe_count.fetch_add(1, Ordering::SeqCst);
        *self.subscribed_assets.lock() = asset_ids.to_vec();
        Ok(())
    }

    async fn next_event(&mut self) -> Option<MarketEvent> {
        match self.event_rx.recv().await {
            Some(Some(event)) => Some(event),
            Some(None) => None,
            // Handle dropped: stay quiet rather than spin through reconnects.
            None => std::future::pending().await,
        }
    }

    fn exchange_name(&self) -> &'static str {
        "mock"
    }
}
