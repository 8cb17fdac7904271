//! Reconnecting wrapper for MarketDataStream.
//!
//! Each channel runs an explicit retry state machine:
//!
//! ```text
//!             established                 transport failure
//! CONNECTING ─────────────▶ SUBSCRIBED ─────────────────────▶ BACKOFF
//!     ▲                                                          │
//!     └──────────────────────── backoff elapsed ─────────────────┘
//!
//! any state ── fatal failure ──▶ FATAL (terminal)
//! ```
//!
//! Transitions are a pure function of the current state and the event
//! ([`ChannelState::next`]); the wrapper only performs the I/O each state
//! calls for. Backoff delays grow geometrically from `initial_delay_ms`,
//! are capped at `max_delay_ms` and carry up to 20% random jitter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::stats::FeedStats;
use super::{MarketDataStream, MarketEvent};
use crate::config::ReconnectionConfig;
use crate::domain::AssetId;
use crate::error::{Error, FeedError};

/// Lifecycle state of one feed channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelState {
    /// Opening the connection and (re)subscribing.
    Connecting,
    /// Connected and subscribed; reading frames.
    Subscribed,
    /// Waiting before the next connection attempt.
    Backoff { attempt: u32, delay: Duration },
    /// Unrecoverable; the channel will not retry.
    Fatal { reason: String },
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Established,
    TransportFailure,
    FatalFailure(String),
    BackoffElapsed,
}

impl ChannelState {
    /// Next state for `transition`. `Fatal` absorbs everything.
    #[must_use]
    pub fn next(self, transition: Transition, backoff: &mut Backoff) -> Self {
        match (self, transition) {
            (state @ Self::Fatal { .. }, _) => state,
            (_, Transition::FatalFailure(reason)) => Self::Fatal { reason },
            (_, Transition::Established) => {
                backoff.reset();
                Self::Subscribed
            }
            (_, Transition::TransportFailure) => {
                let delay = backoff.next_delay();
                Self::Backoff {
                    attempt: backoff.failures(),
                    delay,
                }
            }
            (Self::Backoff { .. }, Transition::BackoffElapsed) => Self::Connecting,
            (state, Transition::BackoffElapsed) => state,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }
}

/// Exponential backoff with jitter.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: ReconnectionConfig,
    failures: u32,
    current_delay_ms: u64,
}

impl Backoff {
    pub fn new(config: ReconnectionConfig) -> Self {
        let current_delay_ms = config.initial_delay_ms;
        Self {
            config,
            failures: 0,
            current_delay_ms,
        }
    }

    /// Consecutive failures since the last success.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Reset backoff state after a successful connection.
    pub fn reset(&mut self) {
        self.failures = 0;
        self.current_delay_ms = self.config.initial_delay_ms;
    }

    /// Record a failure and return how long to wait before retrying.
    pub fn next_delay(&mut self) -> Duration {
        self.failures += 1;
        let base_ms = self.current_delay_ms;

        let next_ms = (base_ms as f64 * self.config.backoff_multiplier) as u64;
        self.current_delay_ms = next_ms.min(self.config.max_delay_ms);

        let jittered = base_ms + jitter_ms(base_ms);
        Duration::from_millis(jittered.min(self.config.max_delay_ms))
    }
}

/// Up to 20% of `base_ms`, uniformly drawn.
fn jitter_ms(base_ms: u64) -> u64 {
    let range = base_ms / 5;
    if range == 0 {
        return 0;
    }
    rand::thread_rng().gen_range(0..=range)
}

/// Wrapper that adds the retry state machine to any [`MarketDataStream`].
///
/// Disconnections are absorbed: the wrapper backs off, reconnects and
/// resubscribes to every asset it was asked for, then resumes yielding events.
/// It returns `None` only once the channel is [`ChannelState::Fatal`].
pub struct ReconnectingDataStream<S: MarketDataStream> {
    inner: S,
    backoff: Backoff,
    state: ChannelState,
    subscribed_assets: Vec<AssetId>,
    stats: Option<Arc<FeedStats>>,
    label: String,
}

impl<S: MarketDataStream> ReconnectingDataStream<S> {
    pub fn new(inner: S, config: ReconnectionConfig) -> Self {
        let label = inner.exchange_name().to_string();
        Self {
            inner,
            backoff: Backoff::new(config),
            state: ChannelState::Connecting,
            subscribed_assets: Vec::new(),
            stats: None,
            label,
        }
    }

    /// Count reconnect attempts into `stats`.
    #[must_use]
    pub fn with_stats(mut self, stats: Arc<FeedStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Name used in log lines (usually the market channel).
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn state(&self) -> &ChannelState {
        &self.state
    }

    fn transition(&mut self, transition: Transition) {
        let previous = std::mem::replace(&mut self.state, ChannelState::Connecting);
        self.state = previous.next(transition, &mut self.backoff);

        match &self.state {
            ChannelState::Subscribed => info!(channel = %self.label, "Channel subscribed"),
            ChannelState::Backoff { attempt, delay } => warn!(
                channel = %self.label,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Channel backing off"
            ),
            ChannelState::Fatal { reason } => {
                error!(channel = %self.label, reason = %reason, "Channel failed permanently")
            }
            ChannelState::Connecting => debug!(channel = %self.label, "Channel reconnecting"),
        }
    }

    fn fail(&mut self, err: &Error) {
        if err.is_fatal() {
            self.transition(Transition::FatalFailure(err.to_string()));
        } else {
            self.transition(Transition::TransportFailure);
        }
    }

    /// Connect and resubscribe to every tracked asset.
    async fn establish(&mut self) -> Result<(), Error> {
        self.inner.connect().await?;
        if !self.subscribed_assets.is_empty() {
            debug!(
                channel = %self.label,
                assets = self.subscribed_assets.len(),
                "Resubscribing to assets"
            );
            self.inner.subscribe(&self.subscribed_assets).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<S: MarketDataStream + Send> MarketDataStream for ReconnectingDataStream<S> {
    async fn connect(&mut self) -> Result<(), Error> {
        if let ChannelState::Fatal { reason } = &self.state {
            return Err(FeedError::Fatal(reason.clone()).into());
        }
        self.state = ChannelState::Connecting;
        let result = self.inner.connect().await;
        if let Err(err) = &result {
            self.fail(err);
        }
        result
    }

    async fn subscribe(&mut self, asset_ids: &[AssetId]) -> Result<(), Error> {
        // Stored for resubscription after reconnect
        self.subscribed_assets = asset_ids.to_vec();
        if self.state != ChannelState::Connecting {
            return Ok(());
        }
        match self.inner.subscribe(asset_ids).await {
            Ok(()) => {
                self.transition(Transition::Established);
                Ok(())
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    async fn next_event(&mut self) -> Option<MarketEvent> {
        loop {
            match &self.state {
                ChannelState::Fatal { .. } => return None,
                ChannelState::Backoff { delay, .. } => {
                    sleep(*delay).await;
                    self.transition(Transition::BackoffElapsed);
                }
                ChannelState::Connecting => {
                    if let Some(stats) = &self.stats {
                        stats.record_reconnect();
                    }
                    match self.establish().await {
                        Ok(()) => self.transition(Transition::Established),
                        Err(err) => {
                            warn!(channel = %self.label, error = %err, "Reconnection attempt failed");
                            self.fail(&err);
                        }
                    }
                }
                ChannelState::Subscribed => match self.inner.next_event().await {
                    Some(MarketEvent::Disconnected { reason }) => {
                        warn!(channel = %self.label, reason = %reason, "Connection lost, will reconnect");
                        self.transition(Transition::TransportFailure);
                    }
                    Some(event) => return Some(event),
                    None => {
                        warn!(channel = %self.label, "Data stream ended unexpectedly, will reconnect");
                        self.transition(Transition::TransportFailure);
                    }
                },
            }
        }
    }

    async fn close(&mut self) {
        self.inner.close().await;
    }

    fn exchange_name(&self) -> &'static str {
        self.inner.exchange_name()
    }
}
