//! Polymarket market-channel WebSocket stream.
//!
//! One [`PolymarketDataStream`] carries one market channel. It only speaks
//! the wire protocol; retries belong to
//! [`ReconnectingDataStream`](crate::exchange::reconnecting::ReconnectingDataStream).
//!
//! Reads never block unbounded: after `keepalive` of silence the stream sends
//! a `PING` text frame, and after `liveness` of silence it reports the
//! connection as lost. Any inbound frame, including the server's `PONG`,
//! counts as activity.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use super::message::{decode_frame, PolymarketSubscribeMessage};
use crate::domain::AssetId;
use crate::error::{FeedError, Result};
use crate::exchange::{MarketDataStream, MarketEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const KEEPALIVE_PING: &str = "PING";
const KEEPALIVE_PONG: &str = "PONG";

/// Polymarket market data stream implementing the `MarketDataStream` trait.
pub struct PolymarketDataStream {
    url: String,
    ws: Option<WsStream>,
    /// Events decoded from a frame but not yet handed out.
    pending: VecDeque<MarketEvent>,
    keepalive: Duration,
    liveness: Duration,
    last_frame: Instant,
}

impl PolymarketDataStream {
    /// Create a new data stream for the given WebSocket URL.
    #[must_use]
    pub fn new(url: String, keepalive: Duration, liveness: Duration) -> Self {
        Self {
            url,
            ws: None,
            pending: VecDeque::new(),
            keepalive,
            liveness,
            last_frame: Instant::now(),
        }
    }

    /// Queue the events carried by one text frame.
    fn enqueue_frame(pending: &mut VecDeque<MarketEvent>, text: &str) {
        match decode_frame(text) {
            Ok(frame) => {
                for err in frame.unparsable {
                    pending.push_back(MarketEvent::Unparsable {
                        reason: err.to_string(),
                    });
                }
                pending.extend(frame.updates.into_iter().map(MarketEvent::Quote));
            }
            Err(err) => pending.push_back(MarketEvent::Unparsable {
                reason: err.to_string(),
            }),
        }
    }
}

#[async_trait]
impl MarketDataStream for PolymarketDataStream {
    async fn connect(&mut self) -> Result<()> {
        info!(url = %self.url, "Connecting to WebSocket");
        let (ws_stream, response) = connect_async(&self.url).await?;
        info!(status = %response.status(), "WebSocket connected");
        self.ws = Some(ws_stream);
        self.pending.clear();
        self.last_frame = Instant::now();
        Ok(())
    }

    async fn subscribe(&mut self, asset_ids: &[AssetId]) -> Result<()> {
        let ws = self.ws.as_mut().ok_or(FeedError::NotConnected)?;

        let asset_ids: Vec<String> = asset_ids.iter().map(|a| a.as_str().to_string()).collect();
        let msg = PolymarketSubscribeMessage::new(asset_ids.clone());
        let json = serde_json::to_string(&msg)?;

        // Log a truncated view of assets to avoid spam
        let total = asset_ids.len();
        if total <= 5 {
            info!(assets = ?asset_ids, "Subscribing to assets");
        } else {
            let preview: Vec<_> = asset_ids.iter().take(5).collect();
            info!(assets = ?preview, more = total - 5, "Subscribing to assets");
        }
        ws.send(Message::Text(json)).await?;
        Ok(())
    }

    async fn next_event(&mut self) -> Option<MarketEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }

        let ws = self.ws.as_mut()?;

        loop {
            let silence = self.last_frame.elapsed();
            if silence >= self.liveness {
                warn!(silent_ms = silence.as_millis() as u64, "No frames within liveness window");
                return Some(MarketEvent::Disconnected {
                    reason: format!("no frames for {silence:?}"),
                });
            }
            let wait = self.keepalive.min(self.liveness - silence);

            let frame = match timeout(wait, ws.next()).await {
                Ok(frame) => frame,
                Err(_) => {
                    if self.last_frame.elapsed() >= self.keepalive {
                        trace!("Sending keepalive");
                        if let Err(e) = ws.send(Message::Text(KEEPALIVE_PING.into())).await {
                            return Some(MarketEvent::Disconnected {
                                reason: format!("failed to send keepalive: {e}"),
                            });
                        }
                    }
                    continue;
                }
            };

            match frame {
                Some(Ok(Message::Text(text))) => {
                    self.last_frame = Instant::now();
                    if text.trim() == KEEPALIVE_PONG {
                        trace!("Received keepalive");
                        continue;
                    }
                    trace!(bytes = text.len(), "Received WebSocket text frame");
                    Self::enqueue_frame(&mut self.pending, &text);
                    if let Some(event) = self.pending.pop_front() {
                        return Some(event);
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    self.last_frame = Instant::now();
                    trace!("Received WebSocket ping");
                    if ws.send(Message::Pong(data)).await.is_err() {
                        return Some(MarketEvent::Disconnected {
                            reason: "Failed to send pong".into(),
                        });
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(frame = ?frame, "WebSocket closed by server");
                    return Some(MarketEvent::Disconnected {
                        reason: frame.map(|f| f.reason.to_string()).unwrap_or_default(),
                    });
                }
                Some(Ok(_)) => {
                    self.last_frame = Instant::now();
                }
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket error");
                    return Some(MarketEvent::Disconnected {
                        reason: e.to_string(),
                    });
                }
                None => {
                    return Some(MarketEvent::Disconnected {
                        reason: "stream ended".into(),
                    });
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut ws) = self.ws.take() {
            debug!(url = %self.url, "Closing WebSocket");
            let _ = ws.close(None).await;
        }
    }

    fn exchange_name(&self) -> &'static str {
        "Polymarket"
    }
}
