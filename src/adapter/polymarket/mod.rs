//! Polymarket exchange integration.

mod gamma;
mod message;
mod stream;

use std::sync::Arc;

pub use gamma::{GammaClient, GammaEvent, GammaMarket};
pub use message::{decode_frame, DecodeError, DecodedFrame, PolymarketSubscribeMessage};
pub use stream::PolymarketDataStream;

use crate::config::FeedConfig;
use crate::exchange::{MarketDataStream, StreamFactory};

/// Factory producing one market-channel stream per call.
pub fn stream_factory(config: &FeedConfig) -> StreamFactory {
    let url = config.ws_url.clone();
    let keepalive = config.keepalive_interval();
    let liveness = config.liveness_timeout();
    Arc::new(move |_market| {
        Box::new(PolymarketDataStream::new(url.clone(), keepalive, liveness))
            as Box<dyn MarketDataStream>
    })
}
