//! Polymarket market-channel message types and frame decoding.
//!
//! A frame is one JSON object or an array of them. Objects carrying an
//! `event_type` are native Polymarket events:
//!
//! ```json
//! [{"event_type":"book","asset_id":"123","timestamp":"1718000000000","bids":[...],"asks":[...]}]
//! {"event_type":"price_change","timestamp":"1718000000123","price_changes":[{"asset_id":"123","best_bid":"0.41","best_ask":"0.43"}]}
//! ```
//!
//! Objects without one are read as already-normalized quotes:
//!
//! ```json
//! {"asset_id":"123","bid":"0.41","ask":"0.43","sequence":42,"ts":1718000000000}
//! ```
//!
//! Native events have no sequence number of their own; the event timestamp in
//! milliseconds is used instead.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::{AssetId, Price, PriceUpdate};

/// Subscription request sent to Polymarket WebSocket
#[derive(Debug, Serialize)]
pub struct PolymarketSubscribeMessage {
    pub assets_ids: Vec<String>,
    #[serde(rename = "type")]
    pub msg_type: String,
}

impl PolymarketSubscribeMessage {
    pub fn new(asset_ids: Vec<String>) -> Self {
        Self {
            assets_ids: asset_ids,
            msg_type: "market".into(),
        }
    }
}

/// Why a frame (or one element of it) was dropped.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected an object or array, got {0}")]
    Shape(&'static str),

    #[error("unknown event_type {0:?}")]
    UnknownEvent(String),

    #[error("invalid {field}: {value:?}")]
    BadValue { field: &'static str, value: String },
}

/// Native events on the market channel.
#[derive(Debug, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum PolymarketEvent {
    Book(PolymarketBookMessage),
    PriceChange(PolymarketPriceChangeMessage),
    LastTradePrice,
    TickSizeChange,
    #[serde(other)]
    Unknown,
}

/// Full book snapshot for one asset.
#[derive(Debug, Deserialize)]
pub struct PolymarketBookMessage {
    pub asset_id: String,
    #[serde(default)]
    pub market: Option<String>,
    #[serde(default, alias = "buys")]
    pub bids: Vec<PolymarketWsPriceLevel>,
    #[serde(default, alias = "sells")]
    pub asks: Vec<PolymarketWsPriceLevel>,
    pub timestamp: WireTimestamp,
    #[serde(default)]
    pub hash: Option<String>,
}

/// Price level as received from WebSocket (strings, not decimals)
#[derive(Debug, Clone, Deserialize)]
pub struct PolymarketWsPriceLevel {
    pub price: String,
    pub size: String,
}

#[derive(Debug, Deserialize)]
pub struct PolymarketPriceChangeMessage {
    #[serde(default)]
    pub market: Option<String>,
    pub price_changes: Vec<PolymarketPriceChange>,
    pub timestamp: WireTimestamp,
}

/// One level change, carrying the resulting top of book.
#[derive(Debug, Deserialize)]
pub struct PolymarketPriceChange {
    pub asset_id: String,
    #[serde(default)]
    pub best_bid: Option<String>,
    #[serde(default)]
    pub best_ask: Option<String>,
}

/// Quote already in the decoded tuple shape.
#[derive(Debug, Deserialize)]
pub struct NormalizedQuote {
    pub asset_id: String,
    #[serde(default)]
    pub bid: Option<Decimal>,
    #[serde(default)]
    pub ask: Option<Decimal>,
    pub sequence: u64,
    pub ts: WireTimestamp,
}

/// Timestamp as sent on the wire: milliseconds as a number or a string, or an
/// RFC 3339 string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    Millis(u64),
    Text(String),
}

impl WireTimestamp {
    fn millis(&self) -> Result<u64, DecodeError> {
        match self {
            Self::Millis(ms) => Ok(*ms),
            Self::Text(text) => {
                let text = text.trim();
                text.parse::<u64>().or_else(|_| {
                    DateTime::parse_from_rfc3339(text)
                        .ok()
                        .and_then(|at| u64::try_from(at.timestamp_millis()).ok())
                        .ok_or_else(|| DecodeError::BadValue {
                            field: "timestamp",
                            value: text.to_string(),
                        })
                })
            }
        }
    }

    fn to_datetime(&self) -> Result<(u64, DateTime<Utc>), DecodeError> {
        let ms = self.millis()?;
        let at = i64::try_from(ms)
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .ok_or_else(|| DecodeError::BadValue {
                field: "timestamp",
                value: ms.to_string(),
            })?;
        Ok((ms, at))
    }
}

impl PolymarketBookMessage {
    /// Best bid is the highest bid level; best ask the lowest ask level.
    /// Levels that fail to parse are ignored.
    pub fn to_update(&self) -> Result<PriceUpdate, DecodeError> {
        let (sequence, timestamp) = self.timestamp.to_datetime()?;
        let bid = Self::parse_levels(&self.bids).max();
        let ask = Self::parse_levels(&self.asks).min();
        Ok(PriceUpdate::new(
            AssetId::new(self.asset_id.as_str()),
            bid,
            ask,
            sequence,
            timestamp,
        ))
    }

    fn parse_levels(levels: &[PolymarketWsPriceLevel]) -> impl Iterator<Item = Price> + '_ {
        levels.iter().filter_map(|pl| {
            let size = Decimal::from_str(&pl.size).ok()?;
            if size.is_zero() {
                return None;
            }
            Decimal::from_str(&pl.price).ok()
        })
    }
}

impl PolymarketPriceChangeMessage {
    pub fn to_updates(&self) -> Result<Vec<PriceUpdate>, DecodeError> {
        let (sequence, timestamp) = self.timestamp.to_datetime()?;
        self.price_changes
            .iter()
            .map(|change| {
                Ok(PriceUpdate::new(
                    AssetId::new(change.asset_id.as_str()),
                    optional_price("best_bid", change.best_bid.as_deref())?,
                    optional_price("best_ask", change.best_ask.as_deref())?,
                    sequence,
                    timestamp,
                ))
            })
            .collect()
    }
}

impl NormalizedQuote {
    pub fn to_update(&self) -> Result<PriceUpdate, DecodeError> {
        let (_, timestamp) = self.ts.to_datetime()?;
        Ok(PriceUpdate::new(
            AssetId::new(self.asset_id.as_str()),
            self.bid,
            self.ask,
            self.sequence,
            timestamp,
        ))
    }
}

fn optional_price(field: &'static str, raw: Option<&str>) -> Result<Option<Price>, DecodeError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => Decimal::from_str(text)
            .map(Some)
            .map_err(|_| DecodeError::BadValue {
                field,
                value: text.to_string(),
            }),
    }
}

/// Result of decoding one frame.
#[derive(Debug, Default)]
pub struct DecodedFrame {
    /// At most one update per asset, in first-seen order.
    pub updates: Vec<PriceUpdate>,
    /// Elements that were dropped.
    pub unparsable: Vec<DecodeError>,
}

/// Decode a text frame into price updates.
///
/// A frame that is not JSON at all is an error. Otherwise each element is
/// decoded on its own; bad elements land in [`DecodedFrame::unparsable`]
/// without affecting the rest. Several updates for one asset are coalesced
/// and the last one wins.
pub fn decode_frame(text: &str) -> Result<DecodedFrame, DecodeError> {
    let elements = match serde_json::from_str::<Value>(text)? {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        Value::Null => return Err(DecodeError::Shape("null")),
        Value::Bool(_) => return Err(DecodeError::Shape("bool")),
        Value::Number(_) => return Err(DecodeError::Shape("number")),
        Value::String(_) => return Err(DecodeError::Shape("string")),
    };

    let mut frame = DecodedFrame::default();
    let mut positions: HashMap<AssetId, usize> = HashMap::new();
    for element in elements {
        match decode_element(element) {
            Ok(updates) => {
                for update in updates {
                    match positions.get(&update.asset_id) {
                        Some(&index) => frame.updates[index] = update,
                        None => {
                            positions.insert(update.asset_id.clone(), frame.updates.len());
                            frame.updates.push(update);
                        }
                    }
                }
            }
            Err(err) => frame.unparsable.push(err),
        }
    }
    Ok(frame)
}

fn decode_element(element: Value) -> Result<Vec<PriceUpdate>, DecodeError> {
    let event_type = element
        .get("event_type")
        .and_then(Value::as_str)
        .map(str::to_owned);

    let Some(event_type) = event_type else {
        let quote: NormalizedQuote = serde_json::from_value(element)?;
        return Ok(vec![quote.to_update()?]);
    };

    match serde_json::from_value::<PolymarketEvent>(element)? {
        PolymarketEvent::Book(book) => Ok(vec![book.to_update()?]),
        PolymarketEvent::PriceChange(change) => change.to_updates(),
        PolymarketEvent::LastTradePrice | PolymarketEvent::TickSizeChange => Ok(Vec::new()),
        PolymarketEvent::Unknown => Err(DecodeError::UnknownEvent(event_type)),
    }
}
