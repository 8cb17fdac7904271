//! Builders for domain primitives used across tests.
//!
//! Provides concise factory functions for [`AssetId`], [`PriceUpdate`],
//! [`MarketEvent`] and registries so tests focus on assertions rather than
//! construction boilerplate.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::domain::{AssetId, AssetRegistry, AssetRole, AssetSpec, MarketId, MarketSpec, PriceUpdate};
use crate::exchange::MarketEvent;

/// Market ids used by [`election_registry`].
pub const DEM_NOMINATION: &str = "democratic-nominee-2028";
pub const GOP_NOMINATION: &str = "republican-nominee-2028";
pub const WINNER: &str = "presidential-winner-2028";
pub const PARTY: &str = "winning-party-2028";

/// Create an [`AssetId`] from a string.
pub fn asset(id: &str) -> AssetId {
    AssetId::new(id)
}

/// Create a [`MarketId`] from a string.
pub fn market_id(id: &str) -> MarketId {
    MarketId::new(id)
}

/// Parse a decimal literal. Panics on bad input; tests only.
pub fn price(raw: &str) -> Decimal {
    Decimal::from_str(raw).unwrap()
}

/// Fixed reference instant for deterministic clocks.
pub fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(1_750_000_000, 0).unwrap()
}

/// Two-sided update stamped `epoch() + sequence` seconds.
pub fn update(asset_id: &str, bid: &str, ask: &str, sequence: u64) -> PriceUpdate {
    PriceUpdate::new(
        asset(asset_id),
        Some(price(bid)),
        Some(price(ask)),
        sequence,
        epoch() + chrono::Duration::seconds(sequence as i64),
    )
}

/// Two-sided update with an explicit timestamp.
pub fn update_at(asset_id: &str, mid: &str, sequence: u64, at: DateTime<Utc>) -> PriceUpdate {
    PriceUpdate::new(asset(asset_id), Some(price(mid)), Some(price(mid)), sequence, at)
}

/// Wrap [`update`] in a [`Quote`](MarketEvent::Quote) event.
pub fn quote_event(asset_id: &str, bid: &str, ask: &str, sequence: u64) -> MarketEvent {
    MarketEvent::Quote(update(asset_id, bid, ask, sequence))
}

/// Create a [`Disconnected`](MarketEvent::Disconnected) event.
pub fn disconnect_event(reason: &str) -> MarketEvent {
    MarketEvent::Disconnected {
        reason: reason.to_string(),
    }
}

fn assets(pairs: &[(&str, &str)]) -> Vec<AssetSpec> {
    pairs
        .iter()
        .map(|(name, id)| AssetSpec {
            name: (*name).into(),
            asset_id: (*id).into(),
        })
        .collect()
}

/// Market specs for a two-party election.
///
/// Asset ids follow `<market prefix>-<name>`: `dn-` Democratic nomination,
/// `rn-` Republican nomination, `w-` winner, `p-` party.
pub fn election_specs() -> Vec<MarketSpec> {
    vec![
        MarketSpec {
            id: DEM_NOMINATION.into(),
            role: AssetRole::Nomination,
            party: Some("Democratic".into()),
            assets: assets(&[("Alice Adams", "dn-alice"), ("Bob Brown", "dn-bob")]),
        },
        MarketSpec {
            id: GOP_NOMINATION.into(),
            role: AssetRole::Nomination,
            party: Some("Republican".into()),
            assets: assets(&[("Carol Clark", "rn-carol")]),
        },
        MarketSpec {
            id: WINNER.into(),
            role: AssetRole::Winner,
            party: None,
            assets: assets(&[
                ("Alice Adams", "w-alice"),
                ("Bob Brown", "w-bob"),
                ("Carol Clark", "w-carol"),
            ]),
        },
        MarketSpec {
            id: PARTY.into(),
            role: AssetRole::Party,
            party: None,
            assets: assets(&[("Democratic", "p-dem"), ("Republican", "p-gop")]),
        },
    ]
}

/// Registry built from [`election_specs`].
pub fn election_registry() -> AssetRegistry {
    AssetRegistry::from_specs(election_specs(), &BTreeMap::new())
}

/// The same election as a mapping file.
pub fn election_toml() -> String {
    format!(
        r#"[aliases]
"Bobby Brown" = "Bob Brown"

[[markets]]
id = "{DEM_NOMINATION}"
role = "nomination"
party = "Democratic"

[[markets.assets]]
name = "Alice Adams"
asset_id = "dn-alice"

[[markets.assets]]
name = "Bob Brown"
asset_id = "dn-bob"

[[markets]]
id = "{GOP_NOMINATION}"
role = "nomination"
party = "Republican"

[[markets.assets]]
name = "Carol Clark"
asset_id = "rn-carol"

[[markets]]
id = "{WINNER}"
role = "winner"

[[markets.assets]]
name = "Alice Adams"
asset_id = "w-alice"

[[markets.assets]]
name = "Bobby Brown"
asset_id = "w-bob"

[[markets.assets]]
name = "Carol Clark"
asset_id = "w-carol"

[[markets]]
id = "{PARTY}"
role = "party"

[[markets.assets]]
name = "Democratic"
asset_id = "p-dem"

[[markets.assets]]
name = "Republican"
asset_id = "p-gop"
"#
    )
}
