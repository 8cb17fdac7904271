//! Polymarket Gamma REST client, used to bootstrap mapping files.
//!
//! An election "event" on Gamma groups one binary market per candidate (or
//! party). Each market's tracked asset is the token paired with the `Yes`
//! outcome.

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::domain::{AssetRole, AssetSpec, MarketSpec};
use crate::error::{Error, Result};

/// Event as returned by `GET /events?slug=`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaEvent {
    pub slug: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub markets: Vec<GammaMarket>,
}

/// One binary market inside an event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaMarket {
    #[serde(default)]
    pub question: String,
    /// JSON array encoded as a string, e.g. `"[\"123\", \"456\"]"`.
    #[serde(default)]
    pub clob_token_ids: Option<String>,
    /// JSON array encoded as a string, e.g. `"[\"Yes\", \"No\"]"`.
    #[serde(default)]
    pub outcomes: Option<String>,
    #[serde(default)]
    pub group_item_title: Option<String>,
}

impl GammaMarket {
    /// The asset paired with the `Yes` outcome.
    pub fn yes_token(&self) -> Option<String> {
        let tokens: Vec<String> = serde_json::from_str(self.clob_token_ids.as_deref()?).ok()?;
        let outcomes: Vec<String> = serde_json::from_str(self.outcomes.as_deref()?).ok()?;
        outcomes
            .iter()
            .position(|outcome| outcome.eq_ignore_ascii_case("yes"))
            .and_then(|index| tokens.get(index).cloned())
            .filter(|token| !token.trim().is_empty())
    }

    /// Display name: `groupItemTitle`, else `<name>` from "Will <name> win ...".
    pub fn logical_name(&self) -> Option<String> {
        if let Some(title) = self.group_item_title.as_deref().map(str::trim) {
            if !title.is_empty() {
                return Some(title.to_string());
            }
        }
        let rest = self.question.trim().strip_prefix("Will ")?;
        let (name, _) = rest.split_once(" win")?;
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    }
}

impl GammaEvent {
    /// Mapping-file market for this event. Markets without a name or a `Yes`
    /// token are skipped and counted.
    pub fn to_market_spec(&self, role: AssetRole, party: Option<String>) -> (MarketSpec, usize) {
        let mut skipped = 0;
        let assets = self
            .markets
            .iter()
            .filter_map(|market| {
                match (market.logical_name(), market.yes_token()) {
                    (Some(name), Some(asset_id)) => Some(AssetSpec { name, asset_id }),
                    _ => {
                        warn!(question = %market.question, "Skipping market without name or Yes token");
                        skipped += 1;
                        None
                    }
                }
            })
            .collect();

        let spec = MarketSpec {
            id: self.slug.clone(),
            role,
            party,
            assets,
        };
        (spec, skipped)
    }
}

/// HTTP client for the Gamma API.
pub struct GammaClient {
    client: Client,
    base_url: String,
}

impl GammaClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Fetch one event by slug.
    pub async fn event(&self, slug: &str) -> Result<GammaEvent> {
        let url = format!("{}/events", self.base_url.trim_end_matches('/'));
        info!(url = %url, slug, "Fetching Gamma event");

        let events: Vec<GammaEvent> = self
            .client
            .get(&url)
            .query(&[("slug", slug)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let event = events
            .into_iter()
            .next()
            .ok_or_else(|| Error::UnknownEvent(slug.to_string()))?;
        debug!(markets = event.markets.len(), "Fetched event");
        Ok(event)
    }
}
