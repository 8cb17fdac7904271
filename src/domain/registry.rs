//! Static mapping from logical entities to exchange assets.
//!
//! The registry is loaded once at startup from a TOML mapping file and never
//! mutated afterwards, so it is shared as a plain `Arc<AssetRegistry>` with no
//! locking. Loading is lenient: a malformed market or asset table is skipped
//! with a warning instead of failing the whole file, which leaves the affected
//! metrics in `NO_VALID_STATES` rather than crashing the process.
//!
//! ```toml
//! [aliases]
//! "Stephen A. Smith" = "Stephen Smith"
//!
//! [[markets]]
//! id = "democratic-presidential-nominee-2028"
//! role = "nomination"
//! party = "Democratic"
//!
//! [[markets.assets]]
//! name = "Gavin Newsom"
//! asset_id = "1234"
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::LookupError;
use super::id::{AssetId, MarketId};
use crate::error::ConfigError;

/// What an asset prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetRole {
    /// Candidate wins their party's nomination.
    Nomination,
    /// Candidate wins the presidency.
    Winner,
    /// Party wins the presidency.
    Party,
}

impl fmt::Display for AssetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Nomination => "candidate-in-nomination-market",
            Self::Winner => "candidate-in-winner-market",
            Self::Party => "party-aggregate-market",
        };
        f.write_str(label)
    }
}

/// One resolved asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryEntry {
    pub logical_name: String,
    pub market_id: MarketId,
    pub asset_id: AssetId,
    pub role: AssetRole,
    /// Party whose nomination the market prices (nomination entries only).
    pub party: Option<String>,
}

/// A tracked market and the role of every asset in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketInfo {
    pub id: MarketId,
    pub role: AssetRole,
    pub party: Option<String>,
}

/// Mapping-file representation of a market, also produced by the Gamma bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSpec {
    pub id: String,
    pub role: AssetRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party: Option<String>,
    #[serde(default)]
    pub assets: Vec<AssetSpec>,
}

/// Mapping-file representation of one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSpec {
    pub name: String,
    pub asset_id: String,
}

/// Whole mapping file, as written by `kingmaker registry`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistryFile {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, String>,
    pub markets: Vec<MarketSpec>,
}

#[derive(Deserialize)]
struct RawRegistryFile {
    #[serde(default)]
    aliases: BTreeMap<String, String>,
    #[serde(default)]
    markets: Vec<toml::Value>,
}

#[derive(Deserialize)]
struct RawMarket {
    id: String,
    role: AssetRole,
    #[serde(default)]
    party: Option<String>,
    #[serde(default)]
    assets: Vec<toml::Value>,
}

/// Immutable asset registry.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    entries: Vec<RegistryEntry>,
    markets: Vec<MarketInfo>,
    by_asset: HashMap<AssetId, usize>,
    by_market: HashMap<MarketId, Vec<usize>>,
    skipped: usize,
}

impl AssetRegistry {
    /// Load the mapping file at `path`.
    ///
    /// # Errors
    ///
    /// Fails only when the file cannot be read or is not TOML at all;
    /// individual malformed tables are skipped.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents, &path.display().to_string())
    }

    /// Parse a mapping file from memory. `origin` labels errors and warnings.
    pub fn from_toml_str(contents: &str, origin: &str) -> Result<Self, ConfigError> {
        let raw: RawRegistryFile = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            contents: contents.to_string(),
            source,
        })?;

        let mut skipped = 0;
        let mut specs = Vec::with_capacity(raw.markets.len());
        for (index, value) in raw.markets.into_iter().enumerate() {
            let market: RawMarket = match value.try_into() {
                Ok(market) => market,
                Err(error) => {
                    warn!(origin, index, error = %error, "Skipping malformed market table");
                    skipped += 1;
                    continue;
                }
            };

            let mut assets = Vec::with_capacity(market.assets.len());
            for value in market.assets {
                match value.try_into::<AssetSpec>() {
                    Ok(asset) => assets.push(asset),
                    Err(error) => {
                        warn!(market = %market.id, error = %error, "Skipping malformed asset entry");
                        skipped += 1;
                    }
                }
            }

            specs.push(MarketSpec {
                id: market.id,
                role: market.role,
                party: market.party,
                assets,
            });
        }

        let mut registry = Self::from_specs(specs, &raw.aliases);
        registry.skipped += skipped;
        Ok(registry)
    }

    /// Build a registry from already-parsed market specs.
    ///
    /// Names pass through `aliases` and [`normalize_name`] so nomination and
    /// winner entries for the same person link up.
    pub fn from_specs(specs: Vec<MarketSpec>, aliases: &BTreeMap<String, String>) -> Self {
        let aliases: HashMap<String, String> = aliases
            .iter()
            .map(|(from, to)| (normalize_name(from), normalize_name(to)))
            .collect();
        let canonical = |raw: &str| {
            let name = normalize_name(raw);
            aliases.get(&name).cloned().unwrap_or(name)
        };

        let mut registry = Self::default();
        for spec in specs {
            let market_id = MarketId::new(spec.id.trim());
            if market_id.as_str().is_empty() {
                warn!("Skipping market with empty id");
                registry.skipped += 1;
                continue;
            }
            if registry.by_market.contains_key(&market_id) {
                warn!(market = %market_id, "Skipping duplicate market");
                registry.skipped += 1;
                continue;
            }

            let party = spec.party.as_deref().map(canonical).filter(|p| !p.is_empty());
            if spec.role == AssetRole::Nomination && party.is_none() {
                warn!(market = %market_id, "Nomination market has no party; its entries are unlinked");
            }

            registry.markets.push(MarketInfo {
                id: market_id.clone(),
                role: spec.role,
                party: party.clone(),
            });
            registry.by_market.insert(market_id.clone(), Vec::new());

            for asset in spec.assets {
                let name = canonical(&asset.name);
                let asset_id = AssetId::new(asset.asset_id.trim());
                if name.is_empty() || asset_id.as_str().is_empty() {
                    warn!(market = %market_id, name = %asset.name, "Skipping entry with empty name or asset id");
                    registry.skipped += 1;
                    continue;
                }
                if registry.by_asset.contains_key(&asset_id) {
                    warn!(market = %market_id, asset = %asset_id, "Skipping asset id already registered");
                    registry.skipped += 1;
                    continue;
                }

                let index = registry.entries.len();
                registry.entries.push(RegistryEntry {
                    logical_name: name,
                    market_id: market_id.clone(),
                    asset_id: asset_id.clone(),
                    role: spec.role,
                    party: party.clone(),
                });
                registry.by_asset.insert(asset_id, index);
                if let Some(indices) = registry.by_market.get_mut(&market_id) {
                    indices.push(index);
                }
            }
        }
        registry
    }

    /// Resolve an asset to its registry entry.
    pub fn resolve(&self, asset_id: &AssetId) -> Result<&RegistryEntry, LookupError> {
        self.by_asset
            .get(asset_id)
            .map(|&index| &self.entries[index])
            .ok_or_else(|| LookupError::UnknownAsset(asset_id.clone()))
    }

    /// Entries of a market in mapping-file order. Empty for unknown markets.
    pub fn entries_for_market(&self, market_id: &MarketId) -> Vec<&RegistryEntry> {
        self.by_market
            .get(market_id)
            .map(|indices| indices.iter().map(|&i| &self.entries[i]).collect())
            .unwrap_or_default()
    }

    /// Asset ids of a market, for subscription.
    pub fn assets_for_market(&self, market_id: &MarketId) -> Vec<AssetId> {
        self.entries_for_market(market_id)
            .into_iter()
            .map(|entry| entry.asset_id.clone())
            .collect()
    }

    /// Entry named `name` within `market_id`.
    pub fn find(&self, market_id: &MarketId, name: &str) -> Option<&RegistryEntry> {
        self.entries_for_market(market_id)
            .into_iter()
            .find(|entry| entry.logical_name == name)
    }

    pub fn markets(&self) -> &[MarketInfo] {
        &self.markets
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// First market with the given role.
    pub fn market_with_role(&self, role: AssetRole) -> Option<&MarketInfo> {
        self.markets.iter().find(|market| market.role == role)
    }

    /// Nomination market for `party`.
    pub fn nomination_market(&self, party: &str) -> Option<&MarketInfo> {
        self.markets
            .iter()
            .find(|m| m.role == AssetRole::Nomination && m.party.as_deref() == Some(party))
    }

    /// Parties in a stable order: nomination markets first, then any party
    /// that only appears in the party-aggregate market.
    pub fn parties(&self) -> Vec<String> {
        let mut parties: Vec<String> = Vec::new();
        let from_nominations = self
            .markets
            .iter()
            .filter(|m| m.role == AssetRole::Nomination)
            .filter_map(|m| m.party.clone());
        let from_party_market = self
            .market_with_role(AssetRole::Party)
            .map(|m| self.entries_for_market(&m.id))
            .unwrap_or_default()
            .into_iter()
            .map(|entry| entry.logical_name.clone());

        for party in from_nominations.chain(from_party_market) {
            if !parties.contains(&party) {
                parties.push(party);
            }
        }
        parties
    }

    /// Number of malformed or duplicate tables dropped during load.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Canonical form of a candidate or party name.
///
/// Trims, drops the periods of initials and collapses whitespace, so
/// `"J.D.  Vance"` and `"JD Vance"` compare equal.
#[must_use]
pub fn normalize_name(raw: &str) -> String {
    raw.replace('.', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
