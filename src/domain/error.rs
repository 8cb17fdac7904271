//! Domain errors for registry lookups and book updates.
//!
//! Every [`Rejection`] is contained at the feed level: the offending update is
//! dropped and counted, the run continues.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use kingmaker::domain::error::Rejection;
//! use kingmaker::domain::{AssetId, AssetRegistry, MarketBook, PriceUpdate};
//! use rust_decimal_macros::dec;
//!
//! let book = MarketBook::new(Arc::new(AssetRegistry::default()));
//! let update = PriceUpdate::new(AssetId::new("ghost"), Some(dec!(0.4)), Some(dec!(0.5)), 1, chrono::Utc::now());
//!
//! assert!(matches!(book.apply(&update), Err(Rejection::UnknownAsset { .. })));
//! ```

use rust_decimal::Decimal;
use thiserror::Error;

use super::id::AssetId;

/// Why [`MarketBook::apply`](super::MarketBook::apply) refused an update.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The asset is not in the registry.
    #[error("unknown asset {asset_id}")]
    UnknownAsset {
        /// The unresolved asset.
        asset_id: AssetId,
    },

    /// The sequence number is not newer than the stored entry's.
    #[error("stale or duplicate update for {asset_id}: sequence {incoming} <= {stored}")]
    StaleOrDuplicate {
        asset_id: AssetId,
        incoming: u64,
        stored: u64,
    },

    /// The update breaks a price invariant (crossed book or out-of-range price).
    #[error("invariant violation for {asset_id}: {reason}")]
    InvariantViolation { asset_id: AssetId, reason: String },
}

impl Rejection {
    /// Short label used for counters and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownAsset { .. } => "unknown_asset",
            Self::StaleOrDuplicate { .. } => "stale_or_duplicate",
            Self::InvariantViolation { .. } => "invariant_violation",
        }
    }

    pub(crate) fn crossed(asset_id: &AssetId, bid: Decimal, ask: Decimal) -> Self {
        Self::InvariantViolation {
            asset_id: asset_id.clone(),
            reason: format!("bid {bid} > ask {ask}"),
        }
    }

    pub(crate) fn out_of_range(asset_id: &AssetId, side: &str, price: Decimal) -> Self {
        Self::InvariantViolation {
            asset_id: asset_id.clone(),
            reason: format!("{side} {price} outside [0, 1]"),
        }
    }
}

/// Lookup failures for registry and book reads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("unknown asset {0}")]
    UnknownAsset(AssetId),

    /// The asset is registered but no update has been observed yet.
    #[error("no data observed for {0}")]
    NoData(AssetId),
}
