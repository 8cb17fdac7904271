//! Exchange-agnostic domain logic: asset identity, the live price store and
//! the metrics derived from it.

pub mod book;
pub mod engine;
pub mod error;
pub mod id;
pub mod metric;
pub mod money;
pub mod quote;
pub mod registry;

pub use book::{BookSnapshot, MarketBook, RejectionStats};
pub use engine::{unresolvable_markets, MetricEngine, MetricsConfig};
pub use error::{LookupError, Rejection};
pub use id::{AssetId, MarketId};
pub use metric::{ConfidenceState, DerivedMetric, MetricKind};
pub use money::Price;
pub use quote::{BookEntry, PriceUpdate};
pub use registry::{
    normalize_name, AssetRegistry, AssetRole, AssetSpec, MarketInfo, MarketSpec, RegistryEntry,
    RegistryFile,
};
