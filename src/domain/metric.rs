//! Derived metric values and their confidence classification.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::MarketId;

/// How far a derived value can be trusted.
///
/// Ordered by precedence: when several conditions hold, the greatest wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceState {
    Ok,
    /// At least one input is older than the staleness threshold.
    Stale,
    /// At least one required price is absent.
    MissingInput,
    /// A market the metric depends on has no resolvable registry or book state.
    NoValidStates,
}

impl ConfidenceState {
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for ConfidenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Ok => "OK",
            Self::Stale => "STALE",
            Self::MissingInput => "MISSING_INPUT",
            Self::NoValidStates => "NO_VALID_STATES",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Nominee-implied probability that the party wins.
    SyntheticProbability,
    /// Synthetic probability minus the party market price.
    ArbitrageMargin,
    /// One minus (synthetic of one party plus the rival party's price).
    CrossPartyMargin,
    /// One minus (party's candidates' Yes asks + party No ask).
    IntraPartyYesArb,
    /// One minus (party's candidates' No asks less `n - 1` + party Yes ask).
    IntraPartyNoArb,
    /// One minus (party's candidates' Yes asks + rival party Yes ask).
    CrossPartyYesArb,
    /// One minus (party's candidates' No asks less `n - 1` + rival party No ask).
    CrossPartyNoArb,
    /// P(wins presidency) / P(nominated) for one candidate.
    ConditionalOdds,
}

impl MetricKind {
    /// Margins are the kinds that can raise a signal.
    pub fn is_margin(self) -> bool {
        !matches!(self, Self::SyntheticProbability | Self::ConditionalOdds)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::SyntheticProbability => "synthetic",
            Self::ArbitrageMargin => "margin",
            Self::CrossPartyMargin => "cross margin",
            Self::IntraPartyYesArb => "intra arb (yes)",
            Self::IntraPartyNoArb => "intra arb (no)",
            Self::CrossPartyYesArb => "cross arb (yes)",
            Self::CrossPartyNoArb => "cross arb (no)",
            Self::ConditionalOdds => "conditional odds",
        };
        f.write_str(label)
    }
}

/// One derived value. Emitted for every metric on every tick, whatever its
/// confidence, so consumers can show "no data" explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedMetric {
    pub kind: MetricKind,
    /// Party name, candidate name, or `"A vs B"` for cross-party margins.
    pub entity: String,
    /// Party the metric belongs to.
    pub party: String,
    /// Fixed-precision value; `None` when it cannot be computed.
    pub value: Option<Decimal>,
    pub confidence_state: ConfidenceState,
    pub computed_at: DateTime<Utc>,
    /// Margin above the configured threshold with OK confidence.
    #[serde(default)]
    pub signal: bool,
    /// Markets whose prices feed this metric.
    pub markets: Vec<MarketId>,
}

impl DerivedMetric {
    pub fn depends_on(&self, market_id: &MarketId) -> bool {
        self.markets.contains(market_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_precedence_follows_declaration_order() {
        assert!(ConfidenceState::NoValidStates > ConfidenceState::MissingInput);
        assert!(ConfidenceState::MissingInput > ConfidenceState::Stale);
        assert!(ConfidenceState::Stale > ConfidenceState::Ok);
    }

    #[test]
    fn confidence_serializes_in_screaming_case() {
        let json = serde_json::to_string(&ConfidenceState::NoValidStates).unwrap();
        assert_eq!(json, r#""NO_VALID_STATES""#);
        assert_eq!(ConfidenceState::MissingInput.to_string(), "MISSING_INPUT");
    }

    #[test]
    fn only_margins_can_signal() {
        assert!(MetricKind::ArbitrageMargin.is_margin());
        assert!(MetricKind::CrossPartyNoArb.is_margin());
        assert!(!MetricKind::SyntheticProbability.is_margin());
        assert!(!MetricKind::ConditionalOdds.is_margin());
        assert_eq!(
            serde_json::to_string(&MetricKind::IntraPartyNoArb).unwrap(),
            r#""intra_party_no_arb""#
        );
    }

    #[test]
    fn absent_value_serializes_as_null() {
        let metric = DerivedMetric {
            kind: MetricKind::ConditionalOdds,
            entity: "X".into(),
            party: "P".into(),
            value: None,
            confidence_state: ConfidenceState::MissingInput,
            computed_at: Utc::now(),
            signal: false,
            markets: vec![],
        };
        let json = serde_json::to_value(&metric).unwrap();
        assert!(json["value"].is_null());
        assert_eq!(json["kind"], "conditional_odds");
    }
}
