//! Metric engine: nominee-implied party odds, arbitrage margins and
//! conditional odds.
//!
//! Everything here is a pure function of the registry, a book snapshot and a
//! clock reading. Missing or unusable inputs never raise; they lower the
//! [`ConfidenceState`] of the affected metric instead:
//!
//! | condition                                              | state             |
//! |--------------------------------------------------------|-------------------|
//! | a market the metric reads has no resolvable entries    | `NO_VALID_STATES` |
//! | a required price is absent (or a denominator ~ 0)      | `MISSING_INPUT`   |
//! | an input is older than `stale_after_secs`              | `STALE`           |
//!
//! Values are rounded once, on the final result, to four decimal places.
//!
//! # Executable arbitrage
//!
//! Besides the mid-price metrics, each party gets the cost of hedged baskets
//! built from ask prices. The party's candidates are those listed in its
//! nomination market, priced in the winner market. A token's No ask is read
//! off its Yes book as `1 - best_bid`, since the two books mirror each other.
//!
//! - candidates' Yes basket: `Σ yes_ask(c)`
//! - candidates' No basket: `Σ no_ask(c) - (n - 1)`; at most one candidate wins
//!
//! Each figure is `1 - (basket + leg)` where the leg is the party's own No
//! (intra, Yes basket), its own Yes (intra, No basket), or the rival party's
//! Yes / No (cross). Candidates without both asks are left out of the basket
//! and mark it `MISSING_INPUT`.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::book::{age_between, BookSnapshot};
use super::id::MarketId;
use super::metric::{ConfidenceState, DerivedMetric, MetricKind};
use super::money::round_metric;
use super::quote::BookEntry;
use super::registry::{AssetRegistry, AssetRole, MarketInfo, RegistryEntry};

/// Metric engine and tick settings (`[metrics]`).
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between metric/snapshot ticks.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    /// Inputs older than this mark a metric `STALE`.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,

    /// Margin above which an OK metric is flagged as a signal.
    #[serde(default = "default_arbitrage_threshold")]
    pub arbitrage_threshold: Decimal,

    /// Denominators below this make conditional odds `MISSING_INPUT`.
    #[serde(default = "default_epsilon")]
    pub epsilon: Decimal,

    /// Consecutive `NO_VALID_STATES` ticks before a market is escalated.
    #[serde(default = "default_escalation_ticks")]
    pub no_valid_states_escalation_ticks: u32,
}

const fn default_tick_interval_secs() -> u64 {
    5
}

const fn default_stale_after_secs() -> u64 {
    60
}

fn default_arbitrage_threshold() -> Decimal {
    Decimal::new(1, 2) // one cent
}

fn default_epsilon() -> Decimal {
    Decimal::new(1, 3) // 0.001
}

const fn default_escalation_ticks() -> u32 {
    30
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            stale_after_secs: default_stale_after_secs(),
            arbitrage_threshold: default_arbitrage_threshold(),
            epsilon: default_epsilon(),
            no_valid_states_escalation_ticks: default_escalation_ticks(),
        }
    }
}

impl MetricsConfig {
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.max(1))
    }
}

/// Computes every derived metric for one snapshot.
#[derive(Debug, Clone, Default)]
pub struct MetricEngine {
    config: MetricsConfig,
}

impl MetricEngine {
    #[must_use]
    pub const fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// All metrics, grouped by party.
    ///
    /// Within a party: synthetic probability, arbitrage margin, cross-party
    /// margins against each rival, the intra-party basket arbs, the
    /// cross-party basket arbs against each rival, then conditional odds
    /// ranked by value (absent values last).
    pub fn compute(
        &self,
        registry: &AssetRegistry,
        snapshot: &BookSnapshot,
        now: DateTime<Utc>,
    ) -> Vec<DerivedMetric> {
        let eval = Evaluation::new(self, registry, snapshot, now);
        let parties = registry.parties();

        let synthetics: Vec<Synthetic> = parties.iter().map(|p| eval.synthetic(p)).collect();

        let mut metrics = Vec::new();
        for (index, party) in parties.iter().enumerate() {
            let synthetic = &synthetics[index];
            metrics.push(eval.synthetic_metric(party, synthetic));
            metrics.push(eval.margin(party, synthetic));
            for rival in parties.iter().filter(|rival| *rival != party) {
                metrics.push(eval.cross_margin(party, synthetic, rival));
            }

            let basket = eval.basket(party);
            metrics.push(eval.basket_arb(MetricKind::IntraPartyYesArb, party, &basket, party));
            metrics.push(eval.basket_arb(MetricKind::IntraPartyNoArb, party, &basket, party));
            for rival in parties.iter().filter(|rival| *rival != party) {
                metrics.push(eval.basket_arb(MetricKind::CrossPartyYesArb, party, &basket, rival));
                metrics.push(eval.basket_arb(MetricKind::CrossPartyNoArb, party, &basket, rival));
            }

            let mut odds = eval.conditional_odds(party);
            odds.sort_by(|a, b| match (a.value, b.value) {
                (Some(a), Some(b)) => b.cmp(&a),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            });
            metrics.extend(odds);
        }
        metrics
    }
}

/// Markets with no resolvable state: no registry entries, or none of the
/// market's entries observed in the snapshot.
pub fn unresolvable_markets(registry: &AssetRegistry, snapshot: &BookSnapshot) -> Vec<MarketId> {
    registry
        .markets()
        .iter()
        .filter(|market| {
            !registry
                .entries_for_market(&market.id)
                .iter()
                .any(|entry| snapshot.contains_key(&entry.asset_id))
        })
        .map(|market| market.id.clone())
        .collect()
}

/// Unrounded candidate baskets for one party, from winner-market asks.
struct Basket {
    yes: Option<Decimal>,
    no: Option<Decimal>,
    state: ConfidenceState,
    markets: Vec<MarketId>,
}

type Field = fn(&BookEntry) -> Option<Decimal>;

fn yes_ask(entry: &BookEntry) -> Option<Decimal> {
    entry.best_ask
}

fn no_ask(entry: &BookEntry) -> Option<Decimal> {
    entry.best_bid.map(|bid| Decimal::ONE - bid)
}

/// Unrounded synthetic probability plus its provenance.
struct Synthetic {
    value: Option<Decimal>,
    state: ConfidenceState,
    markets: Vec<MarketId>,
}

struct Evaluation<'a> {
    config: &'a MetricsConfig,
    registry: &'a AssetRegistry,
    snapshot: &'a BookSnapshot,
    now: DateTime<Utc>,
    unresolvable: HashSet<MarketId>,
    winner: Option<&'a MarketInfo>,
    party_market: Option<&'a MarketInfo>,
}

impl<'a> Evaluation<'a> {
    fn new(
        engine: &'a MetricEngine,
        registry: &'a AssetRegistry,
        snapshot: &'a BookSnapshot,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            config: &engine.config,
            registry,
            snapshot,
            now,
            unresolvable: unresolvable_markets(registry, snapshot).into_iter().collect(),
            winner: registry.market_with_role(AssetRole::Winner),
            party_market: registry.market_with_role(AssetRole::Party),
        }
    }

    /// Ids of the markets present, and whether every one of them (and every
    /// absent one) is resolvable.
    fn dependencies(&self, markets: &[Option<&MarketInfo>]) -> (Vec<MarketId>, bool) {
        let ids: Vec<MarketId> = markets.iter().flatten().map(|m| m.id.clone()).collect();
        let valid = markets
            .iter()
            .all(|m| m.is_some_and(|m| !self.unresolvable.contains(&m.id)));
        (ids, valid)
    }

    /// Mid price of a registry entry, lowering `state` when it is absent or old.
    fn price(&self, entry: Option<&RegistryEntry>, state: &mut ConfidenceState) -> Option<Decimal> {
        self.read(entry, state, |e| e.mid_price)
    }

    fn read(
        &self,
        entry: Option<&RegistryEntry>,
        state: &mut ConfidenceState,
        field: Field,
    ) -> Option<Decimal> {
        let observed = entry.and_then(|e| self.snapshot.get(&e.asset_id));
        let Some((value, last_update)) = observed.and_then(|e| Some((field(e)?, e.last_update)))
        else {
            *state = (*state).max(ConfidenceState::MissingInput);
            return None;
        };
        if age_between(last_update, self.now) > self.config.stale_after() {
            *state = (*state).max(ConfidenceState::Stale);
        }
        Some(value)
    }

    fn lookup(&self, market: Option<&MarketInfo>, name: &str) -> Option<&'a RegistryEntry> {
        market.and_then(|m| self.registry.find(&m.id, name))
    }

    fn metric(
        &self,
        kind: MetricKind,
        entity: String,
        party: &str,
        value: Option<Decimal>,
        state: ConfidenceState,
        markets: Vec<MarketId>,
    ) -> DerivedMetric {
        let value = if state == ConfidenceState::NoValidStates {
            None
        } else {
            value.map(round_metric)
        };
        let signal = kind.is_margin()
            && state.is_ok()
            && value.is_some_and(|v| v > self.config.arbitrage_threshold);

        DerivedMetric {
            kind,
            entity,
            party: party.to_string(),
            value,
            confidence_state: state,
            computed_at: self.now,
            signal,
            markets,
        }
    }

    /// `Σ P(c nominated) × P(c wins)` over the party's nomination market.
    fn synthetic(&self, party: &str) -> Synthetic {
        let nomination = self.registry.nomination_market(party);
        let (markets, valid) = self.dependencies(&[nomination, self.winner]);
        if !valid {
            return Synthetic {
                value: None,
                state: ConfidenceState::NoValidStates,
                markets,
            };
        }

        let mut state = ConfidenceState::Ok;
        let mut sum = Decimal::ZERO;
        let candidates = nomination
            .map(|m| self.registry.entries_for_market(&m.id))
            .unwrap_or_default();
        for candidate in candidates {
            let nominated = self.price(Some(candidate), &mut state);
            let wins = self.price(self.lookup(self.winner, &candidate.logical_name), &mut state);
            if let (Some(nominated), Some(wins)) = (nominated, wins) {
                sum += nominated * wins;
            }
        }

        Synthetic {
            value: Some(sum),
            state,
            markets,
        }
    }

    fn synthetic_metric(&self, party: &str, synthetic: &Synthetic) -> DerivedMetric {
        self.metric(
            MetricKind::SyntheticProbability,
            party.to_string(),
            party,
            synthetic.value,
            synthetic.state,
            synthetic.markets.clone(),
        )
    }

    /// Price of `party` in the party-aggregate market, with the combined
    /// dependency list and state.
    fn with_party_price(
        &self,
        synthetic: &Synthetic,
        party: &str,
    ) -> (Option<Decimal>, ConfidenceState, Vec<MarketId>) {
        let (extra, valid) = self.dependencies(&[self.party_market]);
        let mut markets = synthetic.markets.clone();
        markets.extend(extra);

        if !valid || synthetic.state == ConfidenceState::NoValidStates {
            return (None, ConfidenceState::NoValidStates, markets);
        }
        let mut state = synthetic.state;
        let price = self.price(self.lookup(self.party_market, party), &mut state);
        (price, state, markets)
    }

    /// Margins are taken against the published (rounded) synthetic so they
    /// can be reproduced from the two displayed inputs.
    fn margin(&self, party: &str, synthetic: &Synthetic) -> DerivedMetric {
        let (price, state, markets) = self.with_party_price(synthetic, party);
        let value = synthetic
            .value
            .map(round_metric)
            .zip(price)
            .map(|(synthetic, actual)| synthetic - actual);
        self.metric(
            MetricKind::ArbitrageMargin,
            party.to_string(),
            party,
            value,
            state,
            markets,
        )
    }

    fn cross_margin(&self, party: &str, synthetic: &Synthetic, rival: &str) -> DerivedMetric {
        let (price, state, markets) = self.with_party_price(synthetic, rival);
        let value = synthetic
            .value
            .map(round_metric)
            .zip(price)
            .map(|(synthetic, rival_price)| Decimal::ONE - (synthetic + rival_price));
        self.metric(
            MetricKind::CrossPartyMargin,
            format!("{party} vs {rival}"),
            party,
            value,
            state,
            markets,
        )
    }

    fn basket(&self, party: &str) -> Basket {
        let nomination = self.registry.nomination_market(party);
        let (markets, valid) = self.dependencies(&[nomination, self.winner]);
        if !valid {
            return Basket {
                yes: None,
                no: None,
                state: ConfidenceState::NoValidStates,
                markets,
            };
        }

        let mut state = ConfidenceState::Ok;
        let mut yes = Decimal::ZERO;
        let mut no = Decimal::ZERO;
        let mut priced = 0u32;
        let candidates = nomination
            .map(|m| self.registry.entries_for_market(&m.id))
            .unwrap_or_default();
        for candidate in candidates {
            let entry = self.lookup(self.winner, &candidate.logical_name);
            let legs = (
                self.read(entry, &mut state, yes_ask),
                self.read(entry, &mut state, no_ask),
            );
            if let (Some(yes_leg), Some(no_leg)) = legs {
                yes += yes_leg;
                no += no_leg;
                priced += 1;
            }
        }

        if priced == 0 {
            return Basket {
                yes: None,
                no: None,
                state: state.max(ConfidenceState::MissingInput),
                markets,
            };
        }
        Basket {
            yes: Some(yes),
            no: Some(no - Decimal::from(priced - 1)),
            state,
            markets,
        }
    }

    /// `1 - (basket + leg)`, where `kind` picks the basket side and the leg's
    /// outcome in `leg_party`'s party-market book.
    fn basket_arb(
        &self,
        kind: MetricKind,
        party: &str,
        basket: &Basket,
        leg_party: &str,
    ) -> DerivedMetric {
        let (basket_value, leg): (Option<Decimal>, Field) = match kind {
            MetricKind::IntraPartyYesArb => (basket.yes, no_ask as Field),
            MetricKind::IntraPartyNoArb => (basket.no, yes_ask),
            MetricKind::CrossPartyYesArb => (basket.yes, yes_ask),
            _ => (basket.no, no_ask),
        };
        let entity = if leg_party == party {
            party.to_string()
        } else {
            format!("{party} vs {leg_party}")
        };

        let (extra, valid) = self.dependencies(&[self.party_market]);
        let mut markets = basket.markets.clone();
        markets.extend(extra);
        if !valid || basket.state == ConfidenceState::NoValidStates {
            return self.metric(kind, entity, party, None, ConfidenceState::NoValidStates, markets);
        }

        let mut state = basket.state;
        let leg_price = self.read(self.lookup(self.party_market, leg_party), &mut state, leg);
        let value = basket_value
            .zip(leg_price)
            .map(|(cost, leg_ask)| Decimal::ONE - (cost + leg_ask));
        self.metric(kind, entity, party, value, state, markets)
    }

    /// `P(c wins) / P(c nominated)` for every candidate of the party.
    fn conditional_odds(&self, party: &str) -> Vec<DerivedMetric> {
        let nomination = self.registry.nomination_market(party);
        let (markets, valid) = self.dependencies(&[nomination, self.winner]);
        let candidates = nomination
            .map(|m| self.registry.entries_for_market(&m.id))
            .unwrap_or_default();

        candidates
            .into_iter()
            .map(|candidate| {
                let name = candidate.logical_name.clone();
                if !valid {
                    return self.metric(
                        MetricKind::ConditionalOdds,
                        name,
                        party,
                        None,
                        ConfidenceState::NoValidStates,
                        markets.clone(),
                    );
                }

                let mut state = ConfidenceState::Ok;
                let nominated = self.price(Some(candidate), &mut state);
                let wins = self.price(self.lookup(self.winner, &name), &mut state);
                let value = match (wins, nominated) {
                    (Some(wins), Some(nominated)) if nominated >= self.config.epsilon => {
                        Some(wins / nominated)
                    }
                    _ => {
                        state = state.max(ConfidenceState::MissingInput);
                        None
                    }
                };
                self.metric(
                    MetricKind::ConditionalOdds,
                    name,
                    party,
                    value,
                    state,
                    markets.clone(),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::id::AssetId;
    use crate::domain::quote::{BookEntry, PriceUpdate};
    use crate::domain::registry::{AssetSpec, MarketSpec};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn asset(name: &str, id: &str) -> AssetSpec {
        AssetSpec {
            name: name.into(),
            asset_id: id.into(),
        }
    }

    fn registry() -> AssetRegistry {
        AssetRegistry::from_specs(
            vec![
                MarketSpec {
                    id: "dem-nominee".into(),
                    role: AssetRole::Nomination,
                    party: Some("Democratic".into()),
                    assets: vec![asset("Alice", "n-alice"), asset("Bob", "n-bob")],
                },
                MarketSpec {
                    id: "winner".into(),
                    role: AssetRole::Winner,
                    party: None,
                    assets: vec![asset("Alice", "w-alice"), asset("Bob", "w-bob")],
                },
                MarketSpec {
                    id: "party".into(),
                    role: AssetRole::Party,
                    party: None,
                    assets: vec![asset("Democratic", "p-dem"), asset("Republican", "p-gop")],
                },
            ],
            &BTreeMap::new(),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn put(snapshot: &mut BookSnapshot, id: &str, price: Decimal, age_secs: i64) {
        let update = PriceUpdate::new(
            AssetId::new(id),
            Some(price),
            Some(price),
            1,
            now() - chrono::Duration::seconds(age_secs),
        );
        snapshot.insert(AssetId::new(id), BookEntry::from_update(&update));
    }

    fn full_snapshot() -> BookSnapshot {
        let mut snapshot = BookSnapshot::new();
        put(&mut snapshot, "n-alice", dec!(0.30), 1);
        put(&mut snapshot, "n-bob", dec!(0.65), 1);
        put(&mut snapshot, "w-alice", dec!(0.40), 1);
        put(&mut snapshot, "w-bob", dec!(0.55), 1);
        put(&mut snapshot, "p-dem", dec!(0.50), 1);
        put(&mut snapshot, "p-gop", dec!(0.48), 1);
        snapshot
    }

    fn find<'m>(metrics: &'m [DerivedMetric], kind: MetricKind, entity: &str) -> &'m DerivedMetric {
        metrics
            .iter()
            .find(|m| m.kind == kind && m.entity == entity)
            .unwrap()
    }

    #[test]
    fn synthetic_and_margin_match_hand_computation() {
        let metrics = MetricEngine::default().compute(&registry(), &full_snapshot(), now());

        let synthetic = find(&metrics, MetricKind::SyntheticProbability, "Democratic");
        assert_eq!(synthetic.value, Some(dec!(0.4775)));
        assert_eq!(synthetic.confidence_state, ConfidenceState::Ok);

        let margin = find(&metrics, MetricKind::ArbitrageMargin, "Democratic");
        assert_eq!(margin.value, Some(dec!(-0.0225)));
        assert_eq!(margin.confidence_state, ConfidenceState::Ok);
        assert!(!margin.signal);
    }

    fn put_quote(snapshot: &mut BookSnapshot, id: &str, bid: Decimal, ask: Decimal) {
        let update = PriceUpdate::new(AssetId::new(id), Some(bid), Some(ask), 1, now());
        snapshot.insert(AssetId::new(id), BookEntry::from_update(&update));
    }

    fn spread_snapshot() -> BookSnapshot {
        let mut snapshot = full_snapshot();
        put_quote(&mut snapshot, "w-alice", dec!(0.38), dec!(0.41));
        put_quote(&mut snapshot, "w-bob", dec!(0.53), dec!(0.56));
        put_quote(&mut snapshot, "p-dem", dec!(0.49), dec!(0.51));
        put_quote(&mut snapshot, "p-gop", dec!(0.47), dec!(0.49));
        snapshot
    }

    #[test]
    fn basket_arbs_use_asks_and_mirrored_no_side() {
        let metrics = MetricEngine::default().compute(&registry(), &spread_snapshot(), now());

        // Yes basket 0.41 + 0.56; No basket (0.62 + 0.47) - 1
        let intra_yes = find(&metrics, MetricKind::IntraPartyYesArb, "Democratic");
        assert_eq!(intra_yes.value, Some(dec!(-0.48)));
        assert!(!intra_yes.signal);

        let intra_no = find(&metrics, MetricKind::IntraPartyNoArb, "Democratic");
        assert_eq!(intra_no.value, Some(dec!(0.40)));
        assert_eq!(intra_no.confidence_state, ConfidenceState::Ok);
        assert!(intra_no.signal);

        let cross_yes = find(&metrics, MetricKind::CrossPartyYesArb, "Democratic vs Republican");
        assert_eq!(cross_yes.value, Some(dec!(-0.46)));

        let cross_no = find(&metrics, MetricKind::CrossPartyNoArb, "Democratic vs Republican");
        assert_eq!(cross_no.value, Some(dec!(0.38)));
    }

    #[test]
    fn unpriced_candidate_is_left_out_of_the_basket() {
        let mut snapshot = spread_snapshot();
        // Ask only: no bid, so no No ask
        snapshot.insert(
            AssetId::new("w-bob"),
            BookEntry::from_update(&PriceUpdate::new(
                AssetId::new("w-bob"),
                None,
                Some(dec!(0.56)),
                2,
                now(),
            )),
        );

        let metrics = MetricEngine::default().compute(&registry(), &snapshot, now());
        let intra_yes = find(&metrics, MetricKind::IntraPartyYesArb, "Democratic");
        // Only Alice: 1 - (0.41 + 0.51)
        assert_eq!(intra_yes.value, Some(dec!(0.08)));
        assert_eq!(intra_yes.confidence_state, ConfidenceState::MissingInput);
        assert!(!intra_yes.signal);
    }

    #[test]
    fn cross_margin_uses_rival_party_price() {
        let metrics = MetricEngine::default().compute(&registry(), &full_snapshot(), now());
        let cross = find(&metrics, MetricKind::CrossPartyMargin, "Democratic vs Republican");
        // 1 - (0.4775 + 0.48)
        assert_eq!(cross.value, Some(dec!(0.0425)));
        assert!(cross.signal);
    }

    #[test]
    fn missing_winner_price_contributes_zero_and_flags_input() {
        let mut snapshot = full_snapshot();
        snapshot.remove(&AssetId::new("w-bob"));

        let metrics = MetricEngine::default().compute(&registry(), &snapshot, now());
        let synthetic = find(&metrics, MetricKind::SyntheticProbability, "Democratic");
        assert_eq!(synthetic.value, Some(dec!(0.12)));
        assert_eq!(synthetic.confidence_state, ConfidenceState::MissingInput);

        let margin = find(&metrics, MetricKind::ArbitrageMargin, "Democratic");
        assert_eq!(margin.confidence_state, ConfidenceState::MissingInput);
        assert!(!margin.signal);
    }

    #[test]
    fn conditional_odds_divides_winner_by_nomination() {
        let mut snapshot = full_snapshot();
        put(&mut snapshot, "n-alice", dec!(0.10), 1);
        put(&mut snapshot, "w-alice", dec!(0.04), 1);

        let metrics = MetricEngine::default().compute(&registry(), &snapshot, now());
        let odds = find(&metrics, MetricKind::ConditionalOdds, "Alice");
        assert_eq!(odds.value, Some(dec!(0.4)));
        assert_eq!(odds.confidence_state, ConfidenceState::Ok);
    }

    #[test]
    fn zero_nomination_price_is_missing_input_not_division() {
        let mut snapshot = full_snapshot();
        put(&mut snapshot, "n-alice", dec!(0), 1);

        let metrics = MetricEngine::default().compute(&registry(), &snapshot, now());
        let odds = find(&metrics, MetricKind::ConditionalOdds, "Alice");
        assert_eq!(odds.value, None);
        assert_eq!(odds.confidence_state, ConfidenceState::MissingInput);
    }

    #[test]
    fn conditional_odds_may_exceed_one() {
        let mut snapshot = full_snapshot();
        put(&mut snapshot, "n-alice", dec!(0.02), 1);
        put(&mut snapshot, "w-alice", dec!(0.03), 1);

        let metrics = MetricEngine::default().compute(&registry(), &snapshot, now());
        assert_eq!(
            find(&metrics, MetricKind::ConditionalOdds, "Alice").value,
            Some(dec!(1.5))
        );
    }

    #[test]
    fn conditional_odds_are_ranked_descending() {
        let metrics = MetricEngine::default().compute(&registry(), &full_snapshot(), now());
        let ranked: Vec<&str> = metrics
            .iter()
            .filter(|m| m.kind == MetricKind::ConditionalOdds)
            .map(|m| m.entity.as_str())
            .collect();
        // Alice 0.40/0.30 = 1.3333, Bob 0.55/0.65 = 0.8462
        assert_eq!(ranked, vec!["Alice", "Bob"]);
    }

    #[test]
    fn unresolvable_market_yields_no_valid_states_everywhere() {
        let mut snapshot = full_snapshot();
        snapshot.remove(&AssetId::new("n-alice"));
        snapshot.remove(&AssetId::new("n-bob"));

        let metrics = MetricEngine::default().compute(&registry(), &snapshot, now());
        let democratic: Vec<_> = metrics.iter().filter(|m| m.party == "Democratic").collect();
        assert!(!democratic.is_empty());
        for metric in democratic {
            assert_eq!(metric.confidence_state, ConfidenceState::NoValidStates);
            assert_eq!(metric.value, None);
        }
    }

    #[test]
    fn empty_registry_produces_no_metrics() {
        let metrics =
            MetricEngine::default().compute(&AssetRegistry::default(), &BookSnapshot::new(), now());
        assert!(metrics.is_empty());
    }

    #[test]
    fn party_without_nomination_market_is_no_valid_states() {
        let metrics = MetricEngine::default().compute(&registry(), &full_snapshot(), now());
        let synthetic = find(&metrics, MetricKind::SyntheticProbability, "Republican");
        assert_eq!(synthetic.confidence_state, ConfidenceState::NoValidStates);
    }

    #[test]
    fn old_inputs_mark_metrics_stale() {
        let mut snapshot = full_snapshot();
        put(&mut snapshot, "w-bob", dec!(0.55), 120);

        let metrics = MetricEngine::default().compute(&registry(), &snapshot, now());
        let synthetic = find(&metrics, MetricKind::SyntheticProbability, "Democratic");
        assert_eq!(synthetic.value, Some(dec!(0.4775)));
        assert_eq!(synthetic.confidence_state, ConfidenceState::Stale);
        assert_eq!(
            find(&metrics, MetricKind::ConditionalOdds, "Alice").confidence_state,
            ConfidenceState::Ok
        );
    }

    #[test]
    fn unresolvable_markets_lists_unobserved_markets() {
        let mut snapshot = full_snapshot();
        snapshot.remove(&AssetId::new("p-dem"));
        snapshot.remove(&AssetId::new("p-gop"));
        assert_eq!(
            unresolvable_markets(&registry(), &snapshot),
            vec![MarketId::new("party")]
        );
    }
}
