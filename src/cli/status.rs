//! Handler for the `status` command.

use std::collections::BTreeMap;

use tabled::{Table, Tabled};

use crate::app::{SnapshotRecord, SnapshotStore};
use crate::cli::{output, StatusArgs};
use crate::config::Config;
use crate::domain::{AssetRegistry, DerivedMetric, MetricKind};
use crate::error::Result;

#[derive(Tabled)]
struct BookRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Bid")]
    bid: String,
    #[tabled(rename = "Ask")]
    ask: String,
    #[tabled(rename = "Mid")]
    mid: String,
    #[tabled(rename = "Seq")]
    sequence: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    kind: String,
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "Signal")]
    signal: &'static str,
}

/// Print the newest persisted record of every registered market.
pub fn execute(args: &StatusArgs) -> Result<()> {
    let config = Config::load(&args.config)?;
    let registry = AssetRegistry::load(&config.registry)?;
    let store = SnapshotStore::new(config.snapshot.directory.clone());

    let mut records = Vec::new();
    for market in registry.markets() {
        if let Some(record) = store.latest(&market.id)? {
            records.push(record);
        }
    }

    if args.json {
        for record in &records {
            println!("{}", serde_json::to_string(record)?);
        }
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::field("Snapshots", store.directory().display());
    if records.is_empty() {
        println!();
        output::warning("No snapshot records found");
        output::note("Run `kingmaker run` with [snapshot] enabled to record some");
        return Ok(());
    }

    for record in &records {
        output::section(&format!("{} @ {}", record.market_id, record.timestamp.to_rfc3339()));
        print_indented(&Table::new(book_rows(record)).to_string());
    }

    output::section("Metrics");
    print_indented(&Table::new(metric_rows(&records)).to_string());
    println!();
    Ok(())
}

fn print_indented(table: &str) {
    for line in table.lines() {
        println!("  {line}");
    }
}

fn book_rows(record: &SnapshotRecord) -> Vec<BookRow> {
    record
        .books
        .iter()
        .map(|view| BookRow {
            name: view.name.clone(),
            bid: output::decimal(view.bid),
            ask: output::decimal(view.ask),
            mid: output::decimal(view.mid),
            sequence: view.sequence.map_or_else(|| "-".into(), |s| s.to_string()),
            updated: view
                .last_update
                .map_or_else(|| "never".into(), |t| t.format("%H:%M:%S").to_string()),
        })
        .collect()
}

/// Metrics appear in every record they read from; keep the newest copy of each.
fn latest_metrics(records: &[SnapshotRecord]) -> Vec<&DerivedMetric> {
    let mut latest: BTreeMap<(u8, String), &DerivedMetric> = BTreeMap::new();
    for metric in records.iter().flat_map(|record| &record.metrics) {
        let key = (sort_key(metric.kind), metric.entity.clone());
        match latest.get(&key) {
            Some(existing) if existing.computed_at >= metric.computed_at => {}
            _ => {
                latest.insert(key, metric);
            }
        }
    }
    latest.into_values().collect()
}

fn sort_key(kind: MetricKind) -> u8 {
    match kind {
        MetricKind::SyntheticProbability => 0,
        MetricKind::ArbitrageMargin => 1,
        MetricKind::CrossPartyMargin => 2,
        MetricKind::IntraPartyYesArb => 3,
        MetricKind::IntraPartyNoArb => 4,
        MetricKind::CrossPartyYesArb => 5,
        MetricKind::CrossPartyNoArb => 6,
        MetricKind::ConditionalOdds => 7,
    }
}

fn metric_rows(records: &[SnapshotRecord]) -> Vec<MetricRow> {
    latest_metrics(records)
        .into_iter()
        .map(|metric| MetricRow {
            kind: metric.kind.to_string(),
            entity: metric.entity.clone(),
            value: output::decimal(metric.value),
            confidence: output::confidence(metric.confidence_state),
            signal: if metric.signal { "yes" } else { "" },
        })
        .collect()
}
