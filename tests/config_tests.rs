mod support;

use std::path::Path;

use kingmaker::config::{Config, DEFAULT_GAMMA_URL};
use kingmaker::domain::{AssetRegistry, AssetRole};
use kingmaker::error::{ConfigError, Error};
use tempfile::tempdir;

fn manifest_file(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(name)
}

#[test]
fn shipped_config_is_valid() {
    let config = Config::load(manifest_file("config.toml")).expect("config.toml parses");
    assert_eq!(config.feed.gamma_url, DEFAULT_GAMMA_URL);
    assert!(config.feed.keepalive_interval() < config.feed.liveness_timeout());
}

#[test]
fn shipped_mapping_links_nominees_to_winner_entries() {
    let registry = AssetRegistry::load(manifest_file("markets.toml")).expect("markets.toml parses");
    assert_eq!(registry.skipped(), 0);

    let winner = registry.market_with_role(AssetRole::Winner).expect("winner market");
    for party in registry.parties() {
        let Some(nomination) = registry.nomination_market(&party) else {
            continue;
        };
        for entry in registry.entries_for_market(&nomination.id) {
            assert!(
                registry.find(&winner.id, &entry.logical_name).is_some(),
                "{} has no winner entry",
                entry.logical_name
            );
        }
    }
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempdir().unwrap();
    let err = Config::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::ReadFile { .. })));
}

#[test]
fn fixture_config_round_trips_through_disk() {
    let dir = tempdir().unwrap();
    let path = support::files::write_election_config(
        dir.path(),
        "[metrics]\nstale_after_secs = 15\n",
    );

    let config = Config::load(&path).unwrap();
    assert_eq!(config.metrics.stale_after_secs, 15);
    assert_eq!(config.snapshot.directory, dir.path().join("data"));

    let registry = AssetRegistry::load(&config.registry).unwrap();
    assert_eq!(registry.markets().len(), 4);
    assert_eq!(registry.len(), 8);
}

#[test]
fn malformed_market_tables_are_skipped_not_fatal() {
    let toml = r#"
[[markets]]
id = "winner"
role = "winner"

[[markets.assets]]
name = "Alice Adams"
asset_id = "w-alice"

[[markets]]
id = "broken"
role = "senate"

[[markets]]
id = "party"
role = "party"

[[markets.assets]]
name = "Democratic"
"#;
    let registry = AssetRegistry::from_toml_str(toml, "inline").unwrap();
    assert_eq!(registry.markets().len(), 2);
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.skipped(), 2);
}
