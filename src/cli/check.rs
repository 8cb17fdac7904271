//! Handler for the `check` command.

use std::path::Path;

use crate::cli::output;
use crate::config::Config;
use crate::domain::{AssetRegistry, AssetRole};
use crate::error::Result;

/// Validate the configuration and the mapping file without connecting.
pub fn execute<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let path = config_path.as_ref();
    output::header(env!("CARGO_PKG_VERSION"));
    output::field("Config", path.display());

    let config = Config::load(path)?;
    output::success("Configuration file is valid");

    let registry = AssetRegistry::load(&config.registry)?;
    output::success(&format!(
        "Mapping file {} loaded",
        output::highlight(config.registry.display())
    ));

    output::section("Summary");
    output::field("Feed", &config.feed.ws_url);
    output::field("Markets", registry.markets().len());
    output::field("Assets", registry.len());
    output::field("Parties", registry.parties().join(", "));
    output::field("Tick", format!("{}s", config.metrics.tick_interval_secs));
    output::field("Stale after", format!("{}s", config.metrics.stale_after_secs));
    output::field(
        "Snapshots",
        if config.snapshot.enabled {
            config.snapshot.directory.display().to_string()
        } else {
            "disabled".to_string()
        },
    );

    output::section("Mapping");
    if registry.skipped() > 0 {
        output::warning(&format!(
            "{} malformed market or asset tables were skipped",
            registry.skipped()
        ));
    }
    if registry.is_empty() {
        output::warning("No assets registered; every metric will be NO_VALID_STATES");
    }
    for role in [AssetRole::Winner, AssetRole::Party] {
        if registry.market_with_role(role).is_none() {
            output::warning(&format!("No {role} configured"));
        }
    }
    for party in registry.parties() {
        if registry.nomination_market(&party).is_none() {
            output::warning(&format!("No nomination market for {party}"));
        }
    }
    for market in registry.markets() {
        let assets = registry.entries_for_market(&market.id).len();
        if assets == 0 {
            output::warning(&format!("Market {} has no assets", market.id));
        } else {
            output::note(&format!("{} ({}): {assets} assets", market.id, market.role));
        }
    }

    println!();
    output::success("Configuration is ready to use");
    Ok(())
}
