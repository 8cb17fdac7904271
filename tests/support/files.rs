//! On-disk config and mapping fixtures.

use std::fs;
use std::path::{Path, PathBuf};

use kingmaker::testkit::domain::election_toml;

/// Write the election mapping file and a config pointing at it into `dir`.
///
/// `extra` is appended to the config verbatim. Returns the config path.
pub fn write_election_config(dir: &Path, extra: &str) -> PathBuf {
    let registry = dir.join("markets.toml");
    fs::write(&registry, election_toml()).expect("write mapping file");

    let config = dir.join("config.toml");
    let contents = format!(
        "registry = {:?}\n\n[snapshot]\ndirectory = {:?}\n\n{extra}",
        registry.display().to_string(),
        dir.join("data").display().to_string(),
    );
    fs::write(&config, contents).expect("write config");
    config
}
