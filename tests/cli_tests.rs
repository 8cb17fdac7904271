mod support;

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn kingmaker() -> Command {
    Command::cargo_bin("kingmaker").expect("binary built")
}

#[test]
fn check_accepts_valid_config_and_mapping() {
    let dir = tempdir().unwrap();
    let config = support::files::write_election_config(dir.path(), "");

    kingmaker()
        .args(["check", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file is valid"))
        .stdout(predicate::str::contains("Democratic, Republican"));
}

#[test]
fn check_fails_on_invalid_value() {
    let dir = tempdir().unwrap();
    let config = support::files::write_election_config(
        dir.path(),
        "[feed]\nws_url = \"https://example.com\"\n",
    );

    kingmaker()
        .args(["check", "--config"])
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ws_url"));
}

#[test]
fn check_points_at_toml_syntax_errors() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "[feed\nws_url = 1\n").unwrap();

    kingmaker()
        .args(["check", "--config"])
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to parse"));
}

#[test]
fn check_reports_missing_mapping_file() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "registry = \"does-not-exist.toml\"\n").unwrap();

    kingmaker()
        .current_dir(dir.path())
        .args(["check", "--config"])
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does-not-exist.toml"));
}

#[test]
fn status_without_snapshots_says_so() {
    let dir = tempdir().unwrap();
    let config = support::files::write_election_config(dir.path(), "");

    kingmaker()
        .args(["status", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("No snapshot records found"));
}

#[test]
fn nomination_bootstrap_requires_a_party() {
    kingmaker()
        .args([
            "registry",
            "--slug",
            "democratic-presidential-nominee-2028",
            "--role",
            "nomination",
            "--gamma-url",
            "http://127.0.0.1:9",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("party"));
}
