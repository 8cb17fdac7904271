//! Application configuration loading and validation.
//!
//! Configuration is a TOML file (default `config.toml`). Every section is
//! optional and falls back to its defaults; `validate` runs after parsing so
//! bad values are reported before any connection is opened.

mod logging;
mod reconnection;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

pub use logging::LoggingConfig;
pub use reconnection::ReconnectionConfig;

use crate::domain::MetricsConfig;
use crate::error::{ConfigError, Result};

pub const DEFAULT_WS_URL: &str = "wss://ws-subscriptions-clob.polymarket.com/ws/market";
pub const DEFAULT_GAMMA_URL: &str = "https://gamma-api.polymarket.com";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the asset mapping file.
    #[serde(default = "default_registry")]
    pub registry: PathBuf,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_registry() -> PathBuf {
    PathBuf::from("markets.toml")
}

/// Streaming feed settings (`[feed]`).
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Gamma REST endpoint used to bootstrap mapping files.
    #[serde(default = "default_gamma_url")]
    pub gamma_url: String,
    /// The feed is healthy while some channel applied an update this recently.
    #[serde(default = "default_freshness_window_secs")]
    pub freshness_window_secs: u64,
    /// Reconnect when no frame at all arrives for this long.
    #[serde(default = "default_liveness_timeout_secs")]
    pub liveness_timeout_secs: u64,
    /// Send a `PING` text frame after this much silence.
    #[serde(default = "default_keepalive_interval_secs")]
    pub keepalive_interval_secs: u64,
    /// Upper bound on waiting for tasks to finish after shutdown.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
    #[serde(default)]
    pub reconnection: ReconnectionConfig,
}

fn default_ws_url() -> String {
    DEFAULT_WS_URL.into()
}

fn default_gamma_url() -> String {
    DEFAULT_GAMMA_URL.into()
}

const fn default_freshness_window_secs() -> u64 {
    30
}

const fn default_liveness_timeout_secs() -> u64 {
    30
}

const fn default_keepalive_interval_secs() -> u64 {
    10
}

const fn default_shutdown_timeout_secs() -> u64 {
    5
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            gamma_url: default_gamma_url(),
            freshness_window_secs: default_freshness_window_secs(),
            liveness_timeout_secs: default_liveness_timeout_secs(),
            keepalive_interval_secs: default_keepalive_interval_secs(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            reconnection: ReconnectionConfig::default(),
        }
    }
}

impl FeedConfig {
    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_window_secs)
    }

    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_secs(self.liveness_timeout_secs)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Persistence settings (`[snapshot]`).
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Root of the `<market>/<date>.jsonl` tree.
    #[serde(default = "default_snapshot_directory")]
    pub directory: PathBuf,
    /// Latest report, rewritten atomically every tick.
    #[serde(default)]
    pub status_file: Option<PathBuf>,
    /// Seed the book from the newest records before the feeds start.
    #[serde(default = "default_true")]
    pub restore_on_start: bool,
}

const fn default_true() -> bool {
    true
}

fn default_snapshot_directory() -> PathBuf {
    PathBuf::from("data")
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_snapshot_directory(),
            status_file: None,
            restore_on_start: true,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse and validate configuration text. `origin` labels errors.
    #[allow(clippy::result_large_err)]
    pub fn parse(content: &str, origin: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            contents: content.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        if self.feed.ws_url.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "ws_url" }.into());
        }
        let ws_url = url::Url::parse(&self.feed.ws_url).map_err(|e| ConfigError::InvalidValue {
            field: "ws_url",
            reason: e.to_string(),
        })?;
        if !matches!(ws_url.scheme(), "ws" | "wss") {
            return Err(ConfigError::InvalidValue {
                field: "ws_url",
                reason: format!("expected ws:// or wss://, got {}://", ws_url.scheme()),
            }
            .into());
        }
        if self.registry.as_os_str().is_empty() {
            return Err(ConfigError::MissingField { field: "registry" }.into());
        }
        if self.feed.keepalive_interval_secs == 0
            || self.feed.keepalive_interval_secs >= self.feed.liveness_timeout_secs
        {
            return Err(ConfigError::InvalidValue {
                field: "keepalive_interval_secs",
                reason: format!(
                    "must be positive and below liveness_timeout_secs ({})",
                    self.feed.liveness_timeout_secs
                ),
            }
            .into());
        }
        if self.metrics.epsilon <= rust_decimal::Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "epsilon",
                reason: "must be positive".into(),
            }
            .into());
        }
        if self.metrics.arbitrage_threshold.is_sign_negative() {
            return Err(ConfigError::InvalidValue {
                field: "arbitrage_threshold",
                reason: "must not be negative".into(),
            }
            .into());
        }
        self.feed.reconnection.validate()?;
        Ok(())
    }

    pub fn init_logging(&self) {
        self.logging.init();
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry: default_registry(),
            feed: FeedConfig::default(),
            metrics: MetricsConfig::default(),
            snapshot: SnapshotConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("", "test").unwrap();
        assert_eq!(config.feed.ws_url, DEFAULT_WS_URL);
        assert_eq!(config.registry, PathBuf::from("markets.toml"));
        assert_eq!(config.metrics.arbitrage_threshold, dec!(0.01));
        assert_eq!(config.feed.reconnection.max_delay_ms, 30000);
        assert!(config.snapshot.enabled);
    }

    #[test]
    fn sections_override_defaults() {
        let toml = r#"
registry = "custom.toml"

[feed]
freshness_window_secs = 90

[feed.reconnection]
initial_delay_ms = 250

[metrics]
stale_after_secs = 15
arbitrage_threshold = "0.02"

[logging]
format = "json"
"#;
        let config = Config::parse(toml, "test").unwrap();
        assert_eq!(config.registry, PathBuf::from("custom.toml"));
        assert_eq!(config.feed.freshness_window(), Duration::from_secs(90));
        assert_eq!(config.feed.reconnection.initial_delay_ms, 250);
        assert_eq!(config.metrics.stale_after_secs, 15);
        assert_eq!(config.metrics.arbitrage_threshold, dec!(0.02));
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn http_ws_url_is_rejected() {
        let err = Config::parse("[feed]\nws_url = \"https://example.com\"", "test").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "ws_url",
                ..
            })
        ));
    }

    #[test]
    fn keepalive_must_be_shorter_than_liveness() {
        let toml = "[feed]\nkeepalive_interval_secs = 30\nliveness_timeout_secs = 30";
        assert!(Config::parse(toml, "test").is_err());
    }

    #[test]
    fn parse_error_keeps_source_text() {
        let err = Config::parse("[feed\nws_url = 1", "bad.toml").unwrap_err();
        match err {
            Error::Config(ConfigError::Parse { path, contents, .. }) => {
                assert_eq!(path, "bad.toml");
                assert!(contents.starts_with("[feed"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
