//! Canonical test configurations.
//!
//! Single source of truth for config structs used across tests.

use crate::config::{Config, ReconnectionConfig};
use crate::domain::MetricsConfig;

/// Fast reconnection config with zero delays, so tests never wait.
pub fn reconnection() -> ReconnectionConfig {
    ReconnectionConfig {
        initial_delay_ms: 0,
        max_delay_ms: 0,
        backoff_multiplier: 1.0,
    }
}

/// Metrics config with a one-second tick and a `stale_after` of `stale_secs`.
pub fn metrics(stale_secs: u64) -> MetricsConfig {
    MetricsConfig {
        tick_interval_secs: 1,
        stale_after_secs: stale_secs,
        ..MetricsConfig::default()
    }
}

/// Full config wired for in-process tests: instant reconnects, snapshots off.
pub fn app() -> Config {
    let mut config = Config::default();
    config.feed.reconnection = reconnection();
    config.feed.shutdown_timeout_secs = 1;
    config.metrics = metrics(60);
    config.snapshot.enabled = false;
    config.snapshot.restore_on_start = false;
    config
}
