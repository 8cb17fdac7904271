//! Feed reconnection configuration.

use serde::Deserialize;

use crate::error::ConfigError;

/// WebSocket reconnection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectionConfig {
    /// Initial delay before first reconnection attempt (milliseconds).
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Maximum delay between reconnection attempts (milliseconds).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Multiplier applied to delay after each failed attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_initial_delay_ms() -> u64 {
    1000 // 1 second
}

fn default_max_delay_ms() -> u64 {
    30000 // 30 seconds
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl ReconnectionConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.backoff_multiplier < 1.0 || !self.backoff_multiplier.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "backoff_multiplier",
                reason: format!("must be >= 1.0, got {}", self.backoff_multiplier),
            });
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "initial_delay_ms",
                reason: format!(
                    "{} exceeds max_delay_ms {}",
                    self.initial_delay_ms, self.max_delay_ms
                ),
            });
        }
        Ok(())
    }
}
