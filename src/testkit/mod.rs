//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`stream`] - Mock [`MarketDataStream`](crate::exchange::MarketDataStream)
//!   implementations: `ScriptedStream`, `ChannelStream`.
//! - [`domain`] - Builders for registries, updates and events.
//! - [`config`] - Canonical test configurations.

pub mod config;
pub mod domain;
pub mod stream;
