//! Kingmaker - live monitor for presidential prediction markets.
//!
//! Streams best bid/ask quotes for candidate and party outcome tokens from
//! Polymarket and derives, on a fixed tick:
//!
//! - the nominee-implied ("synthetic") probability that each party wins,
//!   `Σ P(nominated) × P(wins presidency)` over that party's candidates;
//! - the arbitrage margin between the synthetic value and the traded
//!   party-aggregate price, plus cross-party margins;
//! - conditional odds `P(wins presidency) / P(nominated)` per candidate.
//!
//! Every metric carries a confidence state (`OK`, `STALE`, `MISSING_INPUT`,
//! `NO_VALID_STATES`) so consumers can tell a computed value from a gap.
//!
//! # Modules
//!
//! - [`domain`] - Asset registry, live book and metric engine
//! - [`exchange`] - Stream trait and the reconnecting channel state machine
//! - [`adapter`] - Polymarket wire codec, WebSocket stream, Gamma client
//! - [`app`] - Feed client, tick task, reports and snapshot persistence
//! - [`config`] - TOML configuration with per-section defaults
//! - [`cli`] - `run`, `check`, `status` and `registry` subcommands
//! - [`error`] - Error types for the crate

pub mod adapter;
pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod exchange;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
