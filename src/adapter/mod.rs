//! Exchange adapters.

pub mod polymarket;
