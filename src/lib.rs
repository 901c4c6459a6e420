//! sensor-ledger - shared-source usage attribution
//!
//! Attributes active time and energy to many independently registered
//! subscribers that share a small set of physical sources (sensors), without
//! double-counting a source that several subscribers hold at once.

pub mod cli;
pub mod clock;
pub mod config;
pub mod metrics;
pub mod replay;
pub mod sensor;
pub mod stateful;
