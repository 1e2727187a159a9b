//! Regime-aware grid trading bot
//!
//! Once per tick, classifies the market into one of five postures from
//! smoothed trend, momentum, and volatility signals, turns tradable postures
//! into a fee-checked ladder of limit orders sized to a budget, and accounts
//! for simulated fills in an append-only CSV ledger.

pub mod config;
pub mod edge;
pub mod exchange;
pub mod indicators;
pub mod ledger;
pub mod planner;
pub mod regime;
pub mod scheduler;
pub mod session;
pub mod sim;
pub mod types;

pub use config::Config;
pub use regime::Regime;
pub use types::*;
