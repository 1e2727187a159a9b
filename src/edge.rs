//! Fee/edge evaluation
//!
//! Every grid round trip pays the maker fee twice (entry + exit) plus a
//! slippage buffer; a price step whose raw gap does not clear that after-cost
//! floor is never worth taking, regardless of regime.

use crate::FeeSchedule;

/// Assumed maker-order slippage across both legs, combined into a single
/// two-basis-point adjustment
pub const SLIPPAGE_ALLOWANCE: f64 = 0.0002;

// Rounding tolerance so a step sitting exactly on the net-profit bar passes
const EDGE_EPSILON: f64 = 1e-12;

/// Total cost fraction of one round trip: both maker legs plus slippage
pub fn round_trip_cost(fees: &FeeSchedule) -> f64 {
    2.0 * fees.maker + SLIPPAGE_ALLOWANCE
}

/// True when the gross price step clears the minimum net-profit bar after
/// round-trip costs
pub fn net_edge_ok(gross_step: f64, fees: &FeeSchedule, min_net: f64) -> bool {
    gross_step - round_trip_cost(fees) >= min_net - EDGE_EPSILON
}
