//! Fee-aware ladder planner
//!
//! Turns the current price, a budget, and the configured grid geometry into
//! a list of candidate limit orders at spaced price levels, keeping only the
//! candidates whose raw step clears the net-edge bar.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::edge::net_edge_ok;
use crate::regime::Regime;
use crate::{FeeSchedule, OrderIntent, Side};

/// Per-cycle exposure cap: at most this many accepted candidates are acted
/// on, in planner output order, regardless of how many pass the edge filter.
pub const MAX_ACTIONS_PER_CYCLE: usize = 2;

const QTY_DECIMALS: u32 = 8;
const PRICE_DECIMALS: u32 = 4;

fn round_dp(value: f64, dp: u32) -> f64 {
    Decimal::try_from(value)
        .map(|d| d.round_dp(dp).to_f64().unwrap_or(value))
        .unwrap_or(value)
}

/// Plan buy/sell levels spaced geometrically around the current price.
///
/// Effective budget is min(budget, available balance), split evenly across
/// levels. Levels are emitted innermost first, buy and sell interleaved per
/// level; candidates with a non-positive price or quantity, or whose step
/// fails the edge check, are discarded.
#[allow(clippy::too_many_arguments)]
pub fn plan_ladder(
    current_price: f64,
    budget: f64,
    available_balance: f64,
    grid_levels: usize,
    spacing: f64,
    fees: &FeeSchedule,
    min_net: f64,
) -> Vec<OrderIntent> {
    let effective_budget = budget.min(available_balance);
    if effective_budget <= 0.0 || grid_levels == 0 || current_price <= 0.0 {
        return Vec::new();
    }

    let per_level = effective_budget / grid_levels as f64;
    let mut orders = Vec::new();

    for i in 1..=grid_levels {
        let offset = spacing * i as f64;
        let down = current_price * (1.0 - offset);
        let up = current_price * (1.0 + offset);
        let step_down = (current_price - down) / current_price.max(1e-9);
        let step_up = (up - current_price) / current_price.max(1e-9);

        if down > 0.0 && net_edge_ok(step_down, fees, min_net) {
            let qty = round_dp(per_level / down, QTY_DECIMALS);
            if qty > 0.0 {
                orders.push(OrderIntent {
                    side: Side::Buy,
                    quantity: qty,
                    limit_price: round_dp(down, PRICE_DECIMALS),
                });
            }
        }
        if up > 0.0 && net_edge_ok(step_up, fees, min_net) {
            let qty = round_dp(per_level / up, QTY_DECIMALS);
            if qty > 0.0 {
                orders.push(OrderIntent {
                    side: Side::Sell,
                    quantity: qty,
                    limit_price: round_dp(up, PRICE_DECIMALS),
                });
            }
        }
    }

    orders
}

/// Restrict a planned ladder to the sides the regime trades.
///
/// Momentum favors scaling out, not adding longs at spaced-down levels, so
/// Afterburner keeps only sells; Dip accumulates into the pullback and keeps
/// only buys. Scout never trades.
pub fn ladder_for_regime(regime: Regime, ladder: Vec<OrderIntent>) -> Vec<OrderIntent> {
    match regime {
        Regime::Lunchbox | Regime::Regular => ladder,
        Regime::Afterburner => ladder
            .into_iter()
            .filter(|o| o.side == Side::Sell)
            .collect(),
        Regime::Dip => ladder.into_iter().filter(|o| o.side == Side::Buy).collect(),
        Regime::Scout => Vec::new(),
    }
}
