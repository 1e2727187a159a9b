//! Simulated fill accounting
//!
//! For each accepted intent in simulated mode, computes a synthetic
//! immediate take-profit exit and the resulting gross/net percentages and
//! dollar P&L. This is a deterministic accounting approximation, not a
//! market simulation: it never models partial fills, slippage beyond the
//! fixed allowance already baked into the edge check, or the possibility
//! that the take-profit is never reached.

use chrono::Utc;

use crate::edge::round_trip_cost;
use crate::regime::Regime;
use crate::{FeeSchedule, OrderIntent, Side, TradeRecord, TradeSide};

/// Momentum trades target a larger excursion than grid trades
pub const MOMENTUM_TARGET_BOOST: f64 = 1.5;

/// Compute the deterministic take-profit round trip for one accepted intent
/// and return the ledger record for it.
pub fn simulate_fill(
    intent: &OrderIntent,
    regime: Regime,
    exchange: &str,
    symbol: &str,
    spacing: f64,
    fees: &FeeSchedule,
    hold_seconds: u64,
) -> TradeRecord {
    let target_move = if regime == Regime::Afterburner {
        spacing * MOMENTUM_TARGET_BOOST
    } else {
        spacing
    };

    let entry = intent.limit_price;
    let qty = intent.quantity;
    let (side, exit, gross, pnl) = match intent.side {
        Side::Buy => {
            let exit = entry * (1.0 + target_move);
            let gross = (exit - entry) / entry;
            let pnl = qty * (exit - entry) - qty * entry * fees.maker - qty * exit * fees.maker;
            (TradeSide::Long, exit, gross, pnl)
        }
        Side::Sell => {
            let exit = entry * (1.0 - target_move);
            let gross = (entry - exit) / entry;
            let pnl = qty * (entry - exit) - qty * entry * fees.maker - qty * exit * fees.maker;
            (TradeSide::Short, exit, gross, pnl)
        }
    };

    TradeRecord {
        utc: Utc::now(),
        exchange: exchange.to_uppercase(),
        regime,
        symbol: symbol.to_string(),
        side,
        quantity: qty,
        entry_price: entry,
        exit_price: exit,
        gross_pct: gross,
        net_pct: gross - round_trip_cost(fees),
        fee_pct_rt: 2.0 * fees.maker,
        pnl_usd: pnl,
        hold_seconds,
        notes: "paper fill".to_string(),
    }
}
