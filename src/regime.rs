//! Market regime classification
//!
//! Maps a window of OHLC candles to one of five mutually exclusive postures
//! using smoothed trend, momentum, and volatility signals. The classifier is
//! a pure function of its input: no state is carried between cycles.

use serde::{Deserialize, Serialize};

use crate::indicators::{normalized_volatility, relative_strength, smoothed_average};
use crate::Candle;

/// Minimum candles required before any non-Scout classification
pub const MIN_CANDLES: usize = 50;

const FAST_SPAN: usize = 12;
const SLOW_SPAN: usize = 48;
const RSI_WINDOW: usize = 14;
const VOL_WINDOW: usize = 14;

/// Trading posture for one cycle. Scout is the inert default and the
/// fallback whenever data is insufficient or ambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    #[default]
    Scout,
    Lunchbox,
    Regular,
    Afterburner,
    Dip,
}

impl Regime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::Scout => "SCOUT",
            Regime::Lunchbox => "LUNCHBOX",
            Regime::Regular => "REGULAR",
            Regime::Afterburner => "AFTERBURNER",
            Regime::Dip => "DIP",
        }
    }

    /// Whether this regime invokes the ladder planner at all
    pub fn is_tradable(&self) -> bool {
        !matches!(self, Regime::Scout)
    }
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The three signals the decision table evaluates
#[derive(Debug, Clone, Copy)]
pub struct RegimeSignals {
    /// (fast EMA - slow EMA) / slow EMA of closing prices
    pub slope: f64,
    /// Relative strength over closes, [0, 100]
    pub rsi: f64,
    /// Normalized volatility fraction over the full candle series
    pub vol: f64,
}

fn momentum_breakout(s: &RegimeSignals) -> bool {
    s.slope > 0.0008 && s.rsi > 55.0 && s.vol > 0.003
}

fn flat_and_quiet(s: &RegimeSignals) -> bool {
    s.slope.abs() < 0.0004 && s.rsi > 35.0 && s.rsi < 65.0 && s.vol < 0.005
}

fn harvestable_chop(s: &RegimeSignals) -> bool {
    s.slope.abs() < 0.0015 && s.vol >= 0.003
}

fn oversold_pullback(s: &RegimeSignals) -> bool {
    s.rsi < 32.0 && s.slope > -0.002
}

/// Ordered decision table. Overlapping conditions are disambiguated by
/// position: the first matching rule wins, so both the predicates and this
/// ordering are part of the classifier's contract.
const RULES: [(fn(&RegimeSignals) -> bool, Regime); 4] = [
    (momentum_breakout, Regime::Afterburner),
    (flat_and_quiet, Regime::Lunchbox),
    (harvestable_chop, Regime::Regular),
    (oversold_pullback, Regime::Dip),
];

/// Evaluate the decision table against precomputed signals
pub fn classify_signals(signals: &RegimeSignals) -> Regime {
    for (predicate, regime) in RULES {
        if predicate(signals) {
            return regime;
        }
    }
    Regime::Scout
}

/// Classify a candle series. Returns Scout when the series is shorter than
/// [`MIN_CANDLES`] or the relative-strength signal is unavailable.
pub fn classify(candles: &[Candle]) -> Regime {
    if candles.len() < MIN_CANDLES {
        return Regime::Scout;
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let fast = smoothed_average(&closes, FAST_SPAN)
        .last()
        .copied()
        .unwrap_or(0.0);
    let slow = smoothed_average(&closes, SLOW_SPAN)
        .last()
        .copied()
        .unwrap_or(0.0);
    // Negligible denominator floor guards a zero slow average
    let slope = (fast - slow) / (slow + 1e-12);

    let rsi = match relative_strength(&closes, RSI_WINDOW) {
        Some(r) => r,
        None => return Regime::Scout,
    };
    let vol = normalized_volatility(candles, VOL_WINDOW);

    classify_signals(&RegimeSignals { slope, rsi, vol })
}
