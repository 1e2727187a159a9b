//! Technical indicators
//!
//! Stateless numeric transforms over price series. All functions are pure and
//! look-ahead free: output at index i depends only on inputs up to i.

use crate::Candle;

/// Exponentially smoothed moving average with weight k = 2/(span+1).
///
/// Seeded with the first input, one output per input. Returns the input
/// unchanged when span <= 1 or the input is empty.
pub fn smoothed_average(values: &[f64], span: usize) -> Vec<f64> {
    if values.is_empty() || span <= 1 {
        return values.to_vec();
    }

    let k = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut s = values[0];
    out.push(s);
    for &v in &values[1..] {
        s = (v - s) * k + s;
        out.push(s);
    }
    out
}

/// Relative-strength oscillator over the first `window` transitions.
///
/// Returns None when fewer than window+1 values are available. 100.0 when
/// the average loss over the window is zero. Range [0, 100].
pub fn relative_strength(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window + 1 {
        return None;
    }

    let mut gains = 0.0;
    let mut losses = 0.0;
    for i in 1..=window {
        let delta = values[i] - values[i - 1];
        if delta >= 0.0 {
            gains += delta;
        } else {
            losses -= delta;
        }
    }

    let avg_gain = gains / window as f64;
    let avg_loss = if losses > 0.0 {
        losses / window as f64
    } else {
        0.0
    };
    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// True range per candle: max(high-low, |high-prevClose|, |low-prevClose|).
///
/// Produces one value per transition, so the output is one shorter than the
/// input.
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    if candles.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(candles.len() - 1);
    let mut prev_close = candles[0].close;
    for c in &candles[1..] {
        let hl = c.high - c.low;
        let hc = (c.high - prev_close).abs();
        let lc = (c.low - prev_close).abs();
        out.push(hl.max(hc).max(lc));
        prev_close = c.close;
    }
    out
}

/// Scale-free volatility fraction: exponentially smoothed true range divided
/// by the most recent close (a zero close is treated as 1.0).
///
/// Returns 0.0 when fewer than window+1 candles are available.
pub fn normalized_volatility(candles: &[Candle], window: usize) -> f64 {
    if candles.len() < window + 1 {
        return 0.0;
    }

    let ranges = true_range(candles);
    let k = 2.0 / (window as f64 + 1.0);
    let mut s = ranges[0];
    for &tr in &ranges[1..] {
        s = (tr - s) * k + s;
    }

    let last_close = candles[candles.len() - 1].close;
    let denom = if last_close == 0.0 { 1.0 } else { last_close };
    s / denom
}
