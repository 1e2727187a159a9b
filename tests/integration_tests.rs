//! Integration tests for the regime-grid trading system
//!
//! Drives whole cycles through a stub market-data collaborator and verifies
//! the decision pipeline end to end: classification, ladder planning, the
//! per-cycle action cap, simulated-fill accounting, and ledger durability.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use regime_grid_bot::exchange::{ExchangeError, MarketData};
use regime_grid_bot::ledger::LEDGER_HEADER;
use regime_grid_bot::planner::{plan_ladder, MAX_ACTIONS_PER_CYCLE};
use regime_grid_bot::regime::{classify, Regime};
use regime_grid_bot::session::BotSession;
use regime_grid_bot::{Candle, Config, FeeSchedule, Side};

// =============================================================================
// Test Utilities
// =============================================================================

static LEDGER_COUNTER: AtomicU64 = AtomicU64::new(0);

fn temp_ledger(tag: &str) -> PathBuf {
    let n = LEDGER_COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "grid_it_{}_{}_{}.csv",
        tag,
        std::process::id(),
        n
    ))
}

fn test_config(ledger: &PathBuf) -> Config {
    let mut config = Config::default();
    config.trading.budget_usd = 50.0;
    config.trading.grid_levels = 8;
    config.trading.spacing_fraction = 0.005;
    config.trading.min_net_fraction = 0.002;
    config.trading.simulated = true;
    // Sticky override keeps fee behavior deterministic in tests
    config.exchange.manual_fees = Some(FeeSchedule {
        maker: 0.001,
        taker: 0.0015,
    });
    config.ledger.path = ledger.display().to_string();
    config
}

/// Candles oscillating gently around a base price: flat trend, balanced
/// momentum, low volatility. Classifies as LUNCHBOX.
fn generate_quiet_candles(count: usize, base_price: f64) -> Vec<Candle> {
    let start_time = Utc::now() - Duration::minutes(5 * count as i64);
    (0..count)
        .map(|i| {
            let close = if i % 2 == 0 {
                base_price
            } else {
                base_price + 0.1
            };
            Candle {
                datetime: start_time + Duration::minutes(5 * i as i64),
                open: close,
                high: close + 0.05,
                low: close - 0.05,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

fn read_lines(path: &PathBuf) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Stub collaborator with canned responses
struct StubMarket {
    price: Result<f64, ()>,
    candles: Result<Vec<Candle>, ()>,
    balance: Result<f64, ()>,
}

impl StubMarket {
    fn healthy(price: f64, candles: Vec<Candle>, balance: f64) -> Self {
        StubMarket {
            price: Ok(price),
            candles: Ok(candles),
            balance: Ok(balance),
        }
    }

    fn failing() -> Self {
        StubMarket {
            price: Err(()),
            candles: Err(()),
            balance: Err(()),
        }
    }
}

#[async_trait]
impl MarketData for StubMarket {
    async fn ticker(&self, _pair: &str) -> Result<f64, ExchangeError> {
        self.price
            .map_err(|_| ExchangeError::Api("stub ticker failure".to_string()))
    }

    async fn candles(
        &self,
        _pair: &str,
        _period_minutes: u32,
        _count: usize,
    ) -> Result<Vec<Candle>, ExchangeError> {
        self.candles
            .clone()
            .map_err(|_| ExchangeError::Api("stub candle failure".to_string()))
    }

    async fn fee_schedule(&self, _pair: &str) -> Result<FeeSchedule, ExchangeError> {
        Err(ExchangeError::Api("stub fee failure".to_string()))
    }

    async fn available_balance(&self, _asset: &str) -> Result<f64, ExchangeError> {
        self.balance
            .map_err(|_| ExchangeError::Api("stub balance failure".to_string()))
    }
}

// =============================================================================
// Classifier Properties
// =============================================================================

#[test]
fn test_short_history_always_scout() {
    for count in [0, 1, 10, 49] {
        let candles = generate_quiet_candles(count, 100.0);
        assert_eq!(classify(&candles), Regime::Scout, "count {count}");
    }
}

#[test]
fn test_quiet_market_classifies_lunchbox() {
    let candles = generate_quiet_candles(200, 100.0);
    assert_eq!(classify(&candles), Regime::Lunchbox);
}

#[test]
fn test_classifier_idempotent_on_identical_series() {
    let candles = generate_quiet_candles(200, 100.0);
    let first = classify(&candles);
    let second = classify(&candles);
    assert_eq!(first, second);
}

// =============================================================================
// Planner Properties
// =============================================================================

#[test]
fn test_ladder_geometry_matches_documented_example() {
    let fees = FeeSchedule {
        maker: 0.001,
        taker: 0.0015,
    };
    let orders = plan_ladder(100.0, 50.0, 100.0, 8, 0.005, &fees, 0.002);

    // Effective budget 50, per-level notional 6.25
    assert_eq!(orders[0].side, Side::Buy);
    assert!((orders[0].limit_price - 99.5).abs() < 1e-9);
    assert!((orders[0].notional() - 6.25).abs() < 1e-4);
    assert_eq!(orders[1].side, Side::Sell);
    assert!((orders[1].limit_price - 100.5).abs() < 1e-9);
}

// =============================================================================
// Full-Cycle Behavior
// =============================================================================

#[tokio::test]
async fn test_cycle_appends_at_most_two_fills() {
    let path = temp_ledger("cap");
    let market = StubMarket::healthy(100.0, generate_quiet_candles(200, 100.0), 100.0);
    let mut session = BotSession::new(test_config(&path), market).unwrap();

    session.run_cycle().await.unwrap();

    // All 16 ladder candidates pass the edge filter, but only the first two
    // are acted on.
    let lines = read_lines(&path);
    assert_eq!(lines.len(), 1 + MAX_ACTIONS_PER_CYCLE);
    assert!(lines[1].contains("LUNCHBOX"));
    assert!(lines[1].contains("LONG"));
    assert!(lines[2].contains("SHORT"));

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_ledger_grows_across_cycles_and_keeps_header() {
    let path = temp_ledger("growth");
    let market = StubMarket::healthy(100.0, generate_quiet_candles(200, 100.0), 100.0);
    let mut session = BotSession::new(test_config(&path), market).unwrap();

    let mut previous = 0;
    for _ in 0..3 {
        session.run_cycle().await.unwrap();
        let lines = read_lines(&path);
        assert_eq!(lines[0], LEDGER_HEADER.join(","));
        assert!(lines.len() > previous);
        previous = lines.len();
    }

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_insufficient_history_is_a_noop() {
    let path = temp_ledger("short");
    let market = StubMarket::healthy(100.0, generate_quiet_candles(30, 100.0), 100.0);
    let mut session = BotSession::new(test_config(&path), market).unwrap();

    session.run_cycle().await.unwrap();

    let status = session.status_board().snapshot();
    assert_eq!(status.regime, Regime::Scout);
    assert_eq!(read_lines(&path).len(), 1);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_failed_fetches_degrade_to_noop_and_survive() {
    let path = temp_ledger("degraded");
    let mut session = BotSession::new(test_config(&path), StubMarket::failing()).unwrap();

    // Two consecutive degraded cycles: no rows, no propagated error
    session.run_cycle().await.unwrap();
    session.run_cycle().await.unwrap();

    let status = session.status_board().snapshot();
    assert_eq!(status.regime, Regime::Scout);
    assert_eq!(status.balance, 0.0);
    assert!(status.message.contains("fetch failed"));
    assert_eq!(read_lines(&path).len(), 1);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_zero_balance_blocks_trading() {
    let path = temp_ledger("broke");
    let market = StubMarket::healthy(100.0, generate_quiet_candles(200, 100.0), 0.0);
    let mut session = BotSession::new(test_config(&path), market).unwrap();

    session.run_cycle().await.unwrap();

    assert_eq!(read_lines(&path).len(), 1);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_live_mode_without_executor_submits_nothing() {
    let path = temp_ledger("live");
    let mut config = test_config(&path);
    config.trading.simulated = false;
    let market = StubMarket::healthy(100.0, generate_quiet_candles(200, 100.0), 100.0);
    let mut session = BotSession::new(config, market).unwrap();

    session.run_cycle().await.unwrap();

    // No ledger rows and the status explains why
    assert_eq!(read_lines(&path).len(), 1);
    let status = session.status_board().snapshot();
    assert!(status.message.contains("live execution unavailable"));

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_fill_record_accounting_matches_formula() {
    let path = temp_ledger("accounting");
    let market = StubMarket::healthy(100.0, generate_quiet_candles(200, 100.0), 100.0);
    let mut session = BotSession::new(test_config(&path), market).unwrap();

    session.run_cycle().await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let mut reader = csv::Reader::from_reader(contents.as_bytes());
    let first = reader.records().next().unwrap().unwrap();

    // Innermost buy: entry 99.5, exit 99.5 * 1.005
    let entry: f64 = first[6].parse().unwrap();
    let exit: f64 = first[7].parse().unwrap();
    let gross: f64 = first[8].parse().unwrap();
    let net: f64 = first[9].parse().unwrap();
    let fee_rt: f64 = first[10].parse().unwrap();

    assert!((entry - 99.5).abs() < 1e-9);
    assert!((exit - 99.5 * 1.005).abs() < 1e-9);
    assert!((gross - 0.005).abs() < 1e-9);
    assert!((net - (gross - fee_rt - 0.0002)).abs() < 1e-12);

    let _ = std::fs::remove_file(&path);
}
