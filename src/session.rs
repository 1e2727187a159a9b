//! Bot session: per-pair state and the once-per-tick decision cycle
//!
//! A single owned session object holds everything a cycle mutates (fee
//! cache, balance snapshot, ledger, status) and is driven by the scheduler.
//! The status snapshot is the only state shared outside the session, and
//! only the cycle writes it.

use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::exchange::{MarketData, OrderSubmitter};
use crate::ledger::TradeLog;
use crate::planner::{ladder_for_regime, plan_ladder, MAX_ACTIONS_PER_CYCLE};
use crate::regime::{classify, Regime};
use crate::sim::simulate_fill;
use crate::{Candle, FeeSchedule};

/// Candle sampling period fed to the classifier
pub const CANDLE_PERIOD_MINUTES: u32 = 5;
/// Series depth requested per cycle
pub const CANDLE_HISTORY: usize = 200;

// Balances below this are treated as unfunded
const MIN_TRADABLE_BALANCE: f64 = 1e-6;

/// Read-only telemetry published once per cycle
#[derive(Debug, Clone)]
pub struct Status {
    pub regime: Regime,
    pub message: String,
    pub price: f64,
    pub balance: f64,
    pub fees: FeeSchedule,
    pub cycles: u64,
    pub updated_at: DateTime<Utc>,
}

impl Default for Status {
    fn default() -> Self {
        Status {
            regime: Regime::Scout,
            message: "starting".to_string(),
            price: 0.0,
            balance: 0.0,
            fees: FeeSchedule::default(),
            cycles: 0,
            updated_at: Utc::now(),
        }
    }
}

/// Shared status snapshot: the scheduler's cycle is the single writer, any
/// number of reporters may poll a copy.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    inner: Arc<RwLock<Status>>,
}

impl StatusBoard {
    pub fn snapshot(&self) -> Status {
        self.inner.read().unwrap().clone()
    }

    pub(crate) fn publish(&self, status: Status) {
        *self.inner.write().unwrap() = status;
    }

    /// Overwrite only the message, keeping the rest of the snapshot
    pub(crate) fn set_message(&self, message: String) {
        let mut status = self.inner.write().unwrap();
        status.message = message;
        status.updated_at = Utc::now();
    }
}

/// Per-pair trading session
pub struct BotSession<M: MarketData> {
    config: Config,
    market: M,
    fees: FeeSchedule,
    balance: f64,
    ledger: TradeLog,
    /// Live-execution collaborator slot. This build ships no implementation,
    /// so the slot stays `None` and live cycles submit nothing.
    live_executor: Option<Box<dyn OrderSubmitter>>,
    status: StatusBoard,
    cycles: u64,
    last_error: Option<String>,
}

impl<M: MarketData> BotSession<M> {
    pub fn new(config: Config, market: M) -> anyhow::Result<Self> {
        let ledger = TradeLog::open(&config.ledger.path)?;
        let fees = config.exchange.manual_fees.unwrap_or_default();
        Ok(BotSession {
            config,
            market,
            fees,
            balance: 0.0,
            ledger,
            live_executor: None,
            status: StatusBoard::default(),
            cycles: 0,
            last_error: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn status_board(&self) -> StatusBoard {
        self.status.clone()
    }

    async fn refresh_fees(&mut self) {
        // A manual override is sticky and suppresses the refresh entirely
        if self.config.exchange.manual_fees.is_some() {
            return;
        }
        match self.market.fee_schedule(&self.config.trading.pair).await {
            Ok(fees) => self.fees = fees,
            Err(err) => debug!("fee refresh failed, keeping previous schedule: {err}"),
        }
    }

    async fn refresh_balance(&mut self) {
        self.balance = match self
            .market
            .available_balance(self.config.quote_asset())
            .await
        {
            Ok(balance) => balance,
            Err(err) => {
                self.note_error(format!("balance fetch failed: {err}"));
                0.0
            }
        };
    }

    async fn fetch_price(&mut self) -> f64 {
        match self.market.ticker(&self.config.trading.pair).await {
            Ok(price) => price,
            Err(err) => {
                self.note_error(format!("price fetch failed: {err}"));
                0.0
            }
        }
    }

    async fn fetch_candles(&mut self) -> Vec<Candle> {
        match self
            .market
            .candles(
                &self.config.trading.pair,
                CANDLE_PERIOD_MINUTES,
                CANDLE_HISTORY,
            )
            .await
        {
            Ok(candles) => candles,
            Err(err) => {
                self.note_error(format!("candle fetch failed: {err}"));
                Vec::new()
            }
        }
    }

    fn note_error(&mut self, message: String) {
        warn!("{message}");
        self.last_error = Some(message);
    }

    /// One full decide-plan-simulate cycle. Data-source failures degrade to
    /// safe defaults inside; an Err from here is an unexpected failure the
    /// scheduler records and survives.
    pub async fn run_cycle(&mut self) -> anyhow::Result<()> {
        self.last_error = None;
        self.cycles += 1;

        self.refresh_fees().await;
        self.refresh_balance().await;
        let price = self.fetch_price().await;
        let candles = self.fetch_candles().await;

        let regime = classify(&candles);
        self.publish_status(regime, price);

        if !regime.is_tradable() || self.balance <= MIN_TRADABLE_BALANCE || price <= 0.0 {
            return Ok(());
        }

        let trading = &self.config.trading;
        let ladder = plan_ladder(
            price,
            trading.budget_usd,
            self.balance,
            trading.grid_levels,
            trading.spacing_fraction,
            &self.fees,
            trading.min_net_fraction,
        );
        let intents = ladder_for_regime(regime, ladder);

        for intent in intents.iter().take(MAX_ACTIONS_PER_CYCLE) {
            if trading.simulated {
                let record = simulate_fill(
                    intent,
                    regime,
                    &self.config.exchange.id,
                    &trading.pair,
                    trading.spacing_fraction,
                    &self.fees,
                    trading.tick_seconds,
                );
                info!(
                    "{} {} {:.8} @ {:.4} -> {:.4} (net {:.4}%)",
                    regime,
                    intent.side,
                    intent.quantity,
                    intent.limit_price,
                    record.exit_price,
                    record.net_pct * 100.0
                );
                self.ledger.append(&record)?;
            } else {
                match &self.live_executor {
                    Some(executor) => {
                        executor.submit(&trading.pair, intent).await.map_err(|e| {
                            anyhow::anyhow!("live order submission failed: {e}")
                        })?;
                    }
                    None => {
                        self.status.set_message(format!(
                            "{regime} | live execution unavailable, no orders submitted"
                        ));
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    fn publish_status(&self, regime: Regime, price: f64) {
        let mut message = format!(
            "{} | price={:.2} | bal=${:.2} | fees m/t={:.4}/{:.4}",
            regime, price, self.balance, self.fees.maker, self.fees.taker
        );
        if let Some(err) = &self.last_error {
            message.push_str(" | ");
            message.push_str(err);
        }
        self.status.publish(Status {
            regime,
            message,
            price,
            balance: self.balance,
            fees: self.fees,
            cycles: self.cycles,
            updated_at: Utc::now(),
        });
    }
}
