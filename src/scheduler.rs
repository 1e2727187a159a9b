//! Tick scheduler
//!
//! Drives the session once per interval as the single background activity.
//! Cycles never overlap; any failure inside a cycle is caught here, recorded
//! as the latest status message, and the loop proceeds to the next wake-up.
//! A stop request is honored between cycles only.

use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::exchange::MarketData;
use crate::session::BotSession;

/// Floor on the configured tick interval, enforced regardless of config
pub const MIN_TICK_SECONDS: u64 = 5;

pub fn tick_interval(configured_seconds: u64) -> Duration {
    Duration::from_secs(configured_seconds.max(MIN_TICK_SECONDS))
}

/// Run the cycle loop until a stop is requested
pub async fn run<M: MarketData>(mut session: BotSession<M>, mut stop: watch::Receiver<bool>) {
    let interval = tick_interval(session.config().trading.tick_seconds);
    info!("scheduler started (interval {:?})", interval);

    loop {
        if let Err(err) = session.run_cycle().await {
            warn!("cycle failed: {err:#}");
            session
                .status_board()
                .set_message(format!("cycle error: {err:#}"));
        }

        if *stop.borrow() {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = stop.changed() => {
                if *stop.borrow() {
                    break;
                }
            }
        }
    }

    info!("scheduler stopped");
}

/// Execute exactly one cycle, for dry runs
pub async fn run_once<M: MarketData>(session: &mut BotSession<M>) -> anyhow::Result<()> {
    session.run_cycle().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_interval_floor() {
        assert_eq!(tick_interval(0), Duration::from_secs(5));
        assert_eq!(tick_interval(3), Duration::from_secs(5));
        assert_eq!(tick_interval(5), Duration::from_secs(5));
        assert_eq!(tick_interval(60), Duration::from_secs(60));
    }
}
