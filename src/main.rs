//! Regime-grid trading bot - main entry point
//!
//! Loads configuration, connects the Kraken market-data client, and runs the
//! decision cycle on a fixed interval with a foreground status printer.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use regime_grid_bot::config::{resolve_simulated, Config};
use regime_grid_bot::exchange::{Credentials, KrakenClient};
use regime_grid_bot::session::BotSession;
use regime_grid_bot::{scheduler, FeeSchedule};

#[derive(Parser, Debug)]
#[command(name = "regime-grid-bot")]
#[command(about = "Regime-aware grid trading bot with fee-checked ladders", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to JSON configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Trading pair, e.g. BTC/USD
    #[arg(long)]
    pair: Option<String>,

    /// USD budget cap
    #[arg(long)]
    budget: Option<f64>,

    /// Grid levels per side
    #[arg(long)]
    grids: Option<usize>,

    /// Spacing between levels as a fraction (0.005 = 0.5%)
    #[arg(long)]
    spacing: Option<f64>,

    /// Minimum net step after both maker legs
    #[arg(long)]
    min_net: Option<f64>,

    /// Cycle interval in seconds
    #[arg(long)]
    tick: Option<u64>,

    /// Ledger CSV path
    #[arg(long)]
    ledger: Option<String>,

    /// Override maker fee (sticky, suppresses fee refresh)
    #[arg(long)]
    maker: Option<f64>,

    /// Override taker fee (sticky, suppresses fee refresh)
    #[arg(long)]
    taker: Option<f64>,

    /// Live trading mode (CAUTION - REAL MONEY!)
    #[arg(long)]
    live: bool,

    /// Required with --live: pass I-UNDERSTAND to confirm
    #[arg(long, default_value = "")]
    confirm: String,

    /// Run a single cycle then exit
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    let log_filename = format!(
        "run_{}.log",
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Filter out noisy HTTP internals unless explicitly requested
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!("{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn", level);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(true);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Log file: {}", log_path.display());
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => {
            let mut config = Config::default();
            config.load_env_credentials();
            config
        }
    };

    if let Some(pair) = &cli.pair {
        config.trading.pair = pair.clone();
    }
    if let Some(budget) = cli.budget {
        config.trading.budget_usd = budget;
    }
    if let Some(grids) = cli.grids {
        config.trading.grid_levels = grids;
    }
    if let Some(spacing) = cli.spacing {
        config.trading.spacing_fraction = spacing;
    }
    if let Some(min_net) = cli.min_net {
        config.trading.min_net_fraction = min_net;
    }
    if let Some(tick) = cli.tick {
        config.trading.tick_seconds = tick;
    }
    if let Some(path) = &cli.ledger {
        config.ledger.path = path.clone();
    }
    if cli.maker.is_some() || cli.taker.is_some() {
        let base = config.exchange.manual_fees.unwrap_or_default();
        config.exchange.manual_fees = Some(FeeSchedule {
            maker: cli.maker.unwrap_or(base.maker),
            taker: cli.taker.unwrap_or(base.taker),
        });
    }

    let wants_live = cli.live || !config.trading.simulated;
    let simulated = resolve_simulated(wants_live, &cli.confirm);
    if wants_live && simulated {
        tracing::warn!("Live mode requested without confirmation token; falling back to simulated");
    }
    config.trading.simulated = simulated;

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let config = load_config(&cli)?;
    info!(
        "{} {} | mode={} | budget=${} grids={} spacing={} min_net={} tick={}s",
        config.exchange.id.to_uppercase(),
        config.trading.pair,
        if config.trading.simulated { "SIMULATED" } else { "LIVE" },
        config.trading.budget_usd,
        config.trading.grid_levels,
        config.trading.spacing_fraction,
        config.trading.min_net_fraction,
        config.trading.tick_seconds,
    );

    let credentials = match (&config.exchange.api_key, &config.exchange.api_secret) {
        (Some(key), Some(secret)) => Some(Credentials::new(key.clone(), secret.clone())),
        _ => None,
    };
    let client = KrakenClient::new(credentials);
    let mut session = BotSession::new(config, client)?;

    if cli.dry_run {
        scheduler::run_once(&mut session).await?;
        let status = session.status_board().snapshot();
        println!("phase={} | {}", status.regime, status.message);
        info!("Dry run complete");
        return Ok(());
    }

    let board = session.status_board();
    let (stop_tx, stop_rx) = watch::channel(false);
    let loop_handle = tokio::spawn(scheduler::run(session, stop_rx));

    // Foreground status printer; Ctrl+C requests a stop honored between
    // cycles.
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping...");
                break;
            }
            _ = tokio::time::sleep(std::time::Duration::from_secs(5)) => {
                let status = board.snapshot();
                println!(
                    "[{}] phase={} | {}",
                    status.updated_at.format("%H:%M:%S"),
                    status.regime,
                    status.message
                );
            }
        }
    }

    let _ = stop_tx.send(true);
    loop_handle.await?;
    Ok(())
}
