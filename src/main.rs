use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use optionbot::broker::{Broker, PaperBroker};
use optionbot::config::SessionConfig;
use optionbot::execution::{
    IntervalTicker, ManualReport, SessionEvent, SessionOutcome, TradeAction, TradingLoop,
};
use optionbot::models::{AccountMode, Signal, TradeRecord};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "optionbot", version, about = "SMA/RSI binary options signal bot")]
struct Cli {
    /// TOML config file (defaults to ./optionbot.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Starting balance of the practice account
    #[arg(long, global = true, default_value_t = 1000.0)]
    balance: f64,

    /// Seed for the practice market
    #[arg(long, global = true, default_value_t = 42)]
    seed: u64,

    /// Print events as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Trade automatically until the stop-loss trips or Ctrl+C, then list the trades
    Auto(AutoArgs),
    /// Analyze the chart once and print the signal
    Manual(SessionArgs),
}

#[derive(Args)]
struct SessionArgs {
    /// Instrument to analyze (repeat in `auto` to run several sessions)
    #[arg(long = "instrument")]
    instruments: Vec<String>,

    #[arg(long, value_enum)]
    account: Option<AccountArg>,
}

#[derive(Args)]
struct AutoArgs {
    #[command(flatten)]
    session: SessionArgs,

    /// Stake per trade
    #[arg(long)]
    amount: Option<f64>,

    /// Drawdown percent that halts trading
    #[arg(long)]
    stop_loss: Option<f64>,

    /// Seconds between cycles
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Cycles to suppress a repeated same-direction trade
    #[arg(long)]
    cooldown: Option<u32>,
}

#[derive(Clone, Copy, ValueEnum)]
enum AccountArg {
    Practice,
    Real,
}

impl From<AccountArg> for AccountMode {
    fn from(arg: AccountArg) -> Self {
        match arg {
            AccountArg::Practice => AccountMode::Practice,
            AccountArg::Real => AccountMode::Real,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();
    let base = SessionConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let broker = Arc::new(PaperBroker::new(cli.balance, cli.seed));

    match cli.command {
        Command::Auto(args) => {
            let configs = session_configs(&base, &args.session, |config| {
                if let Some(amount) = args.amount {
                    config.investment_amount = amount;
                }
                if let Some(stop_loss) = args.stop_loss {
                    config.stop_loss_percent = stop_loss;
                }
                if let Some(poll_interval) = args.poll_interval {
                    config.poll_interval_secs = poll_interval;
                }
                if let Some(cooldown) = args.cooldown {
                    config.trade_cooldown_cycles = cooldown;
                }
            })?;
            run_auto(broker.clone(), configs, cli.json).await?;
            print_history(broker.as_ref(), 10, cli.json).await?;
        }
        Command::Manual(args) => {
            for config in session_configs(&base, &args, |_| {})? {
                let trading = TradingLoop::new(config)?;
                let report = trading.run_manual(broker.as_ref()).await?;
                if cli.json {
                    println!("{}", serde_json::to_string(&report)?);
                } else {
                    print_manual(&trading, &report);
                }
            }
        }
    }

    Ok(())
}

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("optionbot=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// One validated config per requested instrument
fn session_configs(
    base: &SessionConfig,
    args: &SessionArgs,
    overrides: impl Fn(&mut SessionConfig),
) -> anyhow::Result<Vec<SessionConfig>> {
    let mut base = base.clone();
    if let Some(account) = args.account {
        base.account_mode = account.into();
    }
    if base.account_mode == AccountMode::Real {
        bail!("real account mode needs a live broker connector; only the practice account is available");
    }
    overrides(&mut base);

    let instruments = if args.instruments.is_empty() {
        vec![base.instrument.clone()]
    } else {
        args.instruments.clone()
    };

    instruments
        .into_iter()
        .map(|instrument| -> anyhow::Result<SessionConfig> {
            let config = SessionConfig {
                instrument,
                ..base.clone()
            };
            config.validate()?;
            Ok(config)
        })
        .collect()
}

async fn run_auto(
    broker: Arc<PaperBroker>,
    configs: Vec<SessionConfig>,
    json: bool,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let (events_tx, mut events_rx) = mpsc::channel(64);

    for config in &configs {
        tracing::info!("\n📊 Configuration:");
        tracing::info!("  Instrument: {}", config.instrument);
        tracing::info!("  Stake: ${:.2}", config.investment_amount);
        tracing::info!("  Stop-Loss: {}%", config.stop_loss_percent);
        tracing::info!("  Poll interval: {}s", config.poll_interval_secs);
    }

    let mut sessions = JoinSet::new();
    for config in configs {
        let mut trading = TradingLoop::new(config)?;
        let broker = broker.clone();
        let cancel = cancel.clone();
        let events_tx = events_tx.clone();

        // One task per instrument so a slow broker call never delays another timer
        sessions.spawn(async move {
            let period = Duration::from_secs(trading.config().poll_interval_secs);
            let mut ticker = IntervalTicker::new(period);
            let outcome = trading
                .run_automatic(broker.as_ref(), &mut ticker, &cancel, &events_tx)
                .await;
            (trading.config().instrument.clone(), outcome)
        });
    }
    drop(events_tx);

    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            print_event(&event, json);
        }
    });

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c(), if !cancel.is_cancelled() => {
                tracing::info!("\n⚠️  Received Ctrl+C, shutting down...");
                cancel.cancel();
            }
            joined = sessions.join_next() => match joined {
                Some(Ok((instrument, Ok(SessionOutcome::Stopped(risk))))) => tracing::warn!(
                    "{} stopped by stop-loss at ${:.2} (baseline ${:.2})",
                    instrument,
                    risk.current_balance,
                    risk.baseline_balance
                ),
                Some(Ok((instrument, Ok(outcome)))) => {
                    tracing::info!("{} ended: {:?}", instrument, outcome)
                }
                Some(Ok((instrument, Err(e)))) => {
                    tracing::error!("{} session failed: {}", instrument, e)
                }
                Some(Err(e)) => tracing::error!("Session task panicked: {}", e),
                None => break,
            },
        }
    }
    printer.await.ok();

    tracing::info!("👋 optionbot stopped");
    Ok(())
}

fn print_event(event: &SessionEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::error!("Failed to encode event: {}", e),
        }
        return;
    }

    match event {
        SessionEvent::Armed { instrument, risk, .. } => println!(
            "✅ {instrument}: automatic mode on, balance ${:.2}, stop-loss {}%",
            risk.baseline_balance, risk.limit_percent
        ),
        SessionEvent::Cycle(report) => {
            let time = report.timestamp.format("%H:%M:%S");
            match &report.snapshot {
                Some(s) => println!(
                    "[{time}] {} close {:.5} | SMA short {:.5} | SMA long {:.5} | RSI {:.2} | {}",
                    report.instrument, s.last_close, s.short_ma, s.long_ma, s.oscillator, report.signal
                ),
                None => println!(
                    "[{time}] {} waiting for data ({})",
                    report.instrument,
                    report.skipped.as_deref().unwrap_or("indicators undefined")
                ),
            }
            match &report.trade {
                TradeAction::Placed { request, trade_id } => println!(
                    "    {} ${:.2} {} placed ({trade_id})",
                    request.direction, request.amount, request.instrument
                ),
                TradeAction::Failed { request, error } => {
                    println!("    {} {} not placed: {error}", request.direction, request.instrument)
                }
                TradeAction::Skipped { .. } if report.signal == Signal::Hold => {
                    println!("    Waiting for an opportunity...")
                }
                TradeAction::Skipped { reason } => println!("    {reason}"),
            }
            println!(
                "    Balance ${:.2} | drawdown {:.2}% of {}% limit",
                report.risk.current_balance,
                report.risk.drawdown_pct().unwrap_or(0.0),
                report.risk.limit_percent
            );
        }
        SessionEvent::CycleFailed { instrument, error, .. } => {
            println!("✗ {instrument}: cycle skipped, {error}")
        }
        SessionEvent::Stopped { instrument, risk, .. } => println!(
            "🛑 {instrument}: stop-loss reached (${:.2} from ${:.2}), trading halted",
            risk.current_balance, risk.baseline_balance
        ),
    }
}

fn print_manual(trading: &TradingLoop, report: &ManualReport) {
    let windows = trading.config().indicators;

    println!("📊 Market analysis: {}", report.instrument);
    if let Some(close) = report.last_close {
        println!("  Last price: {close:.5}");
    }
    match &report.snapshot {
        Some(s) => {
            println!("  SMA short ({}): {:.5}", windows.short_ma, s.short_ma);
            println!("  SMA long ({}): {:.5}", windows.long_ma, s.long_ma);
            println!("  RSI ({}): {:.2}", windows.oscillator, s.oscillator);
        }
        None => println!(
            "  Indicators unavailable: {}",
            report.skipped.as_deref().unwrap_or("unknown")
        ),
    }

    match report.signal {
        Signal::Buy => println!("  BUY (call) signal detected for {}", report.instrument),
        Signal::Sell => println!("  SELL (put) signal detected for {}", report.instrument),
        Signal::Hold => println!("  No clear signal right now"),
    }
    println!(
        "  Stop-loss configured at {}%",
        trading.config().stop_loss_percent
    );
}

async fn print_history<B: Broker + ?Sized>(
    broker: &B,
    count: usize,
    json: bool,
) -> anyhow::Result<()> {
    let trades = broker.recent_trades(count).await?;
    if json {
        println!("{}", serde_json::to_string(&trades)?);
        return Ok(());
    }

    println!("\n📜 Recent trades");
    if trades.is_empty() {
        println!("  (none)");
    }
    for trade in &trades {
        print_trade(trade);
    }
    Ok(())
}

fn print_trade(trade: &TradeRecord) {
    println!(
        "  {} {:<7} {:<4} ${:>8.2} {}m {:?} {:+.2}",
        trade.opened_at.format("%Y-%m-%d %H:%M"),
        trade.instrument,
        trade.direction.to_string(),
        trade.amount,
        trade.expiry_minutes,
        trade.outcome,
        trade.profit
    );
}
