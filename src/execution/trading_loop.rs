use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{CandleWindow, ExecutionAction, Executor, Ticker};
use crate::broker::Broker;
use crate::config::{ConfigError, SessionConfig};
use crate::error::{Error, Result};
use crate::indicators::IndicatorSnapshot;
use crate::models::{Signal, TradeId, TradeRequest};
use crate::risk::{RiskDecision, RiskMonitor, RiskState};
use crate::strategy::{CrossoverStrategy, MarketAnalysis};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoopState {
    Idle,
    Armed,
    Polling,
    Evaluating,
    Stopped,
}

/// What happened to the order side of a cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TradeAction {
    Skipped { reason: String },
    Placed { request: TradeRequest, trade_id: TradeId },
    /// Broker refused or failed the order; the session keeps running
    Failed { request: TradeRequest, error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub instrument: String,
    pub timestamp: DateTime<Utc>,
    pub candles: usize,
    pub snapshot: Option<IndicatorSnapshot>,
    /// Why the indicators were undefined, when they were
    pub skipped: Option<String>,
    pub signal: Signal,
    pub risk: RiskState,
    pub trade: TradeAction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Stop-loss reached; the loop is now `Stopped`
    Halted(RiskState),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManualReport {
    pub instrument: String,
    pub timestamp: DateTime<Utc>,
    pub last_close: Option<f64>,
    pub snapshot: Option<IndicatorSnapshot>,
    pub skipped: Option<String>,
    pub signal: Signal,
}

/// Events published to whoever presents the session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Armed {
        instrument: String,
        timestamp: DateTime<Utc>,
        risk: RiskState,
    },
    Cycle(CycleReport),
    CycleFailed {
        instrument: String,
        timestamp: DateTime<Utc>,
        error: String,
    },
    Stopped {
        instrument: String,
        timestamp: DateTime<Utc>,
        risk: RiskState,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionOutcome {
    /// Stop-loss reached
    Stopped(RiskState),
    Cancelled,
    /// The tick source ended
    TickerClosed,
}

/// Polling, evaluation and stop-loss state machine for one instrument
///
/// Each instance owns its risk monitor, so several instruments can run side by
/// side without sharing mutable state. Cycles take `&mut self` and therefore
/// never overlap.
pub struct TradingLoop {
    config: SessionConfig,
    strategy: CrossoverStrategy,
    executor: Executor,
    risk: RiskMonitor,
    state: LoopState,
}

impl TradingLoop {
    pub fn new(config: SessionConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            strategy: CrossoverStrategy::new(config.indicators, config.signal),
            executor: Executor::new(&config),
            risk: RiskMonitor::new(),
            state: LoopState::Idle,
            config,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn risk_state(&self) -> Option<RiskState> {
        self.risk.state().copied()
    }

    /// Capture the current balance as the session baseline
    ///
    /// A broker failure leaves the loop untouched; a non-positive balance is a
    /// configuration error and the session never starts.
    pub async fn arm<B: Broker + ?Sized>(&mut self, broker: &B) -> Result<RiskState> {
        let balance = broker.get_balance().await?;
        if !(balance > 0.0) {
            return Err(ConfigError::InvalidBaseline(balance).into());
        }

        self.risk.arm(balance, self.config.stop_loss_percent);
        self.executor.reset();
        self.state = LoopState::Armed;

        tracing::info!(
            instrument = %self.config.instrument,
            account = ?self.config.account_mode,
            baseline = balance,
            stop_loss_pct = self.config.stop_loss_percent,
            "✅ Session armed"
        );

        self.risk_state().ok_or(Error::NotArmed(self.state))
    }

    /// End the session and drop its baseline
    pub fn disarm(&mut self) {
        self.risk.disarm();
        self.state = LoopState::Idle;
    }

    async fn fetch_window<B: Broker + ?Sized>(&self, broker: &B) -> Result<CandleWindow> {
        let candles = broker
            .get_candles(
                &self.config.instrument,
                self.config.candle_timeframe_secs,
                self.config.candle_count,
                Utc::now(),
            )
            .await?;
        Ok(CandleWindow::from_candles(candles, self.config.candle_count))
    }

    /// Candle window and balance for one cycle
    async fn poll<B: Broker + ?Sized>(&self, broker: &B) -> Result<(CandleWindow, f64)> {
        let window = self.fetch_window(broker).await?;
        let balance = broker.get_balance().await?;
        Ok((window, balance))
    }

    fn analyze(&self, window: &CandleWindow) -> MarketAnalysis {
        self.strategy.analyze(window.as_slice())
    }

    /// Run one Polling → Evaluating pass of an armed session
    ///
    /// Errors reading candles or balance abort the cycle without a state change
    /// so the caller can retry on the next tick.
    pub async fn run_cycle<B: Broker + ?Sized>(&mut self, broker: &B) -> Result<CycleOutcome> {
        match self.state {
            LoopState::Idle => return Err(Error::NotArmed(self.state)),
            LoopState::Stopped => return Err(Error::SessionStopped),
            _ => {}
        }
        let prior = self.state;
        self.state = LoopState::Polling;

        let (window, balance) = match self.poll(broker).await {
            Ok(read) => read,
            Err(e) => {
                self.state = prior;
                return Err(e);
            }
        };

        if self.risk.check(balance) == RiskDecision::Stop {
            self.state = LoopState::Stopped;
            let risk = self.risk_state().ok_or(Error::NotArmed(self.state))?;
            tracing::warn!(
                instrument = %self.config.instrument,
                balance,
                "🛑 Stop-loss reached, halting session"
            );
            return Ok(CycleOutcome::Halted(risk));
        }

        self.state = LoopState::Evaluating;
        let analysis = self.analyze(&window);
        let decision = self.executor.process_signal(analysis.signal);

        let trade = match decision.action {
            ExecutionAction::Skip => TradeAction::Skipped {
                reason: decision.reason,
            },
            ExecutionAction::Execute(request) => match broker.place_trade(&request).await {
                Ok(trade_id) => {
                    self.executor.record_trade(request.direction);
                    tracing::info!(
                        instrument = %request.instrument,
                        direction = %request.direction,
                        amount = request.amount,
                        trade_id = %trade_id,
                        "💰 Trade placed"
                    );
                    TradeAction::Placed { request, trade_id }
                }
                Err(e) => {
                    tracing::warn!(
                        instrument = %request.instrument,
                        direction = %request.direction,
                        "Trade not placed: {}",
                        e
                    );
                    TradeAction::Failed {
                        request,
                        error: e.to_string(),
                    }
                }
            },
        };

        let risk = self.risk_state().ok_or(Error::NotArmed(self.state))?;
        self.state = LoopState::Polling;

        Ok(CycleOutcome::Completed(CycleReport {
            instrument: self.config.instrument.clone(),
            timestamp: Utc::now(),
            candles: window.len(),
            snapshot: analysis.snapshot,
            skipped: analysis.skipped.map(|e| e.to_string()),
            signal: analysis.signal,
            risk,
            trade,
        }))
    }

    /// One analysis pass with no risk check and no order, for display
    pub async fn run_manual<B: Broker + ?Sized>(&self, broker: &B) -> Result<ManualReport> {
        let window = self.fetch_window(broker).await?;
        let analysis = self.analyze(&window);

        Ok(ManualReport {
            instrument: self.config.instrument.clone(),
            timestamp: Utc::now(),
            last_close: window.latest().map(|c| c.close),
            snapshot: analysis.snapshot,
            skipped: analysis.skipped.map(|e| e.to_string()),
            signal: analysis.signal,
        })
    }

    /// Arm and trade until the stop-loss trips, `cancel` fires or the ticker ends
    ///
    /// Cancellation is honoured at the top of every iteration and while waiting
    /// on the broker, the ticker or a full event channel. Broker failures are published as
    /// `CycleFailed` and retried on the next tick.
    pub async fn run_automatic<B, T>(
        &mut self,
        broker: &B,
        ticker: &mut T,
        cancel: &CancellationToken,
        events: &mpsc::Sender<SessionEvent>,
    ) -> Result<SessionOutcome>
    where
        B: Broker + ?Sized,
        T: Ticker + ?Sized,
    {
        let armed = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            armed = self.arm(broker) => Some(armed),
        };
        let Some(armed) = armed else {
            return Ok(SessionOutcome::Cancelled);
        };
        let risk = armed?;

        let armed = SessionEvent::Armed {
            instrument: self.config.instrument.clone(),
            timestamp: Utc::now(),
            risk,
        };
        if !publish(events, cancel, armed).await {
            return Ok(self.cancel_session());
        }

        loop {
            if cancel.is_cancelled() {
                return Ok(self.cancel_session());
            }

            tracing::info!(
                instrument = %self.config.instrument,
                "💹 [TRADING] Tick at {}",
                Utc::now().format("%H:%M:%S")
            );

            let cycle = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                cycle = self.run_cycle(broker) => Some(cycle),
            };
            let Some(cycle) = cycle else {
                return Ok(self.cancel_session());
            };

            let event = match cycle {
                Ok(CycleOutcome::Completed(report)) => {
                    log_cycle(&report);
                    SessionEvent::Cycle(report)
                }
                Ok(CycleOutcome::Halted(risk)) => {
                    let stopped = SessionEvent::Stopped {
                        instrument: self.config.instrument.clone(),
                        timestamp: Utc::now(),
                        risk,
                    };
                    // Already halted; a cancel here only drops the notification
                    publish(events, cancel, stopped).await;
                    return Ok(SessionOutcome::Stopped(risk));
                }
                Err(Error::Broker(e)) => {
                    tracing::warn!(
                        instrument = %self.config.instrument,
                        "✗ Cycle aborted, retrying next tick: {}",
                        e
                    );
                    SessionEvent::CycleFailed {
                        instrument: self.config.instrument.clone(),
                        timestamp: Utc::now(),
                        error: e.to_string(),
                    }
                }
                Err(e) => return Err(e),
            };
            if !publish(events, cancel, event).await {
                return Ok(self.cancel_session());
            }

            let ticked = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                ticked = ticker.tick() => Some(ticked),
            };
            match ticked {
                None => return Ok(self.cancel_session()),
                Some(false) => {
                    tracing::info!(instrument = %self.config.instrument, "Tick source closed");
                    self.disarm();
                    return Ok(SessionOutcome::TickerClosed);
                }
                Some(true) => {}
            }
        }
    }

    fn cancel_session(&mut self) -> SessionOutcome {
        tracing::info!(instrument = %self.config.instrument, "⚠️  Session cancelled");
        self.disarm();
        SessionOutcome::Cancelled
    }
}

/// Deliver an event, giving up if the session is cancelled first
///
/// Returns `false` when cancellation won. A dropped receiver is not an error.
async fn publish(
    events: &mpsc::Sender<SessionEvent>,
    cancel: &CancellationToken,
    event: SessionEvent,
) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = events.send(event) => {
            if sent.is_err() {
                tracing::debug!("Session event receiver dropped");
            }
            true
        }
    }
}

fn log_cycle(report: &CycleReport) {
    match &report.snapshot {
        Some(snapshot) => tracing::info!(
            instrument = %report.instrument,
            close = snapshot.last_close,
            sma_short = snapshot.short_ma,
            sma_long = snapshot.long_ma,
            rsi = snapshot.oscillator,
            signal = %report.signal,
            drawdown_pct = ?report.risk.drawdown_pct(),
            "  → Cycle complete"
        ),
        None => tracing::info!(
            instrument = %report.instrument,
            candles = report.candles,
            "  → Waiting for data: {}",
            report.skipped.as_deref().unwrap_or("indicators undefined")
        ),
    }
}
