use serde::Serialize;

use crate::config::SessionConfig;
use crate::models::{Direction, Signal, TradeRequest};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExecutionAction {
    Execute(TradeRequest),
    Skip,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionDecision {
    pub action: ExecutionAction,
    pub reason: String,
}

/// Turns signals into trade requests with a fixed stake and expiry
///
/// With `cooldown_cycles == 0` every Buy/Sell signal produces a request, even
/// when the same signal fired on the previous cycle. A positive cooldown
/// suppresses a same-direction trade for that many cycles after a placement.
#[derive(Debug, Clone)]
pub struct Executor {
    instrument: String,
    amount: f64,
    expiry_minutes: u32,
    cooldown_cycles: u32,
    cycle: u64,
    last_trade: Option<(Direction, u64)>,
}

impl Executor {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            instrument: config.instrument.clone(),
            amount: config.investment_amount,
            expiry_minutes: config.expiry_minutes,
            cooldown_cycles: config.trade_cooldown_cycles,
            cycle: 0,
            last_trade: None,
        }
    }

    /// Forget trade history, used when a new session is armed
    pub fn reset(&mut self) {
        self.cycle = 0;
        self.last_trade = None;
    }

    /// Process one cycle's signal and decide what to do
    pub fn process_signal(&mut self, signal: Signal) -> ExecutionDecision {
        self.cycle += 1;

        let Some(direction) = signal.direction() else {
            return ExecutionDecision {
                action: ExecutionAction::Skip,
                reason: "Hold signal".to_string(),
            };
        };

        if let Some((last_direction, last_cycle)) = self.last_trade {
            let elapsed = self.cycle - last_cycle;
            if last_direction == direction && elapsed <= self.cooldown_cycles as u64 {
                return ExecutionDecision {
                    action: ExecutionAction::Skip,
                    reason: format!(
                        "Cooldown: {} placed {} cycle(s) ago (cooldown {})",
                        direction, elapsed, self.cooldown_cycles
                    ),
                };
            }
        }

        ExecutionDecision {
            action: ExecutionAction::Execute(TradeRequest {
                instrument: self.instrument.clone(),
                direction,
                amount: self.amount,
                expiry_minutes: self.expiry_minutes,
            }),
            reason: format!("{} signal", signal),
        }
    }

    /// Record that the broker accepted a trade in the current cycle
    pub fn record_trade(&mut self, direction: Direction) {
        self.last_trade = Some((direction, self.cycle));
    }
}
