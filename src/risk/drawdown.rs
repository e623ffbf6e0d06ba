use serde::{Deserialize, Serialize};

/// Balance drawdown bookkeeping for one armed session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RiskState {
    pub baseline_balance: f64,
    pub current_balance: f64,
    pub limit_percent: f64,
}

impl RiskState {
    pub fn new(baseline_balance: f64, limit_percent: f64) -> Self {
        Self {
            baseline_balance,
            current_balance: baseline_balance,
            limit_percent,
        }
    }

    /// Percentage lost relative to the baseline
    ///
    /// `None` without a usable baseline or when the balance is not a finite number;
    /// either way the limit counts as breached.
    pub fn drawdown_pct(&self) -> Option<f64> {
        if !self.baseline_balance.is_finite()
            || self.baseline_balance <= 0.0
            || !self.current_balance.is_finite()
        {
            return None;
        }
        Some((self.baseline_balance - self.current_balance) * 100.0 / self.baseline_balance)
    }

    pub fn limit_breached(&self) -> bool {
        match self.drawdown_pct() {
            Some(drawdown) => drawdown >= self.limit_percent,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RiskDecision {
    Continue,
    Stop,
}

/// Stop-loss monitor measuring drawdown against the balance captured at arm time
///
/// Once a check returns `Stop` the monitor stays tripped until re-armed.
#[derive(Debug, Clone, Default)]
pub struct RiskMonitor {
    state: Option<RiskState>,
    tripped: bool,
}

impl RiskMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture a new baseline and clear any previous trip
    pub fn arm(&mut self, baseline_balance: f64, limit_percent: f64) {
        tracing::info!(
            baseline = baseline_balance,
            limit_pct = limit_percent,
            "Risk monitor armed"
        );
        self.state = Some(RiskState::new(baseline_balance, limit_percent));
        self.tripped = false;
    }

    /// Forget the session baseline
    pub fn disarm(&mut self) {
        self.state = None;
        self.tripped = false;
    }

    pub fn is_armed(&self) -> bool {
        self.state.is_some()
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped
    }

    pub fn state(&self) -> Option<&RiskState> {
        self.state.as_ref()
    }

    /// Record the latest balance and decide whether trading may continue
    pub fn check(&mut self, current_balance: f64) -> RiskDecision {
        let Some(state) = self.state.as_mut() else {
            tracing::warn!("Risk check on an unarmed monitor");
            return RiskDecision::Stop;
        };
        state.current_balance = current_balance;

        if self.tripped {
            return RiskDecision::Stop;
        }

        if state.limit_breached() {
            self.tripped = true;
            tracing::warn!(
                baseline = state.baseline_balance,
                current = current_balance,
                drawdown_pct = ?state.drawdown_pct(),
                limit_pct = state.limit_percent,
                "🛑 Stop-loss reached"
            );
            return RiskDecision::Stop;
        }

        RiskDecision::Continue
    }
}
