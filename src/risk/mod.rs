// Risk management module
pub mod drawdown;

pub use drawdown::{RiskDecision, RiskMonitor, RiskState};
