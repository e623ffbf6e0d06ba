// Trading strategy module
pub mod crossover;
pub mod signals;

pub use crossover::{CrossoverStrategy, MarketAnalysis};
pub use signals::{evaluate_signal, SignalConfig};
