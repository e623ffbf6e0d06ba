// Technical indicators module
// Implements SMA and RSI plus the snapshot the signal rule reads

pub mod moving_average;
pub mod rsi;
pub mod snapshot;

pub use moving_average::calculate_sma;
pub use rsi::calculate_rsi;
pub use snapshot::{IndicatorEngine, IndicatorError, IndicatorSnapshot, IndicatorWindows};
