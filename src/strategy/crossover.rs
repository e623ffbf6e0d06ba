use super::signals::{evaluate_signal, SignalConfig};
use crate::indicators::{IndicatorEngine, IndicatorError, IndicatorSnapshot, IndicatorWindows};
use crate::models::{Candle, Signal};

/// Result of analyzing one candle window
#[derive(Debug, Clone, PartialEq)]
pub struct MarketAnalysis {
    /// `None` when the indicators are undefined for this window
    pub snapshot: Option<IndicatorSnapshot>,
    pub signal: Signal,
    /// Why the snapshot is missing, if it is
    pub skipped: Option<IndicatorError>,
}

/// Moving average crossover confirmed by RSI extremes
///
/// Trend direction comes from the short/long SMA pair, entry timing from the
/// oscillator being oversold (for longs) or overbought (for shorts).
#[derive(Debug, Clone, Default)]
pub struct CrossoverStrategy {
    engine: IndicatorEngine,
    config: SignalConfig,
}

impl CrossoverStrategy {
    pub fn new(windows: IndicatorWindows, config: SignalConfig) -> Self {
        Self {
            engine: IndicatorEngine::new(windows),
            config,
        }
    }

    pub fn name(&self) -> &str {
        "SmaRsiCrossover"
    }

    /// Minimum candles before a signal can be produced
    pub fn min_candles_required(&self) -> usize {
        self.engine.windows().required()
    }

    /// Analyze a window, degrading to Hold when indicators are undefined
    pub fn analyze(&self, candles: &[Candle]) -> MarketAnalysis {
        match self.engine.snapshot(candles) {
            Ok(snapshot) => MarketAnalysis {
                signal: evaluate_signal(&snapshot, &self.config),
                snapshot: Some(snapshot),
                skipped: None,
            },
            Err(e) => {
                tracing::info!(strategy = self.name(), "Holding: {}", e);
                MarketAnalysis {
                    snapshot: None,
                    signal: Signal::Hold,
                    skipped: Some(e),
                }
            }
        }
    }
}
