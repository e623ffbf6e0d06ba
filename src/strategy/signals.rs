use serde::{Deserialize, Serialize};

use crate::indicators::IndicatorSnapshot;
use crate::models::Signal;

/// Oscillator thresholds for the crossover rule
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SignalConfig {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
        }
    }
}

/// Classify a snapshot into a signal
///
/// - Buy: short MA above long MA while the oscillator is oversold
/// - Sell: short MA below long MA while the oscillator is overbought
/// - Hold: everything else, including equal averages
pub fn evaluate_signal(snapshot: &IndicatorSnapshot, config: &SignalConfig) -> Signal {
    let rsi = snapshot.oscillator;

    if snapshot.short_ma > snapshot.long_ma && rsi < config.rsi_oversold {
        tracing::debug!(
            short_ma = snapshot.short_ma,
            long_ma = snapshot.long_ma,
            rsi,
            "Bullish crossover with oversold RSI"
        );
        return Signal::Buy;
    }

    if snapshot.short_ma < snapshot.long_ma && rsi > config.rsi_overbought {
        tracing::debug!(
            short_ma = snapshot.short_ma,
            long_ma = snapshot.long_ma,
            rsi,
            "Bearish crossover with overbought RSI"
        );
        return Signal::Sell;
    }

    Signal::Hold
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot(short_ma: f64, long_ma: f64, oscillator: f64) -> IndicatorSnapshot {
        IndicatorSnapshot {
            timestamp: Utc::now(),
            last_close: short_ma,
            short_ma,
            long_ma,
            oscillator,
        }
    }

    #[test]
    fn test_buy_on_bullish_crossover_oversold() {
        let signal = evaluate_signal(&snapshot(1.2050, 1.2000, 25.0), &SignalConfig::default());
        assert_eq!(signal, Signal::Buy);
    }

    #[test]
    fn test_sell_on_bearish_crossover_overbought() {
        let signal = evaluate_signal(&snapshot(1.1900, 1.2000, 75.0), &SignalConfig::default());
        assert_eq!(signal, Signal::Sell);
    }

    #[test]
    fn test_tie_holds_regardless_of_rsi() {
        let config = SignalConfig::default();
        for rsi in [0.0, 20.0, 50.0, 80.0, 100.0] {
            assert_eq!(evaluate_signal(&snapshot(1.2, 1.2, rsi), &config), Signal::Hold);
        }
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        let config = SignalConfig::default();
        assert_eq!(evaluate_signal(&snapshot(1.3, 1.2, 30.0), &config), Signal::Hold);
        assert_eq!(evaluate_signal(&snapshot(1.1, 1.2, 70.0), &config), Signal::Hold);
    }

    #[test]
    fn test_neutral_band_holds() {
        let config = SignalConfig::default();
        assert_eq!(evaluate_signal(&snapshot(1.3, 1.2, 50.0), &config), Signal::Hold);
        assert_eq!(evaluate_signal(&snapshot(1.1, 1.2, 50.0), &config), Signal::Hold);
    }

    #[test]
    fn test_crossover_and_rsi_must_agree() {
        let config = SignalConfig::default();
        // Bullish crossover but overbought
        assert_eq!(evaluate_signal(&snapshot(1.3, 1.2, 80.0), &config), Signal::Hold);
        // Bearish crossover but oversold
        assert_eq!(evaluate_signal(&snapshot(1.1, 1.2, 20.0), &config), Signal::Hold);
    }

    #[test]
    fn test_evaluation_is_pure() {
        let config = SignalConfig::default();
        let snap = snapshot(1.2050, 1.2000, 25.0);
        let first = evaluate_signal(&snap, &config);
        for _ in 0..10 {
            assert_eq!(evaluate_signal(&snap, &config), first);
        }
    }

    #[test]
    fn test_custom_thresholds() {
        let config = SignalConfig {
            rsi_oversold: 20.0,
            rsi_overbought: 80.0,
        };
        assert_eq!(evaluate_signal(&snapshot(1.3, 1.2, 25.0), &config), Signal::Hold);
        assert_eq!(evaluate_signal(&snapshot(1.3, 1.2, 15.0), &config), Signal::Buy);
    }
}
