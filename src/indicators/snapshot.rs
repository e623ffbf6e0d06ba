use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{calculate_rsi, calculate_sma};
use crate::models::Candle;

/// Lookback lengths for the indicators feeding the signal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IndicatorWindows {
    pub short_ma: usize,
    pub long_ma: usize,
    pub oscillator: usize,
}

impl Default for IndicatorWindows {
    fn default() -> Self {
        Self {
            short_ma: 10,
            long_ma: 50,
            oscillator: 14,
        }
    }
}

impl IndicatorWindows {
    /// Closes needed before every indicator is defined
    ///
    /// The oscillator works on close-to-close changes, so it needs one more
    /// close than its window.
    pub fn required(&self) -> usize {
        self.short_ma.max(self.long_ma).max(self.oscillator + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndicatorError {
    #[error("insufficient data for {indicator}: {available} closes, need {required}")]
    InsufficientData {
        indicator: &'static str,
        required: usize,
        available: usize,
    },
    #[error("oscillator undefined on a flat series")]
    FlatSeries,
}

/// Indicator values at the latest candle of a window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct IndicatorSnapshot {
    pub timestamp: DateTime<Utc>,
    pub last_close: f64,
    pub short_ma: f64,
    pub long_ma: f64,
    pub oscillator: f64,
}

/// Computes indicator snapshots from candle windows
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicatorEngine {
    windows: IndicatorWindows,
}

impl IndicatorEngine {
    pub fn new(windows: IndicatorWindows) -> Self {
        Self { windows }
    }

    pub fn windows(&self) -> &IndicatorWindows {
        &self.windows
    }

    /// Compute the snapshot for the most recent candle
    pub fn snapshot(&self, candles: &[Candle]) -> Result<IndicatorSnapshot, IndicatorError> {
        let latest = candles.last().ok_or(IndicatorError::InsufficientData {
            indicator: "window",
            required: self.windows.required(),
            available: 0,
        })?;

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let available = closes.len();

        let short_ma = calculate_sma(&closes, self.windows.short_ma).ok_or(
            IndicatorError::InsufficientData {
                indicator: "short moving average",
                required: self.windows.short_ma,
                available,
            },
        )?;
        let long_ma = calculate_sma(&closes, self.windows.long_ma).ok_or(
            IndicatorError::InsufficientData {
                indicator: "long moving average",
                required: self.windows.long_ma,
                available,
            },
        )?;

        if available < self.windows.oscillator + 1 {
            return Err(IndicatorError::InsufficientData {
                indicator: "oscillator",
                required: self.windows.oscillator + 1,
                available,
            });
        }
        let oscillator =
            calculate_rsi(&closes, self.windows.oscillator).ok_or(IndicatorError::FlatSeries)?;

        Ok(IndicatorSnapshot {
            timestamp: latest.timestamp,
            last_close: latest.close,
            short_ma,
            long_ma,
            oscillator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn candles_from(closes: &[f64]) -> Vec<Candle> {
        let start = Utc::now() - Duration::minutes(closes.len() as i64);
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle::flat(start + Duration::minutes(i as i64), close))
            .collect()
    }

    #[test]
    fn test_required_points() {
        assert_eq!(IndicatorWindows::default().required(), 50);

        let windows = IndicatorWindows {
            short_ma: 3,
            long_ma: 5,
            oscillator: 14,
        };
        assert_eq!(windows.required(), 15);
    }

    #[test]
    fn test_snapshot_insufficient_data() {
        let engine = IndicatorEngine::default();
        let closes: Vec<f64> = (0..49).map(|i| 1.0 + i as f64 * 0.001).collect();

        let err = engine.snapshot(&candles_from(&closes)).unwrap_err();
        assert!(matches!(
            err,
            IndicatorError::InsufficientData {
                required: 50,
                available: 49,
                ..
            }
        ));
    }

    #[test]
    fn test_snapshot_empty_window() {
        let engine = IndicatorEngine::default();
        let err = engine.snapshot(&[]).unwrap_err();
        assert!(matches!(
            err,
            IndicatorError::InsufficientData { available: 0, .. }
        ));
    }

    #[test]
    fn test_snapshot_oscillator_needs_extra_close() {
        let engine = IndicatorEngine::new(IndicatorWindows {
            short_ma: 2,
            long_ma: 4,
            oscillator: 4,
        });
        let err = engine
            .snapshot(&candles_from(&[1.0, 2.0, 1.5, 2.5]))
            .unwrap_err();
        assert!(matches!(
            err,
            IndicatorError::InsufficientData {
                indicator: "oscillator",
                ..
            }
        ));

        assert!(engine
            .snapshot(&candles_from(&[1.0, 2.0, 1.5, 2.5, 2.0]))
            .is_ok());
    }

    #[test]
    fn test_snapshot_flat_series() {
        let engine = IndicatorEngine::default();
        let err = engine.snapshot(&candles_from(&[1.2; 100])).unwrap_err();
        assert_eq!(err, IndicatorError::FlatSeries);
    }

    #[test]
    fn test_snapshot_values() {
        let engine = IndicatorEngine::new(IndicatorWindows {
            short_ma: 2,
            long_ma: 4,
            oscillator: 3,
        });
        let candles = candles_from(&[10.0, 11.0, 12.0, 11.0]);
        let snapshot = engine.snapshot(&candles).unwrap();

        assert_eq!(snapshot.last_close, 11.0);
        assert_eq!(snapshot.timestamp, candles[3].timestamp);
        assert_eq!(snapshot.short_ma, 11.5);
        assert_eq!(snapshot.long_ma, 11.0);
        assert!((snapshot.oscillator - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_uptrend_is_overbought() {
        let engine = IndicatorEngine::default();
        let closes: Vec<f64> = (0..100).map(|i| 1.1 + i as f64 * 0.001).collect();
        let snapshot = engine.snapshot(&candles_from(&closes)).unwrap();

        assert!(snapshot.short_ma > snapshot.long_ma);
        assert_eq!(snapshot.oscillator, 100.0);
    }
}
