use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::indicators::IndicatorWindows;
use crate::models::AccountMode;
use crate::strategy::SignalConfig;

const ENV_PREFIX: &str = "OPTIONBOT";

/// Largest candle window a session may request per cycle
pub const MAX_CANDLE_COUNT: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("instrument must not be empty")]
    EmptyInstrument,
    #[error("investment amount must be positive, got {0}")]
    InvalidAmount(f64),
    #[error("stop-loss percent must be in (0, 100], got {0}")]
    InvalidStopLoss(f64),
    #[error("{0} must be positive")]
    ZeroValue(&'static str),
    #[error("oversold threshold {oversold} must be below overbought {overbought}, both within [0, 100]")]
    InvalidThresholds { oversold: f64, overbought: f64 },
    #[error("candle count {count} exceeds the maximum of {max}")]
    CandleCountTooLarge { count: usize, max: usize },
    #[error("baseline balance must be positive, got {0}")]
    InvalidBaseline(f64),
    #[error("failed to load configuration: {0}")]
    Load(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(e: config::ConfigError) -> Self {
        ConfigError::Load(e.to_string())
    }
}

/// Everything a trading session needs, validated before a session is armed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub instrument: String,
    pub account_mode: AccountMode,
    /// Stake per trade
    pub investment_amount: f64,
    /// Drawdown from the session baseline that halts trading
    pub stop_loss_percent: f64,
    pub poll_interval_secs: u64,
    pub candle_timeframe_secs: u64,
    /// Sliding window length fetched each cycle
    pub candle_count: usize,
    pub expiry_minutes: u32,
    pub indicators: IndicatorWindows,
    pub signal: SignalConfig,
    /// Cycles during which a repeated same-direction trade is suppressed (0 = re-fire every cycle)
    pub trade_cooldown_cycles: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            instrument: "EURUSD".to_string(),
            account_mode: AccountMode::Practice,
            investment_amount: 10.0,
            stop_loss_percent: 10.0,
            poll_interval_secs: 60,
            candle_timeframe_secs: 60,
            candle_count: 100,
            expiry_minutes: 1,
            indicators: IndicatorWindows::default(),
            signal: SignalConfig::default(),
            trade_cooldown_cycles: 0,
        }
    }
}

impl SessionConfig {
    /// Layer defaults, an optional TOML file and `OPTIONBOT__*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        } else {
            builder = builder.add_source(config::File::with_name("optionbot").required(false));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let config: SessionConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make a session meaningless; nothing is clamped
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instrument.trim().is_empty() {
            return Err(ConfigError::EmptyInstrument);
        }
        if !(self.investment_amount > 0.0) || !self.investment_amount.is_finite() {
            return Err(ConfigError::InvalidAmount(self.investment_amount));
        }
        if !(self.stop_loss_percent > 0.0 && self.stop_loss_percent <= 100.0) {
            return Err(ConfigError::InvalidStopLoss(self.stop_loss_percent));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::ZeroValue("poll interval"));
        }
        if self.candle_timeframe_secs == 0 {
            return Err(ConfigError::ZeroValue("candle timeframe"));
        }
        if self.candle_count == 0 {
            return Err(ConfigError::ZeroValue("candle count"));
        }
        if self.candle_count > MAX_CANDLE_COUNT {
            return Err(ConfigError::CandleCountTooLarge {
                count: self.candle_count,
                max: MAX_CANDLE_COUNT,
            });
        }
        if self.expiry_minutes == 0 {
            return Err(ConfigError::ZeroValue("expiry"));
        }
        if self.indicators.short_ma == 0 {
            return Err(ConfigError::ZeroValue("short moving average window"));
        }
        if self.indicators.long_ma == 0 {
            return Err(ConfigError::ZeroValue("long moving average window"));
        }
        if self.indicators.oscillator == 0 {
            return Err(ConfigError::ZeroValue("oscillator window"));
        }

        let SignalConfig {
            rsi_oversold,
            rsi_overbought,
        } = self.signal;
        if !(0.0..=100.0).contains(&rsi_oversold)
            || !(0.0..=100.0).contains(&rsi_overbought)
            || rsi_oversold >= rsi_overbought
        {
            return Err(ConfigError::InvalidThresholds {
                oversold: rsi_oversold,
                overbought: rsi_overbought,
            });
        }

        if self.candle_count < self.indicators.required() {
            tracing::warn!(
                candle_count = self.candle_count,
                required = self.indicators.required(),
                "Candle window shorter than the indicators need; every cycle will hold"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_is_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.candle_count, 100);
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.indicators.short_ma, 10);
        assert_eq!(config.indicators.long_ma, 50);
        assert_eq!(config.indicators.oscillator, 14);
    }

    #[test]
    fn test_rejects_non_positive_amount() {
        for amount in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let config = SessionConfig {
                investment_amount: amount,
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidAmount(_))
            ));
        }
    }

    #[test]
    fn test_stop_loss_bounds() {
        for (pct, ok) in [(0.0, false), (-1.0, false), (0.5, true), (100.0, true), (100.1, false)] {
            let config = SessionConfig {
                stop_loss_percent: pct,
                ..Default::default()
            };
            assert_eq!(config.validate().is_ok(), ok, "stop loss {pct}");
        }
    }

    #[test]
    fn test_rejects_zero_windows() {
        let mut config = SessionConfig::default();
        config.indicators.oscillator = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroValue("oscillator window"))
        );
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let mut config = SessionConfig::default();
        config.signal.rsi_oversold = 75.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThresholds { .. })
        ));
    }

    #[test]
    fn test_candle_count_bounds() {
        for (count, ok) in [(1, true), (MAX_CANDLE_COUNT, true), (MAX_CANDLE_COUNT + 1, false)] {
            let config = SessionConfig {
                candle_count: count,
                ..Default::default()
            };
            assert_eq!(config.validate().is_ok(), ok, "candle count {count}");
        }

        let config = SessionConfig {
            candle_count: usize::MAX / 2,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CandleCountTooLarge { .. })
        ));
    }

    #[test]
    fn test_rejects_empty_instrument() {
        let config = SessionConfig {
            instrument: "  ".to_string(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyInstrument));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("optionbot-{}.toml", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
instrument = "GBPUSD"
account_mode = "practice"
investment_amount = 25.0
stop_loss_percent = 5.0
trade_cooldown_cycles = 3

[indicators]
short_ma = 5
"#
        )
        .unwrap();

        let config = SessionConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.instrument, "GBPUSD");
        assert_eq!(config.investment_amount, 25.0);
        assert_eq!(config.stop_loss_percent, 5.0);
        assert_eq!(config.trade_cooldown_cycles, 3);
        assert_eq!(config.indicators.short_ma, 5);
        // Unset values keep their defaults
        assert_eq!(config.indicators.long_ma, 50);
        assert_eq!(config.poll_interval_secs, 60);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let path = std::env::temp_dir().join(format!("optionbot-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "stop_loss_percent = 150.0\n").unwrap();

        let result = SessionConfig::load(Some(&path));
        std::fs::remove_file(&path).ok();

        assert_eq!(result, Err(ConfigError::InvalidStopLoss(150.0)));
    }
}
