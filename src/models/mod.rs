use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// OHLC candlestick for one instrument
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    /// Flat candle where every price equals `price`
    pub fn flat(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self {
            timestamp,
            open: price,
            high: price,
            low: price,
            close: price,
        }
    }
}

/// Trading signal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    /// Direction a trade would take for this signal, `None` for Hold
    pub fn direction(self) -> Option<Direction> {
        match self {
            Signal::Buy => Some(Direction::Buy),
            Signal::Sell => Some(Direction::Sell),
            Signal::Hold => None,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY (call)"),
            Signal::Sell => write!(f, "SELL (put)"),
            Signal::Hold => write!(f, "HOLD"),
        }
    }
}

/// Side of a binary option trade
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Direction {
    Buy,
    Sell,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "call"),
            Direction::Sell => write!(f, "put"),
        }
    }
}

/// Account the broker trades against
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountMode {
    #[default]
    Practice,
    Real,
}

/// Order sent to the broker when a signal fires
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeRequest {
    pub instrument: String,
    pub direction: Direction,
    pub amount: f64,
    pub expiry_minutes: u32,
}

/// Broker-assigned identifier of a placed trade
pub type TradeId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TradeOutcome {
    Open,
    Win,
    Loss,
    /// Expired at the entry price, stake refunded
    Draw,
}

/// Historical trade as reported by the broker (display only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: Uuid,
    pub instrument: String,
    pub direction: Direction,
    pub amount: f64,
    pub expiry_minutes: u32,
    pub opened_at: DateTime<Utc>,
    pub outcome: TradeOutcome,
    pub profit: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_direction() {
        assert_eq!(Signal::Buy.direction(), Some(Direction::Buy));
        assert_eq!(Signal::Sell.direction(), Some(Direction::Sell));
        assert_eq!(Signal::Hold.direction(), None);
    }

    #[test]
    fn test_flat_candle() {
        let candle = Candle::flat(Utc::now(), 1.25);
        assert_eq!(candle.open, 1.25);
        assert_eq!(candle.high, 1.25);
        assert_eq!(candle.low, 1.25);
        assert_eq!(candle.close, 1.25);
    }

    #[test]
    fn test_account_mode_serde() {
        let mode: AccountMode = serde_json::from_str("\"real\"").unwrap();
        assert_eq!(mode, AccountMode::Real);
        assert_eq!(AccountMode::default(), AccountMode::Practice);
    }
}
