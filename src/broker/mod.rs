// Broker connectivity seam
pub mod paper;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Candle, TradeId, TradeRecord, TradeRequest};

pub use paper::PaperBroker;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BrokerError {
    #[error("broker connection failed: {0}")]
    Connection(String),
    #[error("market data unavailable: {0}")]
    DataUnavailable(String),
    #[error("order rejected: {0}")]
    RejectedOrder(String),
}

/// Capabilities the trading loop needs from a broker
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Broker: Send + Sync {
    /// Up to `count` chronological candles of `timeframe_secs` ending at `as_of`
    async fn get_candles(
        &self,
        instrument: &str,
        timeframe_secs: u64,
        count: usize,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<Candle>, BrokerError>;

    /// Current account balance
    async fn get_balance(&self) -> Result<f64, BrokerError>;

    /// Open a binary option trade
    async fn place_trade(&self, request: &TradeRequest) -> Result<TradeId, BrokerError>;

    /// Most recent trades, newest first
    async fn recent_trades(&self, count: usize) -> Result<Vec<TradeRecord>, BrokerError>;
}
