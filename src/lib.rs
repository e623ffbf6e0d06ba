// Core modules
pub mod broker;
pub mod config;
pub mod error;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod risk;
pub mod strategy;

// Re-export commonly used types
pub use broker::{Broker, BrokerError, PaperBroker};
pub use config::{ConfigError, SessionConfig};
pub use error::{Error, Result};
pub use execution::{SessionEvent, SessionOutcome, TradingLoop};
pub use models::*;
