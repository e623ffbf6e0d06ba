use thiserror::Error;

use crate::broker::BrokerError;
use crate::config::ConfigError;
use crate::execution::LoopState;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Broker(#[from] BrokerError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("trading loop is {0:?}; arm a session first")]
    NotArmed(LoopState),
    #[error("session stopped by the stop-loss; re-arm to resume")]
    SessionStopped,
}

pub type Result<T> = std::result::Result<T, Error>;
