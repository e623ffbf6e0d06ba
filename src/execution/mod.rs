// Order execution and session loop module
pub mod candle_window;
pub mod executor;
pub mod ticker;
pub mod trading_loop;

pub use candle_window::CandleWindow;
pub use executor::{ExecutionAction, ExecutionDecision, Executor};
pub use ticker::{ChannelTicker, IntervalTicker, Ticker};
pub use trading_loop::{
    CycleOutcome, CycleReport, LoopState, ManualReport, SessionEvent, SessionOutcome,
    TradeAction, TradingLoop,
};
