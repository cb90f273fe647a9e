pub mod backtest;
pub mod lifecycle;
pub mod log;
pub mod worker;

pub use backtest::{fetch_and_run, run_reverse, MIN_LOOKBACK};
pub use lifecycle::{Engine, EngineHandle};
pub use log::SignalLog;

#[cfg(test)]
pub(crate) mod testutil;
