//! Pure series transforms over an ordered price/volume slice.
//!
//! Every function returns a series aligned by position to its input; entries
//! inside an indicator's warm-up region are `None`. None of them look ahead:
//! the value at position `i` depends only on inputs at or before `i`.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use bollinger::{bollinger, BandSeries};
pub use ema::ema;
pub use macd::{macd, MacdSeries};
pub use rsi::rsi;
pub use sma::sma;
