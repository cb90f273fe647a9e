use async_trait::async_trait;

use crate::{Candle, Result, Timeframe};

/// Abstraction over the market-data provider.
///
/// `BitgetClient` in `crates/market` implements this for live data; engine
/// tests use a scripted double. Both the scheduling loop and the backtest
/// runner consume candles only through this trait.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Fetch the `limit` most recent closed candles for a pair, in ascending
    /// timestamp order. Implementations may return fewer than `limit`
    /// candles when the exchange has less history, never more.
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>>;
}
