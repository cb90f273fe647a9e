use common::{BacktestHit, BacktestReport, Candle, MarketData, Result};
use strategy::{evaluate, EngineConfig, IndicatorFrame};

/// Smallest reversed prefix worth evaluating. Below this every enabled
/// indicator is still warming up and no prefix can fire.
pub const MIN_LOOKBACK: usize = 30;

/// Replay a historical window in reverse chronological order through the
/// live pipeline and evaluator.
///
/// Every prefix of the reversed window from `MIN_LOOKBACK` up to its full
/// length is evaluated independently; a prefix sees only its own candles,
/// so the replay is free of look-ahead by construction. Pure and strictly
/// sequential — callers that need a responsive frontend run it on a
/// separate task.
pub fn run_reverse(window: &[Candle], cfg: &EngineConfig) -> BacktestReport {
    let mut reversed = window.to_vec();
    reversed.reverse();

    let mut hits = Vec::new();
    let mut total_checks = 0;
    for end in MIN_LOOKBACK..=reversed.len() {
        let prefix = &reversed[..end];
        total_checks += 1;

        let frame = IndicatorFrame::compute(prefix, &cfg.strategy, &cfg.indicators);
        if let Some(event) = evaluate(prefix, &frame, &cfg.strategy, &cfg.symbol, cfg.timeframe) {
            hits.push(BacktestHit {
                timestamp: event.timestamp,
                direction: event.direction,
                prefix_len: end,
            });
        }
    }

    BacktestReport {
        symbol: cfg.symbol.clone(),
        total_checks,
        hits,
    }
}

/// Fetch `steps` historical candles and replay them in reverse.
pub async fn fetch_and_run(
    market: &dyn MarketData,
    cfg: &EngineConfig,
    steps: usize,
) -> Result<BacktestReport> {
    let candles = market
        .fetch_candles(&cfg.symbol, cfg.timeframe, steps)
        .await?;
    Ok(run_reverse(&candles, cfg))
}
