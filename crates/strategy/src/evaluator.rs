use common::{Candle, Direction, SignalEvent, Timeframe};

use crate::config::StrategyConfig;
use crate::pipeline::IndicatorFrame;

/// Minimum window length before any signal can fire.
pub const MIN_CANDLES: usize = 15;

/// Multi-factor confirmation over the latest row of an indicator-augmented
/// window. Every sub-condition must hold — there is no partial or weighted
/// scoring. LONG is checked first; the EMA ordering makes LONG and SHORT
/// mutually exclusive, so at most one direction fires per call.
///
/// Returns `None` on insufficient history or when a required indicator is
/// undefined at the latest row; both are normal no-signal outcomes, not
/// errors.
pub fn evaluate(
    window: &[Candle],
    frame: &IndicatorFrame,
    cfg: &StrategyConfig,
    symbol: &str,
    timeframe: Timeframe,
) -> Option<SignalEvent> {
    if window.len() < MIN_CANDLES {
        return None;
    }
    let i = window.len() - 1;
    let latest = &window[i];

    let ema_s = frame.ema_short_at(i)?;
    let ema_l = frame.ema_long_at(i)?;
    let rsi = frame.rsi_at(i)?;
    let (macd, macd_signal, macd_hist) = frame.macd_at(i)?;

    // Volume surge: an undefined average fails the filter rather than
    // erroring out.
    let vol_avg = frame.vol_avg_at(i);
    let vol_ok = match vol_avg {
        Some(avg) => latest.volume > avg * cfg.vol_multiplier,
        None => false,
    };

    // Trend clarity: EMA gap as a percentage of the long EMA.
    let trend_pct = if ema_l != 0.0 {
        ((ema_s - ema_l) / ema_l).abs() * 100.0
    } else {
        0.0
    };
    let trend_clear = trend_pct > cfg.trend_threshold_pct;

    let macd_bull = macd > macd_signal && macd_hist > 0.0;
    let macd_bear = macd < macd_signal && macd_hist < 0.0;

    let long_ok =
        ema_s > ema_l && macd_bull && vol_ok && (45.0..=70.0).contains(&rsi) && trend_clear;
    let short_ok =
        ema_s < ema_l && macd_bear && vol_ok && (30.0..=55.0).contains(&rsi) && trend_clear;

    let direction = if long_ok {
        Direction::Long
    } else if short_ok {
        Direction::Short
    } else {
        return None;
    };

    // A firing direction implies the volume filter passed.
    let vol_avg = vol_avg?;

    Some(SignalEvent {
        direction,
        symbol: symbol.to_string(),
        timeframe,
        price: latest.close,
        ema_short: ema_s,
        ema_long: ema_l,
        rsi,
        macd,
        macd_signal,
        volume: latest.volume,
        vol_avg,
        timestamp: latest.timestamp,
    })
}
