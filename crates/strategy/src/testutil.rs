//! Window builders shared by the strategy tests.

use chrono::{Duration, TimeZone, Utc};

use common::Candle;

/// Candles spaced one minute apart, with the given closes and volumes.
pub fn window_with(closes: &[f64], volumes: &[f64]) -> Vec<Candle> {
    assert_eq!(closes.len(), volumes.len());
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&close, &volume))| Candle {
            timestamp: start + Duration::minutes(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume,
        })
        .collect()
}

pub fn window_from_closes(closes: &[f64]) -> Vec<Candle> {
    window_with(closes, &vec![5.0; closes.len()])
}

pub fn flat_window(len: usize, close: f64, volume: f64) -> Vec<Candle> {
    window_with(&vec![close; len], &vec![volume; len])
}

/// Closes that satisfy every LONG condition at the last position under
/// `long_scenario_config()`: a flat base, a moderate up-zigzag that keeps
/// RSI inside its band, then two straight gains that pull the MACD line
/// above its signal line.
pub fn long_scenario_closes() -> Vec<f64> {
    let mut closes = vec![100.0; 20];
    let mut last = 100.0;
    for i in 0..14 {
        last += if i % 2 == 0 { 1.6 } else { -1.2 };
        closes.push(last);
    }
    for _ in 0..2 {
        last += 1.6;
        closes.push(last);
    }
    closes
}

/// Mirror image of `long_scenario_closes()` around 100: satisfies every
/// SHORT condition at the last position.
pub fn short_scenario_closes() -> Vec<f64> {
    long_scenario_closes()
        .into_iter()
        .map(|c| 200.0 - c)
        .collect()
}

/// Flat volume except a spike on the final candle, tripping the surge filter.
pub fn spiked_volumes(len: usize) -> Vec<f64> {
    let mut volumes = vec![5.0; len];
    if let Some(last) = volumes.last_mut() {
        *last = 20.0;
    }
    volumes
}

/// Short lookbacks so the scenario windows stay hand-checkable.
pub fn long_scenario_config() -> crate::StrategyConfig {
    crate::StrategyConfig {
        ema_short: 3,
        ema_long: 10,
        rsi_period: 14,
        macd_fast: 3,
        macd_slow: 8,
        macd_signal: 5,
        ..crate::StrategyConfig::default()
    }
}
