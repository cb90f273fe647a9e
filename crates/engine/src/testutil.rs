//! Fixtures shared by the engine tests: candle builders and a scripted
//! in-memory market-data double.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};

use common::{Candle, Error, MarketData, Result, Timeframe};
use strategy::{EngineConfig, StrategyConfig};

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

/// Window that satisfies every LONG condition at its last candle under
/// `scenario_config()`: flat base, moderate up-zigzag, two straight gains,
/// volume spike on the final candle.
pub fn long_scenario_candles() -> Vec<Candle> {
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
    let mut volumes = vec![5.0; closes.len()];
    *volumes.last_mut().unwrap() = 20.0;
    window_with(&closes, &volumes)
}

pub fn scenario_config() -> EngineConfig {
    EngineConfig {
        candle_limit: 36,
        strategy: StrategyConfig {
            ema_short: 3,
            ema_long: 10,
            rsi_period: 14,
            macd_fast: 3,
            macd_slow: 8,
            macd_signal: 5,
            ..StrategyConfig::default()
        },
        ..EngineConfig::default()
    }
}

/// Market-data double that serves a fixed window and counts fetches.
/// An empty script simulates a provider outage.
pub struct ScriptedMarket {
    candles: Mutex<Vec<Candle>>,
    calls: AtomicUsize,
    fail: bool,
}

impl ScriptedMarket {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self {
            candles: Mutex::new(candles),
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            candles: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketData for ScriptedMarket {
    async fn fetch_candles(
        &self,
        _symbol: &str,
        _timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Exchange("scripted outage".into()));
        }
        let candles = self.candles.lock().unwrap();
        let skip = candles.len().saturating_sub(limit);
        Ok(candles[skip..].to_vec())
    }
}
