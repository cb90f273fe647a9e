use common::Candle;

use crate::config::{EnabledIndicators, StrategyConfig};
use crate::indicators::{bollinger, ema, macd, rsi, sma, BandSeries, MacdSeries};

/// Rolling window of the volume average used by the volume filter.
pub const VOL_AVG_PERIOD: usize = 10;

/// Indicator values aligned by position to the window they were computed
/// from. Disabled indicator families are absent; windowed indicators are
/// `None` inside their warm-up region.
///
/// Every series uses only candles at or before its position. That property
/// makes reverse replays valid: evaluating a prefix gives exactly the values
/// that were available at that point of the replay.
#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    len: usize,
    ema_short: Option<Vec<f64>>,
    ema_long: Option<Vec<f64>>,
    rsi: Option<Vec<Option<f64>>>,
    macd: Option<MacdSeries>,
    bands: Option<BandSeries>,
    vol_avg: Vec<Option<f64>>,
}

impl IndicatorFrame {
    /// Run the enabled subset of the indicator library over a window.
    /// The volume average is always computed; the evaluator's volume filter
    /// is not optional.
    pub fn compute(
        window: &[Candle],
        cfg: &StrategyConfig,
        enabled: &EnabledIndicators,
    ) -> Self {
        let closes: Vec<f64> = window.iter().map(|c| c.close).collect();
        let volumes: Vec<f64> = window.iter().map(|c| c.volume).collect();

        Self {
            len: window.len(),
            ema_short: enabled.ema.then(|| ema(&closes, cfg.ema_short)),
            ema_long: enabled.ema.then(|| ema(&closes, cfg.ema_long)),
            rsi: enabled.rsi.then(|| rsi(&closes, cfg.rsi_period)),
            macd: enabled
                .macd
                .then(|| macd(&closes, cfg.macd_fast, cfg.macd_slow, cfg.macd_signal)),
            bands: enabled
                .bands
                .then(|| bollinger(&closes, cfg.bands_period, cfg.bands_width)),
            vol_avg: sma(&volumes, VOL_AVG_PERIOD),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn ema_short_at(&self, i: usize) -> Option<f64> {
        self.ema_short.as_ref().and_then(|s| s.get(i).copied())
    }

    pub fn ema_long_at(&self, i: usize) -> Option<f64> {
        self.ema_long.as_ref().and_then(|s| s.get(i).copied())
    }

    pub fn rsi_at(&self, i: usize) -> Option<f64> {
        self.rsi.as_ref().and_then(|s| s.get(i).copied().flatten())
    }

    /// `(macd, signal, histogram)` at a position.
    pub fn macd_at(&self, i: usize) -> Option<(f64, f64, f64)> {
        let series = self.macd.as_ref()?;
        Some((
            *series.macd.get(i)?,
            *series.signal.get(i)?,
            *series.histogram.get(i)?,
        ))
    }

    /// `(upper, middle, lower)` at a position.
    pub fn bands_at(&self, i: usize) -> Option<(f64, f64, f64)> {
        let series = self.bands.as_ref()?;
        Some((
            (*series.upper.get(i)?)?,
            (*series.middle.get(i)?)?,
            (*series.lower.get(i)?)?,
        ))
    }

    pub fn vol_avg_at(&self, i: usize) -> Option<f64> {
        self.vol_avg.get(i).copied().flatten()
    }

    /// Frame with explicit series values, bypassing computation.
    /// Evaluator tests use this to pin indicator states exactly.
    #[cfg(test)]
    pub(crate) fn from_parts(
        len: usize,
        ema_short: Option<Vec<f64>>,
        ema_long: Option<Vec<f64>>,
        rsi: Option<Vec<Option<f64>>>,
        macd: Option<MacdSeries>,
        vol_avg: Vec<Option<f64>>,
    ) -> Self {
        Self {
            len,
            ema_short,
            ema_long,
            rsi,
            macd,
            bands: None,
            vol_avg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{flat_window, window_from_closes};

    #[test]
    fn disabled_indicators_are_absent() {
        let window = flat_window(60, 100.0, 5.0);
        let cfg = StrategyConfig::default();
        let enabled = EnabledIndicators {
            ema: false,
            rsi: false,
            macd: false,
            bands: false,
        };
        let frame = IndicatorFrame::compute(&window, &cfg, &enabled);
        let last = window.len() - 1;
        assert!(frame.ema_short_at(last).is_none());
        assert!(frame.rsi_at(last).is_none());
        assert!(frame.macd_at(last).is_none());
        assert!(frame.bands_at(last).is_none());
        // The volume average is unconditional.
        assert_eq!(frame.vol_avg_at(last), Some(5.0));
    }

    #[test]
    fn enabled_indicators_defined_after_warmup() {
        let window = flat_window(60, 100.0, 5.0);
        let cfg = StrategyConfig::default();
        let frame = IndicatorFrame::compute(&window, &cfg, &EnabledIndicators::default());
        let last = window.len() - 1;
        assert_eq!(frame.ema_short_at(last), Some(100.0));
        assert_eq!(frame.ema_long_at(last), Some(100.0));
        assert_eq!(frame.rsi_at(last), Some(50.0));
        assert_eq!(frame.macd_at(last), Some((0.0, 0.0, 0.0)));
        assert_eq!(frame.bands_at(last), Some((100.0, 100.0, 100.0)));
    }

    #[test]
    fn warmup_positions_read_none() {
        let window = flat_window(60, 100.0, 5.0);
        let cfg = StrategyConfig::default();
        let frame = IndicatorFrame::compute(&window, &cfg, &EnabledIndicators::default());
        assert!(frame.rsi_at(cfg.rsi_period - 1).is_none());
        assert!(frame.bands_at(cfg.bands_period - 2).is_none());
        assert!(frame.vol_avg_at(VOL_AVG_PERIOD - 2).is_none());
        // EMAs have no warm-up region.
        assert!(frame.ema_short_at(0).is_some());
    }

    #[test]
    fn no_look_ahead_under_tail_perturbation() {
        // Changing candles after position i must not change any value at or
        // before i. This is the invariant that makes reverse replays valid.
        let mut closes: Vec<f64> = (0..80)
            .map(|i| 100.0 + ((i * 31) % 17) as f64 * 0.3)
            .collect();
        let cfg = StrategyConfig::default();
        let enabled = EnabledIndicators::default();

        let base = IndicatorFrame::compute(&window_from_closes(&closes), &cfg, &enabled);
        closes[70] += 250.0;
        closes[75] = 1.0;
        let perturbed = IndicatorFrame::compute(&window_from_closes(&closes), &cfg, &enabled);

        for i in 0..=69 {
            assert_eq!(base.ema_short_at(i), perturbed.ema_short_at(i), "ema at {i}");
            assert_eq!(base.ema_long_at(i), perturbed.ema_long_at(i));
            assert_eq!(base.rsi_at(i), perturbed.rsi_at(i), "rsi at {i}");
            assert_eq!(base.macd_at(i), perturbed.macd_at(i), "macd at {i}");
            assert_eq!(base.bands_at(i), perturbed.bands_at(i), "bands at {i}");
        }
    }

    #[test]
    fn prefix_computation_matches_full_window() {
        // The frame over a prefix equals the prefix of the frame over the
        // full window — same invariant stated the way the backtest uses it.
        let closes: Vec<f64> = (0..70)
            .map(|i| 200.0 - ((i * 7) % 23) as f64 * 0.5)
            .collect();
        let cfg = StrategyConfig::default();
        let enabled = EnabledIndicators::default();
        let window = window_from_closes(&closes);

        let full = IndicatorFrame::compute(&window, &cfg, &enabled);
        for cut in [35, 50, 69] {
            let partial = IndicatorFrame::compute(&window[..cut], &cfg, &enabled);
            for i in 0..cut {
                assert_eq!(full.rsi_at(i), partial.rsi_at(i));
                assert_eq!(full.macd_at(i), partial.macd_at(i));
                assert_eq!(full.vol_avg_at(i), partial.vol_avg_at(i));
            }
        }
    }
}
