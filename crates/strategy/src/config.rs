use serde::{Deserialize, Serialize};

use common::{Error, Result, Timeframe};

/// Strategy parameters. Immutable during a cycle: the worker snapshots the
/// shared config at cycle start, so an edit between cycles takes effect on
/// the next cycle, never mid-evaluation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Short EMA lookback.
    pub ema_short: usize,
    /// Long EMA lookback.
    pub ema_long: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    /// Bollinger band lookback and width in standard deviations.
    pub bands_period: usize,
    pub bands_width: f64,
    /// Volume must exceed its 10-candle average times this factor.
    pub vol_multiplier: f64,
    /// Minimum EMA gap, in percent of the long EMA, for a clear trend.
    pub trend_threshold_pct: f64,
    pub tp_percent: f64,
    pub sl_percent: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            ema_short: 20,
            ema_long: 50,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bands_period: 20,
            bands_width: 2.0,
            vol_multiplier: 1.3,
            trend_threshold_pct: 0.15,
            tp_percent: 0.5,
            sl_percent: 0.25,
        }
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.ema_short < 1 || self.ema_long < 1 {
            return Err(Error::Config("EMA lookbacks must be at least 1".into()));
        }
        if self.ema_short >= self.ema_long {
            return Err(Error::Config(format!(
                "short EMA lookback ({}) must be below long EMA lookback ({})",
                self.ema_short, self.ema_long
            )));
        }
        if self.rsi_period < 2 {
            return Err(Error::Config("RSI period must be at least 2".into()));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(Error::Config(format!(
                "MACD fast period ({}) must be below slow period ({})",
                self.macd_fast, self.macd_slow
            )));
        }
        if self.macd_signal < 1 {
            return Err(Error::Config("MACD signal period must be at least 1".into()));
        }
        if self.bands_period < 2 {
            return Err(Error::Config("band lookback must be at least 2".into()));
        }
        for (name, value) in [
            ("bands_width", self.bands_width),
            ("vol_multiplier", self.vol_multiplier),
            ("trend_threshold_pct", self.trend_threshold_pct),
            ("tp_percent", self.tp_percent),
            ("sl_percent", self.sl_percent),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::Config(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Which indicator families the pipeline computes. The evaluator needs the
/// EMA pair, RSI and MACD to fire; disabling one of those silences signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EnabledIndicators {
    pub ema: bool,
    pub rsi: bool,
    pub macd: bool,
    pub bands: bool,
}

impl Default for EnabledIndicators {
    fn default() -> Self {
        Self {
            ema: true,
            rsi: true,
            macd: true,
            bands: true,
        }
    }
}

/// Engine configuration file (TOML).
///
/// Example `config/strategy.toml`:
/// ```toml
/// symbol = "BTCUSDT"
/// timeframe = "1m"
/// candle_limit = 300
/// reverse_mode = false
///
/// [indicators]
/// bands = false
///
/// [strategy]
/// ema_short = 20
/// ema_long = 50
/// tp_percent = 0.5
/// sl_percent = 0.25
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Candles fetched per cycle.
    pub candle_limit: usize,
    /// When set, each cycle replays the fetched window in reverse instead of
    /// evaluating the live edge.
    pub reverse_mode: bool,
    pub indicators: EnabledIndicators,
    pub strategy: StrategyConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            timeframe: Timeframe::M1,
            candle_limit: 300,
            reverse_mode: false,
            indicators: EnabledIndicators::default(),
            strategy: StrategyConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load from a TOML file. Invalid input is surfaced to the caller as
    /// `Error::Config`; the engine must not start on a bad configuration.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read '{path}': {e}")))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse '{path}': {e}")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(Error::Config("symbol must not be empty".into()));
        }
        if self.candle_limit < self.strategy.ema_long {
            return Err(Error::Config(format!(
                "candle_limit ({}) is below the long EMA lookback ({})",
                self.candle_limit, self.strategy.ema_long
            )));
        }
        self.strategy.validate()
    }
}
