use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// One closed OHLCV candle for a fixed time bucket.
/// Candles are immutable once fetched; forward-mode windows are ordered by
/// strictly increasing timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Close time of the bucket.
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Candle bucket duration supported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
}

impl Timeframe {
    pub fn secs(&self) -> u64 {
        match self {
            Timeframe::M1 => 60,
            Timeframe::M5 => 300,
            Timeframe::M15 => 900,
            Timeframe::H1 => 3_600,
        }
    }

    /// Seconds of wall-clock time remaining until the current bucket closes.
    /// Always in `1..=secs()`: exactly on a boundary means a full bucket ahead.
    pub fn secs_until_next_close(&self) -> u64 {
        let secs = self.secs() as i64;
        let now = Utc::now().timestamp();
        (secs - now.rem_euclid(secs)) as u64
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Timeframe::M1 => write!(f, "1m"),
            Timeframe::M5 => write!(f, "5m"),
            Timeframe::M15 => write!(f, "15m"),
            Timeframe::H1 => write!(f, "1h"),
        }
    }
}

impl std::str::FromStr for Timeframe {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Timeframe::M1),
            "5m" => Ok(Timeframe::M5),
            "15m" => Ok(Timeframe::M15),
            "1h" => Ok(Timeframe::H1),
            other => Err(Error::Config(format!("unknown timeframe '{other}'"))),
        }
    }
}

/// Direction of a fired signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// Detail record emitted when the evaluator fires.
///
/// Snapshots every input used in the decision, so the decision is
/// reproducible from the record alone. `timestamp` is the close time of the
/// candle that fired, not the wall clock, so backtest replays produce the
/// same records. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub direction: Direction,
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Close of the candle that fired.
    pub price: f64,
    pub ema_short: f64,
    pub ema_long: f64,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub volume: f64,
    /// 10-candle rolling volume average at the firing position.
    pub vol_avg: f64,
    pub timestamp: DateTime<Utc>,
}

/// Take-profit and stop-loss levels derived from an entry price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceTargets {
    pub take_profit: f64,
    pub stop_loss: f64,
}

/// Current state of the signal engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    #[default]
    Idle,
    Running,
    /// Stop requested; the worker exits at its next checkpoint.
    Stopping,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Idle => write!(f, "idle"),
            EngineState::Running => write!(f, "running"),
            EngineState::Stopping => write!(f, "stopping"),
        }
    }
}

/// Commands sent to the engine via the command channel.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    Start,
    Stop,
}

/// One signal found during a reverse replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestHit {
    /// Close time of the last candle in the firing prefix.
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    /// Length of the reversed prefix that fired.
    pub prefix_len: usize,
}

/// Result of a reverse replay over a historical window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub symbol: String,
    /// Number of prefixes evaluated.
    pub total_checks: usize,
    pub hits: Vec<BacktestHit>,
}

impl BacktestReport {
    pub fn found(&self) -> usize {
        self.hits.len()
    }
}

/// Events emitted by the engine onto its event channel.
/// Frontends (the Telegram forwarder here) consume these; the engine never
/// talks to a presentation layer directly.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The evaluator fired; the record is already in the signal log.
    Signal {
        event: SignalEvent,
        targets: PriceTargets,
    },
    /// A cycle completed without a signal.
    Heartbeat {
        symbol: String,
        timeframe: Timeframe,
        price: f64,
    },
    /// A reverse-mode cycle completed.
    Backtest { report: BacktestReport },
    /// A recoverable fault (fetch failure); the loop retries on its own.
    Error { message: String },
}
