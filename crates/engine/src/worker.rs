use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};
use tracing::{error, info, warn};

use common::{Candle, EngineEvent, EngineState, MarketData};
use strategy::{evaluate, price_targets, EngineConfig, IndicatorFrame};

use crate::backtest;
use crate::log::SignalLog;

/// Seconds to wait after a candle boundary before fetching, so the exchange
/// has finalized the candle.
const SETTLE_DELAY_SECS: u64 = 2;
/// Fixed delay between fetch retries. Retries are unbounded; only a stop
/// request ends them.
const FETCH_RETRY_SECS: u64 = 5;

/// One live signal-checking loop for one pair.
///
/// Spawned by the engine on `Start`; exits at the first checkpoint after the
/// shared state moves to `Stopping`, and sets it back to `Idle` on the way
/// out. Holds only the current window, never accumulated history.
pub(crate) struct Worker {
    market: Arc<dyn MarketData>,
    log: SignalLog,
    event_tx: mpsc::Sender<EngineEvent>,
    config: Arc<RwLock<EngineConfig>>,
    state: Arc<RwLock<EngineState>>,
}

impl Worker {
    pub(crate) fn new(
        market: Arc<dyn MarketData>,
        log: SignalLog,
        event_tx: mpsc::Sender<EngineEvent>,
        config: Arc<RwLock<EngineConfig>>,
        state: Arc<RwLock<EngineState>>,
    ) -> Self {
        Self {
            market,
            log,
            event_tx,
            config,
            state,
        }
    }

    pub(crate) async fn run(self) {
        info!("Signal worker started");

        loop {
            // Checkpoint: a stop request ends the run before a new cycle,
            // never mid-fetch or mid-compute.
            if self.stop_requested().await {
                break;
            }

            // Config edits take effect here, at cycle start, never mid-cycle.
            let cfg = self.config.read().await.clone();

            let wait = cfg.timeframe.secs_until_next_close();
            if wait > 1 {
                info!(secs = wait, timeframe = %cfg.timeframe, "Waiting for candle close");
            }
            if self.sleep_interruptible(wait).await {
                break;
            }
            if self.sleep_interruptible(SETTLE_DELAY_SECS).await {
                break;
            }

            let candles = match self
                .market
                .fetch_candles(&cfg.symbol, cfg.timeframe, cfg.candle_limit)
                .await
            {
                Ok(candles) if !candles.is_empty() => candles,
                Ok(_) => {
                    warn!(symbol = %cfg.symbol, "Exchange returned no candles, retrying");
                    let _ = self
                        .event_tx
                        .send(EngineEvent::Error {
                            message: format!("no candles returned for {}", cfg.symbol),
                        })
                        .await;
                    if self.sleep_interruptible(FETCH_RETRY_SECS).await {
                        break;
                    }
                    continue;
                }
                Err(e) => {
                    warn!(symbol = %cfg.symbol, error = %e, "Candle fetch failed, retrying");
                    let _ = self
                        .event_tx
                        .send(EngineEvent::Error {
                            message: format!("candle fetch failed: {e}"),
                        })
                        .await;
                    if self.sleep_interruptible(FETCH_RETRY_SECS).await {
                        break;
                    }
                    continue;
                }
            };

            if cfg.reverse_mode {
                let report = backtest::run_reverse(&candles, &cfg);
                info!(
                    symbol = %cfg.symbol,
                    checks = report.total_checks,
                    found = report.found(),
                    "Reverse check complete"
                );
                let _ = self.event_tx.send(EngineEvent::Backtest { report }).await;
                continue;
            }

            self.evaluate_cycle(&cfg, &candles).await;
        }

        *self.state.write().await = EngineState::Idle;
        info!("Signal worker stopped");
    }

    async fn evaluate_cycle(&self, cfg: &EngineConfig, candles: &[Candle]) {
        let frame = IndicatorFrame::compute(candles, &cfg.strategy, &cfg.indicators);

        match evaluate(candles, &frame, &cfg.strategy, &cfg.symbol, cfg.timeframe) {
            Some(event) => {
                let targets = price_targets(event.price, event.direction, &cfg.strategy);
                info!(
                    direction = %event.direction,
                    symbol = %event.symbol,
                    price = event.price,
                    tp = targets.take_profit,
                    sl = targets.stop_loss,
                    "Signal detected"
                );

                // The log write completes before the cycle ends; notification
                // dispatch happens on the forwarder task and may finish later.
                if let Err(e) = self.log.append(&event).await {
                    error!(error = %e, "Failed to append signal log");
                }
                let _ = self.event_tx.send(EngineEvent::Signal { event, targets }).await;
            }
            None => {
                // Insufficient history and warm-up gaps land here too; they
                // are no-signal outcomes, not faults.
                let price = candles.last().map(|c| c.close).unwrap_or_default();
                info!(symbol = %cfg.symbol, timeframe = %cfg.timeframe, price, "No signal");
                let _ = self
                    .event_tx
                    .send(EngineEvent::Heartbeat {
                        symbol: cfg.symbol.clone(),
                        timeframe: cfg.timeframe,
                        price,
                    })
                    .await;
            }
        }
    }

    async fn stop_requested(&self) -> bool {
        *self.state.read().await == EngineState::Stopping
    }

    /// Sleep in one-second steps so a stop request is honored promptly even
    /// inside a long boundary wait. Returns true when stop was requested.
    async fn sleep_interruptible(&self, secs: u64) -> bool {
        for _ in 0..secs {
            if self.stop_requested().await {
                return true;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        self.stop_requested().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{long_scenario_candles, scenario_config, window_with, ScriptedMarket};
    use common::Direction;
    use sqlx::sqlite::SqlitePoolOptions;

    struct Harness {
        market: Arc<ScriptedMarket>,
        state: Arc<RwLock<EngineState>>,
        config: Arc<RwLock<EngineConfig>>,
        event_rx: mpsc::Receiver<EngineEvent>,
        log: SignalLog,
        handle: tokio::task::JoinHandle<()>,
    }

    async fn spawn_worker(market: ScriptedMarket, cfg: EngineConfig) -> Harness {
        let market = Arc::new(market);
        let state = Arc::new(RwLock::new(EngineState::Running));
        let config = Arc::new(RwLock::new(cfg));
        let (event_tx, event_rx) = mpsc::channel(32);
        // A single shared connection: each `sqlite::memory:` connection is a
        // separate database, so the worker's writes and the test's reads must
        // ride the same one. `test_before_acquire(false)` removes the
        // per-acquire ping, which otherwise runs on a blocking thread under
        // paused time long enough for the runtime to auto-advance past the
        // acquire deadline and report a spurious PoolTimedOut. The initial
        // connect still blocks, so establish it under real time, then re-pause
        // before spawning the worker so its boundary sleeps remain virtual.
        tokio::time::resume();
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .test_before_acquire(false)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let log = SignalLog::new(pool);
        log.ensure_schema().await.unwrap();
        tokio::time::pause();

        let worker = Worker::new(
            market.clone(),
            log.clone(),
            event_tx,
            config.clone(),
            state.clone(),
        );
        let handle = tokio::spawn(worker.run());

        Harness {
            market,
            state,
            config,
            event_rx,
            log,
            handle,
        }
    }

    async fn signal_count(log: &SignalLog) -> i64 {
        // Read under real time: a pool query under paused time races the
        // runtime's auto-advance against the acquire deadline and reports a
        // spurious PoolTimedOut. The caller is paused here; re-pause after.
        tokio::time::resume();
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM signals")
            .fetch_one(&log.pool)
            .await
            .unwrap();
        tokio::time::pause();
        count
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_wait_skips_the_cycle() {
        let mut h = spawn_worker(
            ScriptedMarket::new(long_scenario_candles()),
            scenario_config(),
        )
        .await;

        // Request stop immediately: the worker is inside its boundary wait
        // and must exit without fetching or evaluating.
        *h.state.write().await = EngineState::Stopping;
        h.handle.await.unwrap();

        assert_eq!(*h.state.read().await, EngineState::Idle);
        assert_eq!(h.market.calls(), 0);
        assert!(h.event_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn firing_cycle_logs_then_emits() {
        let mut h = spawn_worker(
            ScriptedMarket::new(long_scenario_candles()),
            scenario_config(),
        )
        .await;

        let event = h.event_rx.recv().await.unwrap();
        match event {
            EngineEvent::Signal { event, targets } => {
                assert_eq!(event.direction, Direction::Long);
                assert!(targets.take_profit > event.price);
                assert!(targets.stop_loss < event.price);
            }
            other => panic!("expected signal event, got {other:?}"),
        }

        *h.state.write().await = EngineState::Stopping;
        while h.event_rx.recv().await.is_some() {}
        h.handle.await.unwrap();
        assert_eq!(*h.state.read().await, EngineState::Idle);
        // The log row for the received event was written before the event
        // was emitted; later cycles may have appended more.
        assert!(signal_count(&h.log).await >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_cycle_emits_heartbeat() {
        let window = window_with(&vec![100.0; 60], &vec![5.0; 60]);
        let mut h = spawn_worker(ScriptedMarket::new(window), EngineConfig::default()).await;

        match h.event_rx.recv().await.unwrap() {
            EngineEvent::Heartbeat { price, .. } => assert_eq!(price, 100.0),
            other => panic!("expected heartbeat, got {other:?}"),
        }
        assert_eq!(signal_count(&h.log).await, 0);

        *h.state.write().await = EngineState::Stopping;
        while h.event_rx.recv().await.is_some() {}
        h.handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_failure_retries_until_stopped() {
        let mut h = spawn_worker(ScriptedMarket::failing(), EngineConfig::default()).await;

        // Two consecutive error events prove the retry loop survives the
        // failure instead of crashing out.
        for _ in 0..2 {
            match h.event_rx.recv().await.unwrap() {
                EngineEvent::Error { message } => {
                    assert!(message.contains("candle fetch failed"))
                }
                other => panic!("expected error event, got {other:?}"),
            }
        }
        assert!(h.market.calls() >= 2);

        *h.state.write().await = EngineState::Stopping;
        while h.event_rx.recv().await.is_some() {}
        h.handle.await.unwrap();
        assert_eq!(*h.state.read().await, EngineState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn reverse_mode_replays_instead_of_evaluating() {
        let mut cfg = scenario_config();
        cfg.reverse_mode = true;
        let mut h = spawn_worker(ScriptedMarket::new(long_scenario_candles()), cfg).await;

        match h.event_rx.recv().await.unwrap() {
            EngineEvent::Backtest { report } => {
                assert_eq!(report.total_checks, 36 - backtest::MIN_LOOKBACK + 1);
            }
            other => panic!("expected backtest event, got {other:?}"),
        }
        // Reverse hits never reach the live signal log.
        assert_eq!(signal_count(&h.log).await, 0);

        *h.state.write().await = EngineState::Stopping;
        while h.event_rx.recv().await.is_some() {}
        h.handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn config_edits_apply_on_the_next_cycle() {
        let window = window_with(&vec![100.0; 60], &vec![5.0; 60]);
        let mut h = spawn_worker(ScriptedMarket::new(window), EngineConfig::default()).await;

        match h.event_rx.recv().await.unwrap() {
            EngineEvent::Heartbeat { symbol, .. } => assert_eq!(symbol, "BTCUSDT"),
            other => panic!("expected heartbeat, got {other:?}"),
        }

        h.config.write().await.symbol = "ETHUSDT".to_string();
        // Skip whatever cycles were already in flight with the old snapshot.
        loop {
            match h.event_rx.recv().await.unwrap() {
                EngineEvent::Heartbeat { symbol, .. } if symbol == "ETHUSDT" => break,
                EngineEvent::Heartbeat { .. } => continue,
                other => panic!("expected heartbeat, got {other:?}"),
            }
        }

        *h.state.write().await = EngineState::Stopping;
        while h.event_rx.recv().await.is_some() {}
        h.handle.await.unwrap();
    }
}
