use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};

use common::{EngineCommand, EngineEvent, EngineState, MarketData, Result};
use strategy::EngineConfig;

use crate::log::SignalLog;
use crate::worker::Worker;

/// Cloneable handle passed to frontends (the Telegram bot here).
#[derive(Clone)]
pub struct EngineHandle {
    command_tx: mpsc::Sender<EngineCommand>,
    state: Arc<RwLock<EngineState>>,
    config: Arc<RwLock<EngineConfig>>,
}

impl EngineHandle {
    /// Request a start. The current configuration is validated here,
    /// synchronously, so the caller gets the configuration error directly
    /// and the engine never starts on bad input.
    pub async fn start(&self) -> Result<()> {
        self.config.read().await.validate()?;
        let _ = self.command_tx.send(EngineCommand::Start).await;
        Ok(())
    }

    /// Request a stop. Honored at the worker's next checkpoint, within
    /// about a second even during a long boundary wait.
    pub async fn stop(&self) {
        let _ = self.command_tx.send(EngineCommand::Stop).await;
    }

    pub async fn state(&self) -> EngineState {
        *self.state.read().await
    }

    /// Snapshot of the current configuration.
    pub async fn config(&self) -> EngineConfig {
        self.config.read().await.clone()
    }

    /// Replace the configuration. Takes effect at the next cycle start.
    pub async fn update_config(&self, config: EngineConfig) -> Result<()> {
        config.validate()?;
        *self.config.write().await = config;
        Ok(())
    }
}

/// The engine task: owns the command channel and spawns at most one worker
/// at a time. `IDLE → RUNNING → STOPPING → IDLE`; the worker itself performs
/// the `STOPPING → IDLE` transition at its next checkpoint.
pub struct Engine {
    market: Arc<dyn MarketData>,
    log: SignalLog,
    event_tx: mpsc::Sender<EngineEvent>,
    config: Arc<RwLock<EngineConfig>>,
    state: Arc<RwLock<EngineState>>,
    command_rx: mpsc::Receiver<EngineCommand>,
}

impl Engine {
    pub fn new(
        market: Arc<dyn MarketData>,
        log: SignalLog,
        event_tx: mpsc::Sender<EngineEvent>,
        config: EngineConfig,
    ) -> (Self, EngineHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let state = Arc::new(RwLock::new(EngineState::Idle));
        let config = Arc::new(RwLock::new(config));

        let handle = EngineHandle {
            command_tx,
            state: state.clone(),
            config: config.clone(),
        };

        let engine = Engine {
            market,
            log,
            event_tx,
            config,
            state,
            command_rx,
        };

        (engine, handle)
    }

    /// Run the engine. Call from `tokio::spawn`.
    pub async fn run(mut self) {
        info!("Engine initialized in idle state, waiting for start command");

        loop {
            match self.command_rx.recv().await {
                Some(EngineCommand::Start) => {
                    let current = *self.state.read().await;
                    if current != EngineState::Idle {
                        info!(state = %current, "Start ignored, engine not idle");
                        continue;
                    }

                    let cfg = self.config.read().await;
                    info!(symbol = %cfg.symbol, timeframe = %cfg.timeframe, "Starting signal worker");
                    drop(cfg);

                    *self.state.write().await = EngineState::Running;
                    let worker = Worker::new(
                        self.market.clone(),
                        self.log.clone(),
                        self.event_tx.clone(),
                        self.config.clone(),
                        self.state.clone(),
                    );
                    tokio::spawn(worker.run());
                }

                Some(EngineCommand::Stop) => {
                    let current = *self.state.read().await;
                    if current != EngineState::Running {
                        info!(state = %current, "Stop ignored, engine not running");
                        continue;
                    }
                    info!("Stop requested, worker exits at next checkpoint");
                    *self.state.write().await = EngineState::Stopping;
                }

                None => {
                    warn!("Engine command channel closed, shutting down");
                    break;
                }
            }
        }
    }
}
