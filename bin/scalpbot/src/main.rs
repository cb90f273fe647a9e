use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use sqlx::SqlitePool;
use teloxide::types::ChatId;
use teloxide::Bot;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::MarketData;
use engine::{Engine, SignalLog};
use market::BitgetClient;
use strategy::EngineConfig;
use telegram_alert::{run_forwarder, start_bot, BotDeps};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = common::Config::from_env();
    let engine_cfg = EngineConfig::load(&cfg.engine_config_path)?;
    engine_cfg.validate()?;
    info!(
        symbol = %engine_cfg.symbol,
        timeframe = %engine_cfg.timeframe,
        "ScalpBot starting"
    );

    // ── Signal log ────────────────────────────────────────────────────────────
    let db = SqlitePool::connect(&cfg.database_url).await?;
    let log = SignalLog::new(db);
    log.ensure_schema().await?;
    info!("Signal log ready");

    // ── Engine ────────────────────────────────────────────────────────────────
    let market: Arc<dyn MarketData> = Arc::new(BitgetClient::new());
    let (event_tx, event_rx) = mpsc::channel(128);
    let (engine, engine_handle) = Engine::new(market.clone(), log, event_tx, engine_cfg);

    // ── Telegram ──────────────────────────────────────────────────────────────
    let bot = Bot::new(cfg.telegram_token.clone());
    let bot_deps = BotDeps {
        engine: engine_handle.clone(),
        market,
        allowed_user_ids: Arc::new(cfg.telegram_allowed_user_ids.clone()),
        backtest_running: Arc::new(AtomicBool::new(false)),
    };

    // ── Spawn all tasks ───────────────────────────────────────────────────────
    tokio::spawn(engine.run());
    tokio::spawn(run_forwarder(
        bot.clone(),
        ChatId(cfg.telegram_chat_id),
        engine_handle,
        event_rx,
    ));
    tokio::spawn(start_bot(cfg.telegram_token.clone(), bot_deps));

    info!("All subsystems started. Waiting for shutdown signal.");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting.");
    Ok(())
}
