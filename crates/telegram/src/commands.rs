use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use teloxide::{dispatching::UpdateHandler, prelude::*, utils::command::BotCommands};
use tracing::{info, warn};

use common::{EngineState, MarketData};
use engine::{backtest, EngineHandle};

use crate::alerts::format_backtest_summary;

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

const DEFAULT_BACKTEST_STEPS: usize = 200;

/// Dependencies injected into every handler via `dptree`.
#[derive(Clone)]
pub struct BotDeps {
    pub engine: EngineHandle,
    pub market: Arc<dyn MarketData>,
    pub allowed_user_ids: Arc<Vec<i64>>,
    /// At most one reverse backtest at a time; they share the engine's
    /// config and would otherwise race on the operator's attention.
    pub backtest_running: Arc<AtomicBool>,
}

/// Telegram bot commands exposed to the operator.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "ScalpBot commands:")]
pub enum Command {
    #[command(description = "Start the signal engine")]
    Start,
    #[command(description = "Stop the signal engine")]
    Stop,
    #[command(description = "Show engine status")]
    Status,
    #[command(description = "Replay recent candles in reverse: /backtest [steps]")]
    Backtest(String),
}

/// Start the Telegram bot in long-polling mode.
pub async fn start_bot(token: String, deps: BotDeps) {
    let bot = Bot::new(token);
    let deps = Arc::new(deps);

    info!("Telegram bot starting (long-polling)");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![deps])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start].endpoint(handle_start))
        .branch(case![Command::Stop].endpoint(handle_stop))
        .branch(case![Command::Status].endpoint(handle_status))
        .branch(case![Command::Backtest(steps)].endpoint(handle_backtest));

    Update::filter_message()
        .filter_map(|msg: Message| msg.from().map(|u| u.id))
        .filter_async(auth_filter)
        .branch(command_handler)
}

/// Silently drop messages from users not in the allowed list.
async fn auth_filter(user_id: UserId, deps: Arc<BotDeps>) -> bool {
    let uid = user_id.0 as i64;
    let allowed = deps.allowed_user_ids.contains(&uid);
    if !allowed {
        warn!(user_id = uid, "Unauthorized Telegram access attempt");
    }
    allowed
}

async fn handle_start(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    if deps.engine.state().await == EngineState::Running {
        bot.send_message(msg.chat.id, "Engine is already running.")
            .await?;
        return Ok(());
    }

    match deps.engine.start().await {
        Ok(()) => {
            let cfg = deps.engine.config().await;
            bot.send_message(
                msg.chat.id,
                format!("Engine started: {} on {}.", cfg.symbol, cfg.timeframe),
            )
            .await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Cannot start: {e}"))
                .await?;
        }
    }
    Ok(())
}

async fn handle_stop(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    if deps.engine.state().await != EngineState::Running {
        bot.send_message(msg.chat.id, "Engine is not running.")
            .await?;
    } else {
        deps.engine.stop().await;
        bot.send_message(msg.chat.id, "Stopping engine\u{2026}").await?;
    }
    Ok(())
}

async fn handle_status(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let state = deps.engine.state().await;
    let cfg = deps.engine.config().await;
    let text = format!(
        "ScalpBot status\n\
         Engine: {state}\n\
         Pair: {} ({})\n\
         Reverse mode: {}",
        cfg.symbol, cfg.timeframe, cfg.reverse_mode
    );
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// Run a reverse backtest on a background task so the bot stays responsive.
/// The reply is sent when the replay completes.
async fn handle_backtest(
    bot: Bot,
    msg: Message,
    steps: String,
    deps: Arc<BotDeps>,
) -> HandlerResult {
    let steps = match parse_steps(&steps) {
        Ok(steps) => steps,
        Err(reason) => {
            bot.send_message(msg.chat.id, reason).await?;
            return Ok(());
        }
    };

    if deps
        .backtest_running
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        bot.send_message(msg.chat.id, "A backtest is already running.")
            .await?;
        return Ok(());
    }

    let cfg = deps.engine.config().await;
    bot.send_message(
        msg.chat.id,
        format!("Replaying {} candles of {} in reverse\u{2026}", steps, cfg.symbol),
    )
    .await?;

    let chat_id = msg.chat.id;
    let deps = deps.clone();
    tokio::spawn(async move {
        let result = backtest::fetch_and_run(deps.market.as_ref(), &cfg, steps).await;
        deps.backtest_running.store(false, Ordering::SeqCst);

        let text = match result {
            Ok(report) => format_backtest_summary(&report),
            Err(e) => format!("Backtest failed: {e}"),
        };
        if let Err(e) = bot.send_message(chat_id, text).await {
            warn!(error = %e, "Failed to send backtest reply");
        }
    });
    Ok(())
}

fn parse_steps(arg: &str) -> Result<usize, String> {
    let arg = arg.trim();
    if arg.is_empty() {
        return Ok(DEFAULT_BACKTEST_STEPS);
    }
    let steps: usize = arg
        .parse()
        .map_err(|_| format!("'{arg}' is not a number of candles."))?;
    if steps < backtest::MIN_LOOKBACK {
        return Err(format!(
            "Need at least {} candles for a backtest.",
            backtest::MIN_LOOKBACK
        ));
    }
    Ok(steps)
}
