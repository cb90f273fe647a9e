use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use common::{BacktestReport, EngineEvent, PriceTargets, SignalEvent};
use engine::EngineHandle;
use strategy::StrategyConfig;

/// Hits listed in a backtest reply before truncation.
const MAX_LISTED_HITS: usize = 10;

/// Consume engine events and forward the user-facing ones to the alert chat.
///
/// Runs as its own task: the worker only enqueues events, so a slow or
/// failing Telegram send never delays a cycle. Send failures are logged and
/// never retried.
pub async fn run_forwarder(
    bot: Bot,
    chat_id: ChatId,
    engine: EngineHandle,
    mut event_rx: mpsc::Receiver<EngineEvent>,
) {
    while let Some(event) = event_rx.recv().await {
        match event {
            EngineEvent::Signal { event, targets } => {
                let cfg = engine.config().await;
                let text = format_signal_message(&event, &targets, &cfg.strategy);
                if let Err(e) = bot
                    .send_message(chat_id, text)
                    .parse_mode(ParseMode::Markdown)
                    .await
                {
                    warn!(error = %e, "Failed to send Telegram alert");
                }
            }
            EngineEvent::Backtest { report } => {
                if let Err(e) = bot.send_message(chat_id, format_backtest_summary(&report)).await
                {
                    warn!(error = %e, "Failed to send backtest summary");
                }
            }
            EngineEvent::Heartbeat {
                symbol,
                timeframe,
                price,
            } => {
                debug!(symbol = %symbol, timeframe = %timeframe, price, "Heartbeat");
            }
            EngineEvent::Error { message } => {
                warn!(message = %message, "Engine reported a recoverable error");
            }
        }
    }
    warn!("Engine event channel closed, alert forwarder exiting");
}

/// Markdown alert for a fired signal.
pub fn format_signal_message(
    event: &SignalEvent,
    targets: &PriceTargets,
    cfg: &StrategyConfig,
) -> String {
    format!(
        "*{direction} signal* 🎯\n\
         \n\
         📊 *Pair:* `{symbol}`\n\
         💰 *Price:* `{price:.6}`\n\
         🎯 *TP:* `{tp:.6}`\n\
         🛑 *SL:* `{sl:.6}`\n\
         \n\
         📈 *Indicators:*\n\
         • RSI: `{rsi:.2}`\n\
         • EMA{ema_short_period}: `{ema_short:.6}`\n\
         • EMA{ema_long_period}: `{ema_long:.6}`\n\
         • Volume: `{volume:.0}` (avg: `{vol_avg:.0}`)\n\
         \n\
         ⏰ *Timeframe:* {timeframe}\n\
         🕐 *Time:* {time} UTC",
        direction = event.direction,
        symbol = event.symbol,
        price = event.price,
        tp = targets.take_profit,
        sl = targets.stop_loss,
        rsi = event.rsi,
        ema_short_period = cfg.ema_short,
        ema_short = event.ema_short,
        ema_long_period = cfg.ema_long,
        ema_long = event.ema_long,
        volume = event.volume,
        vol_avg = event.vol_avg,
        timeframe = event.timeframe,
        time = event.timestamp.format("%Y-%m-%d %H:%M:%S"),
    )
}

/// Plain-text summary of a reverse replay.
pub fn format_backtest_summary(report: &BacktestReport) -> String {
    let mut text = format!(
        "🔁 Backtest {}: {} checks, {} signals",
        report.symbol,
        report.total_checks,
        report.found()
    );
    for hit in report.hits.iter().take(MAX_LISTED_HITS) {
        text.push_str(&format!(
            "\n• {} {} (prefix {})",
            hit.timestamp.format("%Y-%m-%d %H:%M"),
            hit.direction,
            hit.prefix_len
        ));
    }
    if report.hits.len() > MAX_LISTED_HITS {
        text.push_str(&format!(
            "\n… and {} more",
            report.hits.len() - MAX_LISTED_HITS
        ));
    }
    text
}
