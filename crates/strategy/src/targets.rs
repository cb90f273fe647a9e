use common::{Direction, PriceTargets};

use crate::config::StrategyConfig;

/// Take-profit and stop-loss levels for an entry price.
/// No clamping or validation: the evaluator only fires on real candle
/// closes, so the price is a positive number by construction.
pub fn price_targets(price: f64, direction: Direction, cfg: &StrategyConfig) -> PriceTargets {
    match direction {
        Direction::Long => PriceTargets {
            take_profit: price * (1.0 + cfg.tp_percent / 100.0),
            stop_loss: price * (1.0 - cfg.sl_percent / 100.0),
        },
        Direction::Short => PriceTargets {
            take_profit: price * (1.0 - cfg.tp_percent / 100.0),
            stop_loss: price * (1.0 + cfg.sl_percent / 100.0),
        },
    }
}
