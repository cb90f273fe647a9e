pub mod alerts;
pub mod commands;

pub use alerts::run_forwarder;
pub use commands::{start_bot, BotDeps};
