/// Deployment configuration loaded from environment variables at startup.
/// Missing required variables cause an immediate panic with a clear message.
/// Strategy and engine parameters live in a separate TOML file, loaded
/// fallibly — see `strategy::EngineConfig`.
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub telegram_token: String,
    /// Chat that receives signal alerts.
    pub telegram_chat_id: i64,
    /// Users allowed to issue bot commands.
    pub telegram_allowed_user_ids: Vec<i64>,

    // Signal log database
    pub database_url: String,

    // Engine config file path
    pub engine_config_path: String,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Panics on any missing required variable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let telegram_chat_id = required_env("TELEGRAM_CHAT_ID")
            .trim()
            .parse::<i64>()
            .unwrap_or_else(|_| panic!("TELEGRAM_CHAT_ID must be a numeric chat ID"));

        let telegram_allowed_user_ids = required_env("TELEGRAM_ALLOWED_USER_IDS")
            .split(',')
            .map(|s| {
                s.trim().parse::<i64>().unwrap_or_else(|_| {
                    panic!(
                        "TELEGRAM_ALLOWED_USER_IDS contains non-numeric ID: '{}'",
                        s.trim()
                    )
                })
            })
            .collect();

        Config {
            telegram_token: required_env("TELEGRAM_TOKEN"),
            telegram_chat_id,
            telegram_allowed_user_ids,
            database_url: optional_env("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://signals.db?mode=rwc".to_string()),
            engine_config_path: optional_env("ENGINE_CONFIG_PATH")
                .unwrap_or_else(|| "config/strategy.toml".to_string()),
        }
    }
}

fn required_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        panic!("Required environment variable '{key}' is not set. Check your .env file.")
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
