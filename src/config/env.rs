//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `IDLE_RPG_BOT_TELEGRAM_TOKEN` - Telegram bot token
//! - `IDLE_RPG_BOT_QUEUE_HOST` - Broker host
//! - `IDLE_RPG_BOT_QUEUE_PORT` - Broker port
//! - `IDLE_RPG_BOT_QUEUE_USER` - Broker user
//! - `IDLE_RPG_BOT_QUEUE_PASSWORD` - Broker password
//! - `IDLE_RPG_BOT_ADMINS` - Comma-separated admin Telegram ids

use std::env;

use tracing::warn;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "IDLE_RPG_BOT";

/// Apply environment variable overrides to a config.
///
/// This allows sensitive values like tokens and passwords to be
/// provided via environment variables instead of the config file.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(token) = env::var(format!("{}_TELEGRAM_TOKEN", ENV_PREFIX)) {
        config.bot.token = token;
    }

    // Broker settings
    if let Ok(host) = env::var(format!("{}_QUEUE_HOST", ENV_PREFIX)) {
        config.queue.host = host;
    }
    if let Ok(port) = env::var(format!("{}_QUEUE_PORT", ENV_PREFIX)) {
        match port.parse() {
            Ok(port) => config.queue.port = port,
            Err(_) => warn!("Ignoring invalid {}_QUEUE_PORT value '{}'", ENV_PREFIX, port),
        }
    }
    if let Ok(user) = env::var(format!("{}_QUEUE_USER", ENV_PREFIX)) {
        config.queue.user = Some(user);
    }
    if let Ok(password) = env::var(format!("{}_QUEUE_PASSWORD", ENV_PREFIX)) {
        config.queue.password = Some(password);
    }

    if let Ok(admins) = env::var(format!("{}_ADMINS", ENV_PREFIX)) {
        match parse_admin_list(&admins) {
            Some(ids) => config.bot.admins = ids,
            None => warn!("Ignoring invalid {}_ADMINS value '{}'", ENV_PREFIX, admins),
        }
    }

    config
}

/// Parse a comma-separated list of ids. Returns `None` if any entry is invalid.
fn parse_admin_list(value: &str) -> Option<Vec<i64>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().ok())
        .collect()
}

/// Check if any secret environment variables are set but empty.
///
/// Returns a list of variable names that are set but empty.
pub fn check_empty_env_vars() -> Vec<String> {
    let vars = [
        format!("{}_TELEGRAM_TOKEN", ENV_PREFIX),
        format!("{}_QUEUE_PASSWORD", ENV_PREFIX),
    ];

    vars.into_iter()
        .filter(|var| env::var(var).map(|v| v.is_empty()).unwrap_or(false))
        .collect()
}

/// Get the config file path from environment or use default.
///
/// Checks `IDLE_RPG_BOT_CONFIG` environment variable, otherwise returns "idle-rpg-bot.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "idle-rpg-bot.conf".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::*;

    fn make_test_config() -> Config {
        Config {
            bot: BotConfig {
                name: "test".to_string(),
                token: "original_token".to_string(),
                admins: vec![1],
            },
            queue: QueueConfig {
                host: "localhost".to_string(),
                port: 5672,
                user: None,
                password: None,
                poll_timeout_secs: 5,
                reconnect_min_secs: 1,
                reconnect_max_secs: 60,
            },
            locale: LocaleConfig::default(),
        }
    }

    #[test]
    fn test_env_prefix() {
        assert_eq!(ENV_PREFIX, "IDLE_RPG_BOT");
    }

    #[test]
    fn test_get_config_path_default() {
        env::remove_var("IDLE_RPG_BOT_CONFIG");
        assert_eq!(get_config_path(), "idle-rpg-bot.conf");
    }

    #[test]
    fn test_apply_env_overrides_no_vars() {
        env::remove_var("IDLE_RPG_BOT_TELEGRAM_TOKEN");
        env::remove_var("IDLE_RPG_BOT_QUEUE_HOST");
        env::remove_var("IDLE_RPG_BOT_ADMINS");

        let config = make_test_config();
        let result = apply_env_overrides(config);

        assert_eq!(result.bot.token, "original_token");
        assert_eq!(result.queue.host, "localhost");
        assert_eq!(result.bot.admins, vec![1]);
    }

    #[test]
    fn test_parse_admin_list() {
        assert_eq!(parse_admin_list("1, 2,3"), Some(vec![1, 2, 3]));
        assert_eq!(parse_admin_list(""), Some(vec![]));
        assert_eq!(parse_admin_list("1,x"), None);
    }
}
