//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    // Validate bot config
    if config.bot.token.is_empty() {
        errors.push("bot.token is required".to_string());
    }
    if config.bot.token == "YOUR_TELEGRAM_TOKEN_HERE" {
        errors.push("bot.token has not been configured (still using placeholder)".to_string());
    }
    if config.bot.name.is_empty() {
        errors.push("bot.name must not be empty".to_string());
    }

    // Validate broker config
    if config.queue.host.is_empty() {
        errors.push("queue.host is required".to_string());
    }
    if config.queue.port == 0 {
        errors.push("queue.port must be non-zero".to_string());
    }
    if config.queue.user.is_some() != config.queue.password.is_some() {
        errors.push("queue.user and queue.password must be set together".to_string());
    }
    if config.queue.poll_timeout_secs == 0 {
        errors.push("queue.poll_timeout_secs must be at least 1".to_string());
    }
    if config.queue.reconnect_min_secs > config.queue.reconnect_max_secs {
        errors.push(format!(
            "queue.reconnect_min_secs ({}) must not exceed queue.reconnect_max_secs ({})",
            config.queue.reconnect_min_secs, config.queue.reconnect_max_secs
        ));
    }

    // Validate locale config
    if config.locale.default.is_empty() {
        errors.push("locale.default must not be empty".to_string());
    }
    if config.locale.dir.as_os_str().is_empty() {
        errors.push("locale.dir must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("; "),
        })
    }
}

/// Log warnings for settings that are valid but probably unintended.
pub fn warn_suspicious(config: &Config) {
    if config.bot.admins.is_empty() {
        tracing::warn!("bot.admins is empty - the admin menu will not be available to anyone");
    }
    if config.locale.reload_interval().is_none() {
        tracing::info!("Translation reloading is disabled (locale.reload_interval_secs = 0)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::load_config_str;

    fn valid_config() -> Config {
        load_config_str(
            r#"
            bot { token = "123:abc", admins = [1] }
            queue { host = "localhost", port = 5672 }
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_placeholder_token() {
        let mut config = valid_config();
        config.bot.token = "YOUR_TELEGRAM_TOKEN_HERE".to_string();

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("placeholder"));
    }

    #[test]
    fn test_errors_are_collected() {
        let mut config = valid_config();
        config.queue.host = String::new();
        config.queue.port = 0;
        config.queue.user = Some("bot".to_string());

        match validate_config(&config) {
            Err(ConfigError::ValidationError { message }) => {
                assert!(message.contains("queue.host"));
                assert!(message.contains("queue.port"));
                assert!(message.contains("queue.password"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_reconnect_bounds() {
        let mut config = valid_config();
        config.queue.reconnect_min_secs = 120;
        config.queue.reconnect_max_secs = 60;
        assert!(validate_config(&config).is_err());
    }
}
