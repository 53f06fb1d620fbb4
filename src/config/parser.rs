//! Configuration file parsing (HOCON format).

use std::path::Path;

use hocon::HoconLoader;

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Load configuration from a HOCON file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    HoconLoader::new()
        .load_file(path)
        .map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

/// Load configuration from a HOCON string.
pub fn load_config_str(content: &str) -> Result<Config, ConfigError> {
    HoconLoader::new()
        .load_str(content)
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_minimal_config() {
        let config = load_config_str(
            r#"
            bot { token = "123:abc", admins = [7, 8] }
            queue { host = "localhost", port = 5672 }
            "#,
        )
        .unwrap();

        assert_eq!(config.bot.name, "idle-rpg-bot");
        assert_eq!(config.bot.admins, vec![7, 8]);
        assert_eq!(config.queue.poll_timeout_secs, 5);
        assert_eq!(config.queue.user, None);
        assert_eq!(config.locale.default, "en");
        assert_eq!(config.locale.reload_interval_secs, 600);
    }

    #[test]
    fn test_load_full_config() {
        let config = load_config_str(
            r#"
            bot {
              name = "idle-rpg"
              token = "123:abc"
            }
            queue {
              host = "rabbit"
              port = 5673
              user = "bot"
              password = "secret"
              poll_timeout_secs = 2
            }
            locale {
              dir = "/srv/l18n"
              default = "ru"
              reload_interval_secs = 0
            }
            "#,
        )
        .unwrap();

        assert_eq!(config.queue.user.as_deref(), Some("bot"));
        assert_eq!(config.queue.poll_timeout().as_secs(), 2);
        assert_eq!(config.locale.default, "ru");
        assert!(config.locale.reload_interval().is_none());
    }

    #[test]
    fn test_missing_section_is_error() {
        let result = load_config_str(r#"bot { token = "x" }"#);
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }
}
