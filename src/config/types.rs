//! Configuration type definitions.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::common::types::UserId;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bot: BotConfig,
    pub queue: QueueConfig,
    #[serde(default)]
    pub locale: LocaleConfig,
}

/// Telegram bot settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Server name; also salts the key used for encrypted secrets.
    #[serde(default = "default_bot_name")]
    pub name: String,
    /// Bot API token, plain or `enc:`-prefixed.
    pub token: String,
    /// Telegram ids allowed to use the admin menu.
    #[serde(default)]
    pub admins: Vec<i64>,
}

/// Message broker connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    /// Broker password, plain or `enc:`-prefixed.
    pub password: Option<String>,
    /// Inactivity timeout for a single poll of a response queue.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    #[serde(default = "default_reconnect_min_secs")]
    pub reconnect_min_secs: u64,
    #[serde(default = "default_reconnect_max_secs")]
    pub reconnect_max_secs: u64,
}

/// Translation catalogs and user locale persistence.
#[derive(Debug, Clone, Deserialize)]
pub struct LocaleConfig {
    /// Directory with one `<code>.json` catalog per locale.
    #[serde(default = "default_locale_dir")]
    pub dir: PathBuf,
    /// Locale used when nothing better is known.
    #[serde(default = "default_locale_code")]
    pub default: String,
    /// How often catalogs are re-read from disk (0 disables reloading).
    #[serde(default = "default_reload_interval_secs")]
    pub reload_interval_secs: u64,
    /// JSON file holding explicit user locale choices.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            dir: default_locale_dir(),
            default: default_locale_code(),
            reload_interval_secs: default_reload_interval_secs(),
            store_path: default_store_path(),
        }
    }
}

impl Config {
    /// The admin allowlist as a set.
    pub fn admin_set(&self) -> HashSet<UserId> {
        self.bot.admins.iter().copied().map(UserId).collect()
    }
}

impl QueueConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn reconnect_min(&self) -> Duration {
        Duration::from_secs(self.reconnect_min_secs)
    }

    pub fn reconnect_max(&self) -> Duration {
        Duration::from_secs(self.reconnect_max_secs)
    }
}

impl LocaleConfig {
    /// `None` when periodic reloading is disabled.
    pub fn reload_interval(&self) -> Option<Duration> {
        (self.reload_interval_secs > 0).then(|| Duration::from_secs(self.reload_interval_secs))
    }
}

fn default_bot_name() -> String {
    "idle-rpg-bot".to_string()
}

fn default_poll_timeout_secs() -> u64 {
    5
}

fn default_reconnect_min_secs() -> u64 {
    1
}

fn default_reconnect_max_secs() -> u64 {
    60
}

fn default_locale_dir() -> PathBuf {
    PathBuf::from("l18n")
}

fn default_locale_code() -> String {
    "en".to_string()
}

fn default_reload_interval_secs() -> u64 {
    600
}

fn default_store_path() -> PathBuf {
    PathBuf::from("user_locales.json")
}
