//! Configuration parsing and types.

pub mod env;
pub mod parser;
pub mod secret;
pub mod types;
pub mod validate;

use std::path::Path;

pub use parser::load_config;
pub use types::*;

use crate::common::error::ConfigError;

/// Load the config file, apply env overrides, decrypt secrets and validate.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    for var in env::check_empty_env_vars() {
        tracing::warn!("Environment variable {} is set but empty", var);
    }

    let config = load_config(path)?;
    let config = env::apply_env_overrides(config);
    let config = secret::decrypt_config_secrets(config)?;

    validate::validate_config(&config)?;
    validate::warn_suspicious(&config);

    Ok(config)
}
