//! Encrypted secrets in the configuration file.
//!
//! A secret stored as `enc:<base64>` is decrypted at load time. The key is
//! derived from the bot name and broker port, so a config file copied to a
//! differently named deployment will not decrypt.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use hmac::{digest::KeyInit as HmacKeyInit, Hmac, Mac};
use sha2::Sha256;

use crate::common::error::ConfigError;
use crate::config::types::Config;

type HmacSha256 = Hmac<Sha256>;

/// Marks a config value as encrypted.
pub const SECRET_PREFIX: &str = "enc:";

const KEY_CONTEXT: &[u8] = b"idle-rpg-bot/config-secret/v1";
const NONCE_LEN: usize = 12;

/// Returns true if the value carries the encrypted-secret prefix.
pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(SECRET_PREFIX)
}

/// Encrypt a secret for storage in the config file.
pub fn encrypt_secret(plain: &str, bot_name: &str, port: u16) -> Result<String, ConfigError> {
    let cipher = cipher(bot_name, port)?;

    let mut nonce = [0u8; NONCE_LEN];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plain.as_bytes())
        .map_err(|_| invalid("secret", "encryption failed"))?;

    let mut blob = nonce.to_vec();
    blob.extend_from_slice(&ciphertext);
    Ok(format!("{}{}", SECRET_PREFIX, STANDARD.encode(blob)))
}

/// Decrypt a secret; values without the prefix are returned unchanged.
pub fn decrypt_secret(value: &str, bot_name: &str, port: u16) -> Result<String, ConfigError> {
    let Some(encoded) = value.strip_prefix(SECRET_PREFIX) else {
        return Ok(value.to_string());
    };

    let blob = STANDARD
        .decode(encoded)
        .map_err(|e| invalid("secret", &format!("not valid base64: {}", e)))?;
    if blob.len() <= NONCE_LEN {
        return Err(invalid("secret", "ciphertext too short"));
    }

    let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
    let plain = cipher(bot_name, port)?
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| invalid("secret", "decryption failed (wrong bot name or port?)"))?;

    String::from_utf8(plain).map_err(|_| invalid("secret", "decrypted value is not UTF-8"))
}

/// Decrypt every secret field of the config in place.
pub fn decrypt_config_secrets(mut config: Config) -> Result<Config, ConfigError> {
    let name = config.bot.name.clone();
    let port = config.queue.port;

    config.bot.token = decrypt_secret(&config.bot.token, &name, port).map_err(|e| rename(e, "bot.token"))?;
    if let Some(password) = config.queue.password.take() {
        config.queue.password =
            Some(decrypt_secret(&password, &name, port).map_err(|e| rename(e, "queue.password"))?);
    }

    Ok(config)
}

fn cipher(bot_name: &str, port: u16) -> Result<ChaCha20Poly1305, ConfigError> {
    let mut mac = <HmacSha256 as HmacKeyInit>::new_from_slice(&port.to_be_bytes())
        .map_err(|_| invalid("secret", "invalid key material"))?;
    mac.update(bot_name.as_bytes());
    mac.update(KEY_CONTEXT);
    let key = mac.finalize().into_bytes();

    ChaCha20Poly1305::new_from_slice(&key).map_err(|_| invalid("secret", "invalid key length"))
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
}

fn rename(error: ConfigError, field: &str) -> ConfigError {
    match error {
        ConfigError::InvalidValue { message, .. } => invalid(field, &message),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_then_decrypt() {
        let encrypted = encrypt_secret("123:telegram-token", "idle-rpg", 5672).unwrap();
        assert!(is_encrypted(&encrypted));
        assert!(!encrypted.contains("telegram-token"));

        let plain = decrypt_secret(&encrypted, "idle-rpg", 5672).unwrap();
        assert_eq!(plain, "123:telegram-token");
    }

    #[test]
    fn test_plain_value_passes_through() {
        assert_eq!(decrypt_secret("guest", "idle-rpg", 5672).unwrap(), "guest");
    }

    #[test]
    fn test_wrong_port_fails() {
        let encrypted = encrypt_secret("password", "idle-rpg", 5672).unwrap();
        let result = decrypt_secret(&encrypted, "idle-rpg", 5673);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(decrypt_secret("enc:!!!", "idle-rpg", 5672).is_err());
        assert!(decrypt_secret("enc:AAAA", "idle-rpg", 5672).is_err());
    }
}
