//! Persistent storage of explicit user locale choices.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::common::error::StoreError;
use crate::common::types::UserId;

/// Durable user → locale mapping.
#[async_trait]
pub trait LocaleStore: Send + Sync {
    /// Load every known assignment.
    async fn load_all(&self) -> Result<HashMap<UserId, String>, StoreError>;
    /// Insert or replace one assignment.
    async fn upsert(&self, user_id: UserId, locale: &str) -> Result<(), StoreError>;
}

/// Stores assignments as a JSON object in a single file.
///
/// Writes go to a temporary file that is renamed over the original, so a
/// crash mid-write leaves the previous contents intact.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read(&self) -> Result<HashMap<UserId, String>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(source) => return Err(self.io_error(source)),
        };
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }

        // JSON object keys are strings; ids are parsed back explicitly.
        let raw: HashMap<String, String> =
            serde_json::from_str(&content).map_err(|source| StoreError::Corrupted {
                path: self.path.display().to_string(),
                source,
            })?;

        let mut locales = HashMap::with_capacity(raw.len());
        for (id, locale) in raw {
            match id.parse::<i64>() {
                Ok(id) => {
                    locales.insert(UserId(id), locale);
                }
                Err(_) => tracing::warn!("Skipping invalid user id '{}' in locale store", id),
            }
        }
        Ok(locales)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl LocaleStore for JsonFileStore {
    async fn load_all(&self) -> Result<HashMap<UserId, String>, StoreError> {
        let locales = self.read().await?;
        info!("Loaded {} user locale settings", locales.len());
        Ok(locales)
    }

    async fn upsert(&self, user_id: UserId, locale: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut locales = self.read().await?;
        locales.insert(user_id, locale.to_string());

        let raw: HashMap<String, &String> = locales.iter().map(|(id, l)| (id.to_string(), l)).collect();
        let content = serde_json::to_string_pretty(&raw).map_err(|source| StoreError::Corrupted {
            path: self.path.display().to_string(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        Ok(())
    }
}
