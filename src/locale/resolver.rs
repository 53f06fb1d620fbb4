//! Picks the message catalog for a user.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::common::error::{LocaleError, LocaleResult};
use crate::common::types::UserId;
use crate::locale::catalog::{normalize_code, Catalog, CatalogSet};
use crate::locale::store::LocaleStore;

/// Resolves user locales against the loaded catalogs.
///
/// Lookup order: explicit assignment, then the platform hint (which is
/// remembered in memory), then the default catalog. Resolution never fails.
pub struct LocaleResolver {
    assignments: RwLock<HashMap<UserId, String>>,
    catalogs: RwLock<Arc<CatalogSet>>,
    catalog_dir: Option<PathBuf>,
    default_code: String,
    store: Arc<dyn LocaleStore>,
}

impl LocaleResolver {
    pub fn new(
        catalogs: CatalogSet,
        assignments: HashMap<UserId, String>,
        default_code: &str,
        store: Arc<dyn LocaleStore>,
    ) -> Self {
        Self {
            assignments: RwLock::new(assignments),
            catalogs: RwLock::new(Arc::new(catalogs)),
            catalog_dir: None,
            default_code: normalize_code(default_code),
            store,
        }
    }

    /// Remember where catalogs were loaded from so they can be reloaded.
    pub fn with_catalog_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.catalog_dir = Some(dir.into());
        self
    }

    /// Resolve the catalog for a user.
    pub fn resolve(&self, user_id: UserId, hint: Option<&str>) -> Arc<Catalog> {
        let hint = hint.filter(|h| !h.trim().is_empty()).map(normalize_code);

        let code = {
            let mut assignments = self.assignments.write().unwrap_or_else(PoisonError::into_inner);
            match hint {
                Some(hint) => Some(
                    assignments
                        .entry(user_id)
                        .or_insert_with(|| {
                            debug!("Recording platform locale '{}' for user {}", hint, user_id);
                            hint
                        })
                        .clone(),
                ),
                None => assignments.get(&user_id).cloned(),
            }
        };

        let catalogs = self.catalogs();
        code.and_then(|code| catalogs.get(&code))
            .unwrap_or_else(|| catalogs.default_catalog())
    }

    /// Catalog for messages that have no identifiable user.
    pub fn default_catalog(&self) -> Arc<Catalog> {
        self.catalogs().default_catalog()
    }

    /// Explicitly set a user's locale, in memory and in the persistent store.
    pub async fn assign(&self, user_id: UserId, code: &str) -> LocaleResult<Arc<Catalog>> {
        let catalog = self.catalogs().get(code).ok_or_else(|| LocaleError::UnknownLocale {
            code: code.to_string(),
        })?;

        self.store.upsert(user_id, catalog.code()).await?;
        self.assignments
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id, catalog.code().to_string());

        info!("User {} switched locale to '{}'", user_id, catalog.code());
        Ok(catalog)
    }

    /// Currently assigned (or recorded) locale code, if any.
    pub fn assignment(&self, user_id: UserId) -> Option<String> {
        self.assignments
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .cloned()
    }

    /// Available locales as (code, display name).
    pub fn available(&self) -> Vec<(String, String)> {
        self.catalogs().available()
    }

    /// Re-read catalogs from disk. The previous catalogs stay active on error.
    pub fn reload_catalogs(&self) -> LocaleResult<usize> {
        let Some(dir) = &self.catalog_dir else {
            return Ok(self.catalogs().len());
        };

        match CatalogSet::load_dir(dir, &self.default_code) {
            Ok(set) => {
                let count = set.len();
                *self.catalogs.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(set);
                Ok(count)
            }
            Err(e) => {
                warn!("Keeping previous translations, reload failed: {}", e);
                Err(e)
            }
        }
    }

    fn catalogs(&self) -> Arc<CatalogSet> {
        self.catalogs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
pub(crate) fn test_resolver() -> LocaleResolver {
    use crate::locale::catalog::test_catalogs;
    use crate::locale::store::testing::MemoryStore;

    LocaleResolver::new(
        test_catalogs(),
        HashMap::new(),
        "en",
        Arc::new(MemoryStore::default()),
    )
}
