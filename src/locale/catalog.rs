//! Translation catalogs.
//!
//! Each locale is a flat JSON object (`{"key": "text", ...}`) stored as
//! `<dir>/<code>.json`. Every catalog except the default one falls back to
//! the default catalog for keys it does not define.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::common::error::{LocaleError, LocaleResult};
use crate::locale::keys;

/// Message templates for one locale.
#[derive(Debug)]
pub struct Catalog {
    code: String,
    messages: HashMap<String, String>,
    fallback: Option<Arc<Catalog>>,
}

impl Catalog {
    pub fn new(
        code: impl Into<String>,
        messages: HashMap<String, String>,
        fallback: Option<Arc<Catalog>>,
    ) -> Self {
        Self {
            code: code.into(),
            messages,
            fallback,
        }
    }

    /// Locale code this catalog was loaded for.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Human-readable language name, or the code if the catalog has none.
    pub fn display_name(&self) -> &str {
        self.messages
            .get(keys::LOCALE_NAME)
            .map(String::as_str)
            .unwrap_or(&self.code)
    }

    /// Look up a message, falling back to the default catalog.
    pub fn message(&self, key: &str) -> LocaleResult<&str> {
        self.lookup(key).ok_or_else(|| LocaleError::MessageNotFound {
            key: key.to_string(),
            locale: self.code.clone(),
            default: self
                .fallback
                .as_ref()
                .map_or_else(|| self.code.clone(), |f| f.code.clone()),
        })
    }

    /// Look up a message and substitute `{}` placeholders in order, then `{N}`
    /// placeholders by position.
    pub fn format(&self, key: &str, args: &[&str]) -> LocaleResult<String> {
        Ok(fill(self.message(key)?, args))
    }

    fn lookup(&self, key: &str) -> Option<&str> {
        self.messages
            .get(key)
            .map(String::as_str)
            .or_else(|| self.fallback.as_deref().and_then(|f| f.lookup(key)))
    }
}

fn fill(template: &str, args: &[&str]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut sequential = 0;
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        result.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let inner = after
            .find('}')
            .map(|close| &after[..close])
            .filter(|inner| inner.bytes().all(|b| b.is_ascii_digit()));

        let Some(inner) = inner else {
            result.push('{');
            rest = after;
            continue;
        };
        let index = if inner.is_empty() {
            sequential += 1;
            sequential - 1
        } else {
            inner.parse().unwrap_or(usize::MAX)
        };
        match args.get(index) {
            Some(arg) => result.push_str(arg),
            None => {
                result.push('{');
                result.push_str(inner);
                result.push('}');
            }
        }
        rest = &after[inner.len() + 1..];
    }
    result.push_str(rest);
    result
}

/// Normalize a locale code: lowercase, `_` replaced by `-`.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase().replace('_', "-")
}

/// All loaded catalogs plus the default one.
#[derive(Debug, Clone)]
pub struct CatalogSet {
    catalogs: HashMap<String, Arc<Catalog>>,
    default: Arc<Catalog>,
}

impl CatalogSet {
    /// Build catalogs from raw key→text maps, keyed by locale code.
    pub fn from_maps(
        default_code: &str,
        maps: HashMap<String, HashMap<String, String>>,
    ) -> LocaleResult<Self> {
        let default_code = normalize_code(default_code);
        let mut maps: HashMap<String, HashMap<String, String>> = maps
            .into_iter()
            .map(|(code, messages)| (normalize_code(&code), messages))
            .collect();

        let default_messages = maps.remove(&default_code).ok_or_else(|| LocaleError::MissingDefault {
            code: default_code.clone(),
        })?;
        let default = Arc::new(Catalog::new(default_code.clone(), default_messages, None));

        let mut catalogs: HashMap<String, Arc<Catalog>> = maps
            .into_iter()
            .map(|(code, messages)| {
                let catalog = Catalog::new(code.clone(), messages, Some(default.clone()));
                (code, Arc::new(catalog))
            })
            .collect();
        catalogs.insert(default_code, default.clone());

        Ok(Self { catalogs, default })
    }

    /// Load every `*.json` file in `dir` as a catalog named by its file stem.
    pub fn load_dir(dir: &Path, default_code: &str) -> LocaleResult<Self> {
        let io_err = |source| LocaleError::Io {
            path: dir.display().to_string(),
            source,
        };

        let mut maps = HashMap::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(code) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            debug!("Loading translation file {}", path.display());
            let content = fs::read_to_string(&path).map_err(|source| LocaleError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let messages: HashMap<String, String> =
                serde_json::from_str(&content).map_err(|source| LocaleError::Parse {
                    path: path.display().to_string(),
                    source,
                })?;
            info!("Loaded {} messages for locale '{}'", messages.len(), code);
            maps.insert(code.to_string(), messages);
        }

        Self::from_maps(default_code, maps)
    }

    /// Find a catalog by exact code, then by its primary language subtag.
    pub fn get(&self, code: &str) -> Option<Arc<Catalog>> {
        let code = normalize_code(code);
        self.catalogs.get(&code).cloned().or_else(|| {
            let primary = code.split('-').next()?;
            self.catalogs.get(primary).cloned()
        })
    }

    pub fn default_catalog(&self) -> Arc<Catalog> {
        self.default.clone()
    }

    /// Available locales as (code, display name), sorted by code.
    pub fn available(&self) -> Vec<(String, String)> {
        let mut list: Vec<(String, String)> = self
            .catalogs
            .values()
            .map(|c| (c.code().to_string(), c.display_name().to_string()))
            .collect();
        list.sort();
        list
    }

    pub fn len(&self) -> usize {
        self.catalogs.len()
    }
}

#[cfg(test)]
pub(crate) fn test_catalogs() -> CatalogSet {
    let en: HashMap<String, String> = keys::ALL
        .iter()
        .map(|k| (k.to_string(), format!("en:{}", k)))
        .chain([(keys::ENTER_NAME.to_string(), "en:enter_name {}".to_string())])
        .chain([(keys::FEEDBACK_ITEM.to_string(), "en:feedback_item #{0}: {1}".to_string())])
        .collect();
    let ru: HashMap<String, String> = [
        (keys::LOCALE_NAME, "Русский"),
        (keys::ABOUT_ME, "ru:about_me"),
        (keys::CHOOSE_CLASS, "ru:choose_class"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    CatalogSet::from_maps("en", HashMap::from([("en".to_string(), en), ("ru".to_string(), ru)]))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_falls_back_to_default() {
        let set = test_catalogs();
        let ru = set.get("ru").unwrap();

        assert_eq!(ru.message(keys::ABOUT_ME).unwrap(), "ru:about_me");
        assert_eq!(ru.message(keys::ABOUT_TEXT).unwrap(), "en:about_text");
    }

    #[test]
    fn test_missing_message_is_error() {
        let set = test_catalogs();
        let ru = set.get("ru").unwrap();

        match ru.message("no_such_key") {
            Err(LocaleError::MessageNotFound { key, locale, default }) => {
                assert_eq!(key, "no_such_key");
                assert_eq!(locale, "ru");
                assert_eq!(default, "en");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(set.default_catalog().message("no_such_key").is_err());
    }

    #[test]
    fn test_format_placeholders() {
        assert_eq!(fill("Enter name for {}", &["Warrior"]), "Enter name for Warrior");
        assert_eq!(fill("{1} then {0}", &["a", "b"]), "b then a");
        assert_eq!(fill("{} and {}", &["x"]), "x and {}");
        assert_eq!(fill("no placeholders", &["x"]), "no placeholders");
        assert_eq!(fill("{2} is missing", &["a"]), "{2} is missing");
        assert_eq!(fill("json {\"k\": {}}", &["1"]), "json {\"k\": 1}");
    }

    #[test]
    fn test_format_leaves_argument_text_alone() {
        assert_eq!(
            fill("Reply from the developers:\n{}", &["use {0} here"]),
            "Reply from the developers:\nuse {0} here"
        );
        assert_eq!(fill("#{0}: {1}", &["17", "try {} and {1}"]), "#17: try {} and {1}");
    }

    #[test]
    fn test_get_by_primary_subtag() {
        let set = test_catalogs();

        assert_eq!(set.get("ru").unwrap().code(), "ru");
        assert_eq!(set.get("ru-RU").unwrap().code(), "ru");
        assert_eq!(set.get("EN_us").unwrap().code(), "en");
        assert!(set.get("de").is_none());
    }

    #[test]
    fn test_missing_default_catalog() {
        let result = CatalogSet::from_maps("en", HashMap::new());
        assert!(matches!(result, Err(LocaleError::MissingDefault { .. })));
    }

    #[test]
    fn test_available_lists_display_names() {
        let set = test_catalogs();
        let available = set.available();

        assert_eq!(available.len(), 2);
        assert_eq!(available[1], ("ru".to_string(), "Русский".to_string()));
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("en.json"), r#"{"about_me": "Hello"}"#).unwrap();
        fs::write(dir.path().join("ru.json"), r#"{"about_me": "Привет"}"#).unwrap();
        fs::write(dir.path().join("README.txt"), "ignored").unwrap();

        let set = CatalogSet::load_dir(dir.path(), "en").unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("ru").unwrap().message(keys::ABOUT_ME).unwrap(), "Привет");
    }

    #[test]
    fn test_load_dir_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("en.json"), "{not json").unwrap();

        let result = CatalogSet::load_dir(dir.path(), "en");
        assert!(matches!(result, Err(LocaleError::Parse { .. })));
    }
}
