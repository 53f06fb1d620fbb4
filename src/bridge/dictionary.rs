//! Class dictionary built from backend broadcasts.
//!
//! Broadcasts arrive in pieces (class list, then descriptions one by one), so
//! the cache only ever merges: known classes are never forgotten and labels
//! for other locales are kept when a class is re-announced.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::bridge::protocol::ClassEntry;
use crate::locale::catalog::normalize_code;

#[derive(Debug, Default)]
struct Classes {
    /// Class names in the order they were first announced.
    order: Vec<String>,
    labels: HashMap<String, HashMap<String, String>>,
    descriptions: HashMap<(String, String), String>,
}

/// In-memory class catalog. Written by the dictionary consumer only.
#[derive(Debug, Default)]
pub struct DictionaryCache {
    inner: RwLock<Classes>,
}

impl DictionaryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add classes and merge their localized labels.
    pub fn merge_class_list(&self, entries: &[ClassEntry]) {
        let mut classes = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        for entry in entries {
            let name = entry.name().to_string();
            if !classes.labels.contains_key(&name) {
                classes.order.push(name.clone());
            }
            let labels = classes.labels.entry(name).or_default();
            if let ClassEntry::Localized { labels: new, .. } = entry {
                labels.extend(new.iter().map(|(locale, label)| (normalize_code(locale), label.clone())));
            }
        }
    }

    /// Set the description of a class for one locale.
    pub fn merge_class_description(&self, class_name: &str, locale: &str, description: &str) {
        let mut classes = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        classes.descriptions.insert(
            (class_name.to_string(), normalize_code(locale)),
            description.to_string(),
        );
    }

    /// Known class names in announcement order.
    pub fn snapshot_classes(&self) -> Vec<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .clone()
    }

    /// Description for a class in a locale; `None` if not received yet.
    pub fn describe(&self, class_name: &str, locale: &str) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .descriptions
            .get(&(class_name.to_string(), normalize_code(locale)))
            .cloned()
    }

    /// Localized label for a class, falling back to the class name.
    pub fn label(&self, class_name: &str, locale: &str) -> String {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .labels
            .get(class_name)
            .and_then(|labels| labels.get(&normalize_code(locale)))
            .cloned()
            .unwrap_or_else(|| class_name.to_string())
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .labels
            .contains_key(class_name)
    }

    /// False until the first class list broadcast has been merged.
    pub fn is_ready(&self) -> bool {
        !self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .is_empty()
    }
}
