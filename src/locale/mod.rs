//! Localization: translation catalogs, per-user locale resolution and
//! persistence of explicit locale choices.

pub mod catalog;
pub mod keys;
pub mod resolver;
pub mod store;

pub use catalog::{Catalog, CatalogSet};
pub use resolver::LocaleResolver;
pub use store::{JsonFileStore, LocaleStore};
