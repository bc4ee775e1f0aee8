//! Registry of monitored collections.
//!
//! The registry is an explicitly constructed value. Callers build one at
//! startup, register any extra collections, and hand it to the repository and
//! strategies that need to know which collections to scan.

use crate::{ValidationError, CONTENT_COLLECTION, PAGES_COLLECTION};
use serde::{Deserialize, Serialize};

/// Fields every registered collection must expose.
pub const REQUIRED_FIELDS: [&str; 3] = ["id", "start_time", "end_time"];

const PAGE_FIELDS: [&str; 11] = [
    "id",
    "title",
    "parent_id",
    "start_time",
    "end_time",
    "language_id",
    "workspace_id",
    "hidden",
    "deleted",
    "mount_page_id",
    "shortcut_page_id",
];

const CONTENT_FIELDS: [&str; 9] = [
    "id",
    "title",
    "parent_id",
    "start_time",
    "end_time",
    "language_id",
    "workspace_id",
    "hidden",
    "deleted",
];

/// One monitored collection and the fields it exposes, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub collection: String,
    pub fields: Vec<String>,
    pub is_default: bool,
}

/// Which collections are scanned for temporal transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorRegistry {
    entries: Vec<RegistryEntry>,
}

impl Default for MonitorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorRegistry {
    /// Create a registry holding only the two default collections.
    pub fn new() -> Self {
        let default_entry = |collection: &str, fields: &[&str]| RegistryEntry {
            collection: collection.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            is_default: true,
        };

        Self {
            entries: vec![
                default_entry(PAGES_COLLECTION, &PAGE_FIELDS),
                default_entry(CONTENT_COLLECTION, &CONTENT_FIELDS),
            ],
        }
    }

    /// Register an additional collection.
    ///
    /// Fails when the name is empty, names a default collection, is already
    /// registered, or the field list lacks one of [`REQUIRED_FIELDS`].
    pub fn register<I, S>(&mut self, collection: &str, fields: I) -> Result<(), ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if collection.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "collection".to_string(),
            });
        }

        if self.is_default(collection) {
            return Err(ValidationError::ReservedCollection {
                collection: collection.to_string(),
            });
        }

        if self.is_registered(collection) {
            return Err(ValidationError::DuplicateCollection {
                collection: collection.to_string(),
            });
        }

        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if let Some(missing) = REQUIRED_FIELDS
            .iter()
            .find(|required| !fields.iter().any(|f| f == *required))
        {
            return Err(ValidationError::RequiredFieldMissing {
                field: missing.to_string(),
            });
        }

        self.entries.push(RegistryEntry {
            collection: collection.to_string(),
            fields,
            is_default: false,
        });
        Ok(())
    }

    /// Remove a custom collection. Returns `Ok(false)` if it was not registered.
    pub fn unregister(&mut self, collection: &str) -> Result<bool, ValidationError> {
        if self.is_default(collection) {
            return Err(ValidationError::ReservedCollection {
                collection: collection.to_string(),
            });
        }

        let before = self.entries.len();
        self.entries.retain(|e| e.collection != collection);
        Ok(self.entries.len() != before)
    }

    /// Drop every custom collection. Defaults are kept.
    pub fn clear_custom(&mut self) {
        self.entries.retain(|e| e.is_default);
    }

    pub fn is_registered(&self, collection: &str) -> bool {
        self.entry(collection).is_some()
    }

    pub fn is_default(&self, collection: &str) -> bool {
        collection == PAGES_COLLECTION || collection == CONTENT_COLLECTION
    }

    pub fn entry(&self, collection: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.collection == collection)
    }

    pub fn fields(&self, collection: &str) -> Option<&[String]> {
        self.entry(collection).map(|e| e.fields.as_slice())
    }

    /// Collection names in scan order: defaults first, then custom entries
    /// in registration order.
    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.collection.as_str())
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn custom_entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter().filter(|e| !e.is_default)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn news_fields() -> Vec<&'static str> {
        vec!["id", "title", "start_time", "end_time"]
    }

    #[test]
    fn test_defaults_present() {
        let registry = MonitorRegistry::new();
        let names: Vec<&str> = registry.collections().collect();
        assert_eq!(names, vec![PAGES_COLLECTION, CONTENT_COLLECTION]);
        assert_eq!(registry.custom_entries().count(), 0);
    }

    #[test]
    fn test_default_fields_contain_required() {
        let registry = MonitorRegistry::new();
        for name in [PAGES_COLLECTION, CONTENT_COLLECTION] {
            let fields = registry.fields(name).expect("default collection");
            for required in REQUIRED_FIELDS {
                assert!(fields.iter().any(|f| f == required));
            }
        }
    }

    #[test]
    fn test_register_custom_collection() {
        let mut registry = MonitorRegistry::new();
        registry.register("news", news_fields()).unwrap();

        assert!(registry.is_registered("news"));
        assert!(!registry.is_default("news"));
        assert_eq!(registry.collections().last(), Some("news"));
    }

    #[test]
    fn test_register_without_start_time_fails() {
        let mut registry = MonitorRegistry::new();
        let result = registry.register("events", vec!["id", "title", "end_time"]);

        assert_eq!(
            result,
            Err(ValidationError::RequiredFieldMissing {
                field: "start_time".to_string()
            })
        );
        assert!(!registry.is_registered("events"));
    }

    #[test]
    fn test_register_default_name_fails() {
        let mut registry = MonitorRegistry::new();
        let result = registry.register(PAGES_COLLECTION, news_fields());
        assert!(matches!(result, Err(ValidationError::ReservedCollection { .. })));
    }

    #[test]
    fn test_register_duplicate_requires_unregister() {
        let mut registry = MonitorRegistry::new();
        registry.register("news", news_fields()).unwrap();

        let duplicate = registry.register("news", news_fields());
        assert!(matches!(duplicate, Err(ValidationError::DuplicateCollection { .. })));

        assert_eq!(registry.unregister("news"), Ok(true));
        registry.register("news", news_fields()).unwrap();
    }

    #[test]
    fn test_register_empty_name_fails() {
        let mut registry = MonitorRegistry::new();
        let result = registry.register("  ", news_fields());
        assert!(matches!(result, Err(ValidationError::RequiredFieldMissing { .. })));
    }

    #[test]
    fn test_unregister_default_fails() {
        let mut registry = MonitorRegistry::new();
        assert!(registry.unregister(CONTENT_COLLECTION).is_err());
        assert!(registry.is_registered(CONTENT_COLLECTION));
    }

    #[test]
    fn test_unregister_unknown_is_false() {
        let mut registry = MonitorRegistry::new();
        assert_eq!(registry.unregister("missing"), Ok(false));
    }

    #[test]
    fn test_clear_custom_keeps_defaults() {
        let mut registry = MonitorRegistry::new();
        registry.register("news", news_fields()).unwrap();
        registry.register("events", news_fields()).unwrap();

        registry.clear_custom();

        assert_eq!(registry.len(), 2);
        assert!(registry.is_registered(PAGES_COLLECTION));
        assert!(registry.is_registered(CONTENT_COLLECTION));
        assert!(!registry.is_registered("news"));
    }
}
