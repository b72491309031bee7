//! Operation registry
//!
//! Aggregates extracted endpoints under unique operation keys and exposes
//! the final lookup surface. Schema references are attached as plain names,
//! never as compiled schemas, so building the registry touches nothing in
//! the schema layer.

use chrono::{DateTime, Utc};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use regex::Regex;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::debug;

use crate::config::RegistryConfig;
use crate::document::DocumentStore;
use crate::endpoint::{EndpointExtractor, EndpointRecord};
use crate::error::{RegistryError, Result};
use crate::fingerprint::Fingerprint;
use crate::opkey::OperationKeyResolver;

/// Resource-oriented method categories for kind-based lookup
///
/// Each category maps to a fixed identifier-prefix pattern, matching the
/// naming convention of resource-style APIs (`listNamespacedPod`,
/// `readNamespacedPod`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodCategory {
    Get,
    List,
    Create,
    Update,
    Delete,
}

impl MethodCategory {
    /// The identifier-prefix pattern for this category
    pub fn prefix_pattern(&self) -> &'static str {
        match self {
            Self::Get => "^read",
            Self::List => "^list",
            Self::Create => "^create",
            Self::Update => "^(replace|patch)",
            Self::Delete => "^delete",
        }
    }

    /// Compiled form of `prefix_pattern`, built once per process
    fn prefix_regex(self) -> &'static Regex {
        static COMPILED: OnceLock<Vec<Regex>> = OnceLock::new();
        let compiled = COMPILED.get_or_init(|| {
            [Self::Get, Self::List, Self::Create, Self::Update, Self::Delete]
                .iter()
                .map(|category| {
                    Regex::new(category.prefix_pattern())
                        .expect("category patterns are valid regexes")
                })
                .collect()
        });
        &compiled[self as usize]
    }
}

impl FromStr for MethodCategory {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "get" => Ok(Self::Get),
            "list" => Ok(Self::List),
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(RegistryError::UnknownMethodCategory {
                category: other.to_string(),
            }),
        }
    }
}

/// Immutable map of operation key to endpoint record
///
/// Built once from a document; rebuilding means re-running the whole
/// pipeline against a (possibly new) document.
#[derive(Debug)]
pub struct OperationRegistry {
    entries: BTreeMap<String, EndpointRecord>,
    built_at: DateTime<Utc>,
    fingerprint: Fingerprint,
}

impl OperationRegistry {
    /// Build the registry with default configuration
    pub fn build(store: &DocumentStore) -> Result<Self> {
        Self::build_with(store, &RegistryConfig::default())
    }

    /// Build the registry: extract endpoints, assign unique keys, freeze.
    ///
    /// A duplicate declared operationId (or a synthesized collision under
    /// the `fail` policy) is a construction-time error - two distinct
    /// endpoints are never silently merged under one key.
    pub fn build_with(store: &DocumentStore, config: &RegistryConfig) -> Result<Self> {
        let extractor = EndpointExtractor::with_options(store, config.extract_options());
        let mut keys = OperationKeyResolver::with_policy(config.keys.collision_policy);

        let mut entries = BTreeMap::new();
        for raw in extractor.extract() {
            let key = keys.resolve(&raw.method, &raw.path, raw.declared_id.as_deref())?;
            entries.insert(key.clone(), EndpointRecord::from_raw(raw, key));
        }
        debug!(operations = entries.len(), "operation registry built");

        Ok(Self {
            entries,
            built_at: Utc::now(),
            fingerprint: store.fingerprint().clone(),
        })
    }

    /// Look up one operation by key
    pub fn lookup(&self, key: &str) -> Option<&EndpointRecord> {
        self.entries.get(key)
    }

    /// Find the operation for a method category and resource kind, e.g.
    /// `(List, "Pod")` finds `listNamespacedPod`. The kind match is a
    /// case-insensitive substring match on the key.
    pub fn find_by_method_and_kind(&self, category: MethodCategory, kind: &str) -> Option<&str> {
        let prefix = category.prefix_regex();
        let needle = kind.to_lowercase();
        self.entries
            .keys()
            .find(|key| prefix.is_match(key) && key.to_lowercase().contains(&needle))
            .map(String::as_str)
    }

    /// The nearest known key by fuzzy match, for not-found diagnostics
    pub fn suggest(&self, key: &str) -> Option<&str> {
        let matcher = SkimMatcherV2::default();
        self.entries
            .keys()
            .filter_map(|candidate| {
                // The query can be longer or shorter than the key it meant;
                // match in both orientations and keep the better score
                let score = matcher
                    .fuzzy_match(candidate, key)
                    .max(matcher.fuzzy_match(key, candidate))?;
                Some((score, candidate))
            })
            .max_by_key(|(score, _)| *score)
            .map(|(_, candidate)| candidate.as_str())
    }

    /// All operation keys, sorted
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// All endpoint records, sorted by key
    pub fn iter(&self) -> impl Iterator<Item = &EndpointRecord> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// When this registry was built
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Fingerprint of the document this registry was built from
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(doc: serde_json::Value) -> OperationRegistry {
        OperationRegistry::build(&DocumentStore::from_value(doc)).unwrap()
    }

    #[test]
    fn test_build_with_declared_id() {
        let registry = build(json!({
            "paths": {
                "/api/v1/pods": {
                    "get": { "operationId": "listPods", "summary": "List all pods" }
                }
            }
        }));
        assert_eq!(registry.len(), 1);
        let record = registry.lookup("listPods").unwrap();
        assert_eq!(record.method, "get");
        assert_eq!(record.path_template, "/api/v1/pods");
        assert_eq!(record.summary.as_deref(), Some("List all pods"));
    }

    #[test]
    fn test_build_synthesizes_key_without_id() {
        let registry = build(json!({
            "paths": {
                "/api/v1/pods": { "get": {} }
            }
        }));
        assert!(registry.lookup("get-api-v1-pods").is_some());
    }

    #[test]
    fn test_duplicate_declared_id_fails_build() {
        let result = OperationRegistry::build(&DocumentStore::from_value(json!({
            "paths": {
                "/pods": { "get": { "operationId": "listPods" } },
                "/nodes": { "get": { "operationId": "listPods" } }
            }
        })));
        assert!(matches!(
            result.unwrap_err(),
            RegistryError::DuplicateOperationKey { .. }
        ));
    }

    #[test]
    fn test_find_by_method_and_kind() {
        let registry = build(json!({
            "paths": {
                "/pods": { "get": { "operationId": "listNamespacedPod" } },
                "/pods/{name}": { "get": { "operationId": "readNamespacedPod" } }
            }
        }));
        assert_eq!(
            registry.find_by_method_and_kind(MethodCategory::List, "Pod"),
            Some("listNamespacedPod")
        );
        assert_eq!(
            registry.find_by_method_and_kind(MethodCategory::Get, "Pod"),
            Some("readNamespacedPod")
        );
        assert_eq!(
            registry.find_by_method_and_kind(MethodCategory::Delete, "Pod"),
            None
        );
    }

    #[test]
    fn test_method_category_parse() {
        assert_eq!("list".parse::<MethodCategory>().unwrap(), MethodCategory::List);
        let err = "watch".parse::<MethodCategory>().unwrap_err();
        assert!(matches!(err, RegistryError::UnknownMethodCategory { .. }));
    }

    #[test]
    fn test_suggest() {
        let registry = build(json!({
            "paths": {
                "/pods": { "get": { "operationId": "listNamespacedPod" } }
            }
        }));
        // Typos both longer and shorter than the real key resolve to it
        assert_eq!(registry.suggest("listNamespacedPods"), Some("listNamespacedPod"));
        assert_eq!(registry.suggest("listNamespaced"), Some("listNamespacedPod"));
        assert_eq!(registry.suggest("qqqq"), None);
    }

    #[test]
    fn test_prefix_regex_is_compiled_once() {
        let first = MethodCategory::List.prefix_regex();
        let second = MethodCategory::List.prefix_regex();
        assert!(std::ptr::eq(first, second));
        assert!(MethodCategory::Update.prefix_regex().is_match("patchNamespacedPod"));
    }

    #[test]
    fn test_empty_document_builds_empty_registry() {
        let registry = build(json!({}));
        assert!(registry.is_empty());
        assert!(registry.lookup("anything").is_none());
    }
}
