//! Document store
//!
//! Holds a parsed interface description as an in-memory JSON tree and offers
//! path-based lookup plus `#/a/b/c` reference resolution. No business logic
//! lives here - extraction and schema resolution only read through it.

use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{RegistryError, Result};
use crate::fingerprint::Fingerprint;

/// Locations where the document keeps its named type definitions
const SCHEMA_POOLS: &[&[&str]] = &[&["components", "schemas"], &["definitions"]];

/// An in-memory interface description document
pub struct DocumentStore {
    root: Value,
    fingerprint: Fingerprint,
    pool: Option<&'static [&'static str]>,
}

impl DocumentStore {
    /// Wrap an already-parsed document
    pub fn from_value(root: Value) -> Self {
        let fingerprint = Fingerprint::from_json(&root);
        let pool = SCHEMA_POOLS
            .iter()
            .copied()
            .find(|segments| lookup(&root, segments).map(Value::is_object).unwrap_or(false));
        match pool {
            Some(segments) => debug!(pool = segments.join("/"), "located schema pool"),
            None => debug!("document has no schema pool"),
        }
        Self {
            root,
            fingerprint,
            pool,
        }
    }

    /// Load a document from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        content.parse()
    }

    /// The raw document tree
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Fingerprint of the document this store was built from
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Look up a node by path segments
    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        lookup(&self.root, path)
    }

    /// Resolve a `#/a/b/c` reference string to the node it points at
    pub fn resolve(&self, reference: &str) -> Option<&Value> {
        let pointer = reference.strip_prefix('#')?;
        let mut node = &self.root;
        for segment in pointer.split('/').skip(1) {
            let key = unescape_segment(segment);
            node = node.get(&*key)?;
        }
        Some(node)
    }

    /// The schema pool (named type definitions), if the document has one
    pub fn schema_pool(&self) -> Option<&serde_json::Map<String, Value>> {
        let segments = self.pool?;
        lookup(&self.root, segments).and_then(Value::as_object)
    }

    /// Raw definition node for a named type
    pub fn schema_node(&self, name: &str) -> Option<&Value> {
        self.schema_pool().and_then(|pool| pool.get(name))
    }

    /// Names of all type definitions in the schema pool, in document order
    pub fn schema_names(&self) -> Vec<&str> {
        self.schema_pool()
            .map(|pool| pool.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

impl std::str::FromStr for DocumentStore {
    type Err = RegistryError;

    /// Parse a document from a JSON string
    fn from_str(content: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(content)?;
        Ok(Self::from_value(root))
    }
}

/// Extract the target name from a reference string (its last segment)
pub fn reference_name(reference: &str) -> Option<&str> {
    reference
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && *name != "#")
}

fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut node = root;
    for segment in path {
        node = node.get(segment)?;
    }
    Some(node)
}

/// Unescape a JSON-pointer segment (`~1` -> `/`, `~0` -> `~`)
fn unescape_segment(segment: &str) -> std::borrow::Cow<'_, str> {
    if segment.contains('~') {
        std::borrow::Cow::Owned(segment.replace("~1", "/").replace("~0", "~"))
    } else {
        std::borrow::Cow::Borrowed(segment)
    }
}
