//! Document fingerprinting
//!
//! A registry built from a document carries the fingerprint of that exact
//! document, so stale registries are detectable after a document swap.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA256 fingerprint of a document's canonical JSON form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute a fingerprint from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute a fingerprint from a JSON value
    ///
    /// serde_json serializes maps in insertion order, which is stable for a
    /// tree parsed from a single source, so two loads of the same document
    /// fingerprint identically.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let canonical = serde_json::to_string(value).unwrap_or_default();
        Self::from_bytes(canonical.as_bytes())
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether a JSON value matches this fingerprint
    pub fn matches(&self, value: &serde_json::Value) -> bool {
        Self::from_json(value) == *self
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fingerprint_stable() {
        let doc = json!({"paths": {"/pods": {"get": {}}}});
        assert_eq!(Fingerprint::from_json(&doc), Fingerprint::from_json(&doc));
    }

    #[test]
    fn test_fingerprint_distinguishes_documents() {
        let a = json!({"paths": {"/pods": {}}});
        let b = json!({"paths": {"/nodes": {}}});
        assert_ne!(Fingerprint::from_json(&a), Fingerprint::from_json(&b));
    }

    #[test]
    fn test_fingerprint_matches() {
        let doc = json!({"definitions": {}});
        let fp = Fingerprint::from_json(&doc);
        assert!(fp.matches(&doc));
        assert!(!fp.matches(&json!({"definitions": {"A": {}}})));
    }
}
