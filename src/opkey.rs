//! Operation key resolution
//!
//! Derives a unique, stable identifier for each endpoint: a declared
//! operationId is used verbatim, otherwise a key is synthesized from the
//! method and normalized path. The resolver owns the issued-key set, so key
//! uniqueness is enforced at construction time rather than discovered at
//! lookup time.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::error::{RegistryError, Result};

/// What to do when two operations synthesize the same key
///
/// Declared operationId collisions always fail: an explicit id is author
/// intent, and two endpoints claiming it is a document bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Append a numeric suffix (`-2`, `-3`, ...) to the later key
    #[default]
    Disambiguate,
    /// Reject the document
    Fail,
}

/// Issues unique operation keys for a single registry build
#[derive(Debug, Default)]
pub struct OperationKeyResolver {
    issued: HashSet<String>,
    policy: CollisionPolicy,
}

impl OperationKeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: CollisionPolicy) -> Self {
        Self {
            issued: HashSet::new(),
            policy,
        }
    }

    /// Resolve the key for one endpoint
    pub fn resolve(&mut self, method: &str, path: &str, declared: Option<&str>) -> Result<String> {
        if let Some(declared) = declared.map(str::trim).filter(|id| !id.is_empty()) {
            if !self.issued.insert(declared.to_string()) {
                return Err(RegistryError::DuplicateOperationKey {
                    key: declared.to_string(),
                    method: method.to_string(),
                    path: path.to_string(),
                });
            }
            return Ok(declared.to_string());
        }

        let base = format!("{}-{}", method, normalize_path(path));
        if self.issued.insert(base.clone()) {
            return Ok(base);
        }

        match self.policy {
            CollisionPolicy::Fail => Err(RegistryError::DuplicateOperationKey {
                key: base,
                method: method.to_string(),
                path: path.to_string(),
            }),
            CollisionPolicy::Disambiguate => {
                let mut index = 2;
                loop {
                    let candidate = format!("{}-{}", base, index);
                    if self.issued.insert(candidate.clone()) {
                        debug!(method, path, key = candidate, "disambiguated colliding key");
                        return Ok(candidate);
                    }
                    index += 1;
                }
            }
        }
    }
}

/// Normalize a path template into a key fragment: strip the leading
/// separator, replace every character outside `[A-Za-z0-9]` with a hyphen,
/// collapse repeated hyphens, and trim hyphens at the edges.
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for ch in path.trim_start_matches('/').chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}
