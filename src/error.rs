//! Error types for the operation and schema registries

use thiserror::Error;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Registry errors
///
/// A missing operation key is not represented here: `lookup` returns an
/// `Option`, pushing the "is this operation real" decision to the caller.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Malformed document: {detail}")]
    MalformedDocument { detail: String },

    #[error("Duplicate operation key '{key}' for {method} {path}")]
    DuplicateOperationKey {
        key: String,
        method: String,
        path: String,
    },

    #[error("Unresolved reference: {reference}")]
    UnresolvedReference { reference: String },

    #[error("Unknown method category '{category}' (expected get, list, create, update, or delete)")]
    UnknownMethodCategory { category: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}
