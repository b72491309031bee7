//! API Registry
//!
//! Ingests an OpenAPI-style interface description (a tree of path -> method
//! -> operation definitions plus a shared pool of named type definitions)
//! and produces two artifacts:
//!
//! - an **operation registry** mapping stable operation keys to endpoint
//!   metadata, and
//! - a **schema registry** that lazily compiles the document's type
//!   definitions - including self-referential and mutually-recursive ones -
//!   into resolved, validation-ready schemas, exactly once per name.
//!
//! ## Architecture
//!
//! ```text
//! document (serde_json tree)
//!   ├── DocumentStore ── path lookup, #/a/b/c reference resolution
//!   ├── EndpointExtractor ─┐
//!   │                      ├─► OperationRegistry  (syntactic layer, eager)
//!   │   OperationKeyResolver┘        │
//!   │                                │ schema names only
//!   └── SchemaResolver ◄──► SchemaRegistry  (semantic layer, lazy)
//! ```
//!
//! The two layers are joined only by schema-name references stored in
//! operation records; building the operation registry never compiles a
//! schema.

pub mod bindings;
pub mod config;
pub mod document;
pub mod endpoint;
pub mod error;
pub mod fingerprint;
pub mod graph;
pub mod operations;
pub mod opkey;
pub mod resolver;
pub mod schemas;

pub use bindings::{BindingSet, OperationBinding};
pub use config::RegistryConfig;
pub use document::DocumentStore;
pub use endpoint::{EndpointExtractor, EndpointRecord, ParameterDef, ParameterLocation};
pub use error::{RegistryError, Result};
pub use fingerprint::Fingerprint;
pub use graph::SchemaDependencyGraph;
pub use operations::{MethodCategory, OperationRegistry};
pub use opkey::{CollisionPolicy, OperationKeyResolver};
pub use resolver::{FieldSchema, PrimitiveKind, ResolvedSchema, SchemaResolver};
pub use schemas::{CompileReport, SchemaRegistry};
