//! Schema registry
//!
//! Memoizing cache of resolved schemas keyed by type name. Names compile
//! lazily on first access, and the pending/ready cell state guarantees
//! at-most-one compilation per name even under concurrent first access -
//! a per-name claim, not a global lock, so unrelated names compile in
//! parallel.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use tracing::debug;

use crate::document::DocumentStore;
use crate::error::{RegistryError, Result};
use crate::resolver::{ResolvedSchema, SchemaResolver};

/// Compilation state of one name
///
/// `Pending` exists only while a compilation is in flight; a cycle hitting
/// a pending name short-circuits to `NamedRef` instead of recursing, and a
/// top-level `get` on a pending name waits for the in-flight result.
enum CellState {
    Pending,
    Ready(Arc<ResolvedSchema>),
    /// Resolution failed on this reference; remembered so the failure is
    /// surfaced again when the name is requested
    Failed(String),
}

/// Outcome of claiming a name for compilation
pub(crate) enum Claim {
    /// Already compiled
    Ready,
    /// A compilation is active (this thread's traversal or another's)
    Active,
    /// Previously failed on this reference
    Failed(String),
    /// The claim is granted; the caller must `finish` or `fail` the name
    Granted,
}

/// Lazily-compiling, memoizing schema registry
pub struct SchemaRegistry {
    store: Arc<DocumentStore>,
    cells: Mutex<HashMap<String, CellState>>,
    settled: Condvar,
}

/// Result of a `compile_all` warm-up pass
#[derive(Debug, Default)]
pub struct CompileReport {
    pub compiled: Vec<String>,
    pub failures: Vec<(String, RegistryError)>,
}

impl SchemaRegistry {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self {
            store,
            cells: Mutex::new(HashMap::new()),
            settled: Condvar::new(),
        }
    }

    /// The document store this registry compiles from
    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    /// Get the resolved schema for a name, compiling it on first access.
    ///
    /// Repeated calls return the identical cached `Arc`. If another caller
    /// is compiling the name right now, this blocks until that compilation
    /// settles rather than starting a second one.
    pub fn get(&self, name: &str) -> Result<Arc<ResolvedSchema>> {
        let mut cells = self.cells.lock().expect("schema registry poisoned");
        loop {
            match cells.get(name) {
                Some(CellState::Ready(schema)) => return Ok(schema.clone()),
                Some(CellState::Failed(reference)) => {
                    return Err(RegistryError::UnresolvedReference {
                        reference: reference.clone(),
                    })
                }
                Some(CellState::Pending) => {
                    cells = self.settled.wait(cells).expect("schema registry poisoned");
                }
                None => {
                    cells.insert(name.to_string(), CellState::Pending);
                    break;
                }
            }
        }
        drop(cells);

        debug!(name, "compiling schema");
        match self.compile(name) {
            Ok(schema) => {
                self.settle(name, CellState::Ready(schema.clone()));
                Ok(schema)
            }
            Err(err) => {
                let reference = match &err {
                    RegistryError::UnresolvedReference { reference } => reference.clone(),
                    _ => name.to_string(),
                };
                self.settle(name, CellState::Failed(reference));
                Err(err)
            }
        }
    }

    /// Register a schema programmatically, replacing any existing entry
    pub fn register(&self, name: impl Into<String>, schema: ResolvedSchema) {
        self.settle(&name.into(), CellState::Ready(Arc::new(schema)));
    }

    /// Drop every cached entry
    pub fn clear(&self) {
        self.cells.lock().expect("schema registry poisoned").clear();
        self.settled.notify_all();
    }

    /// Whether a name has a compiled (terminal, successful) entry
    pub fn is_ready(&self, name: &str) -> bool {
        matches!(
            self.cells.lock().expect("schema registry poisoned").get(name),
            Some(CellState::Ready(_))
        )
    }

    /// Compile every name in the document's schema pool, continuing past
    /// per-name failures. One broken type definition does not make the rest
    /// of the document unusable.
    pub fn compile_all(&self) -> CompileReport {
        let names: Vec<String> = self
            .store
            .schema_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut report = CompileReport::default();
        for name in names {
            match self.get(&name) {
                Ok(_) => report.compiled.push(name),
                Err(err) => report.failures.push((name, err)),
            }
        }
        report
    }

    fn compile(&self, name: &str) -> Result<Arc<ResolvedSchema>> {
        let node = self
            .store
            .schema_node(name)
            .ok_or_else(|| RegistryError::UnresolvedReference {
                reference: name.to_string(),
            })?;

        let resolver = SchemaResolver::new(&self.store, self);
        let mut visiting = std::collections::HashSet::from([name.to_string()]);
        resolver.resolve(node, &mut visiting).map(Arc::new)
    }

    /// Claim a name for inline compilation during a traversal
    pub(crate) fn claim(&self, name: &str) -> Claim {
        let mut cells = self.cells.lock().expect("schema registry poisoned");
        match cells.get(name) {
            Some(CellState::Ready(_)) => Claim::Ready,
            Some(CellState::Pending) => Claim::Active,
            Some(CellState::Failed(reference)) => Claim::Failed(reference.clone()),
            None => {
                cells.insert(name.to_string(), CellState::Pending);
                Claim::Granted
            }
        }
    }

    /// Settle a granted claim with a compiled schema
    pub(crate) fn finish(&self, name: &str, schema: ResolvedSchema) {
        self.settle(name, CellState::Ready(Arc::new(schema)));
    }

    /// Settle a granted claim with a failure
    pub(crate) fn fail(&self, name: &str, reference: &str) {
        self.settle(name, CellState::Failed(reference.to_string()));
    }

    fn settle(&self, name: &str, state: CellState) {
        let mut cells = self.cells.lock().expect("schema registry poisoned");
        cells.insert(name.to_string(), state);
        // Wake anyone parked on a pending cell
        self.settled.notify_all();
    }
}
