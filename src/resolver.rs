//! Schema resolution
//!
//! Converts raw type-definition nodes (possibly containing `$ref`,
//! `allOf`/`oneOf`/`anyOf`, nested objects and arrays) into `ResolvedSchema`
//! values, resolving references against the document store and breaking
//! cycles.
//!
//! The resolver is total over its input domain: a malformed or empty
//! fragment degrades to `Any`, never to an error. The only failure mode is
//! a dangling reference.
//!
//! Cycle breaking: a reference to a name that is already being resolved
//! (either by this traversal's `visiting` set or by a compilation active in
//! the registry) short-circuits to `NamedRef` instead of recursing. This
//! bounds recursion depth to the number of distinct type names, so
//! resolution terminates by construction.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::warn;

use crate::document::{reference_name, DocumentStore};
use crate::error::{RegistryError, Result};
use crate::schemas::{Claim, SchemaRegistry};

/// Primitive value kinds
///
/// Formats refine precision only (int32/int64 both land on `Integer`); the
/// format string is carried through untouched for consumers that care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl PrimitiveKind {
    pub fn from_type(type_str: &str) -> Option<Self> {
        match type_str {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }
}

/// One field of a resolved object schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSchema {
    pub name: String,
    pub schema: ResolvedSchema,
    /// Not listed in the object's `required` set
    pub optional: bool,
}

/// A fully resolved schema
///
/// Contains no raw reference strings - only `NamedRef` nodes pointing at
/// names resolvable through the schema registry. `NamedRef` marks the
/// back-edge wherever a cycle was broken or a name was already compiled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ResolvedSchema {
    /// Accepts anything; the degraded form of empty or unrecognized nodes
    Any,
    Primitive {
        kind: PrimitiveKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
    Array {
        items: Box<ResolvedSchema>,
    },
    Object {
        fields: Vec<FieldSchema>,
    },
    /// String-keyed dictionary
    Map {
        values: Box<ResolvedSchema>,
    },
    Union {
        variants: Vec<ResolvedSchema>,
    },
    /// `allOf` whose members could not be merged into a single object; an
    /// approximation tag carrying the member list, not an intersection type
    AllOf {
        members: Vec<ResolvedSchema>,
    },
    /// Back-edge to a named type, resolvable through the registry
    NamedRef {
        name: String,
    },
}

impl ResolvedSchema {
    pub fn named_ref(name: impl Into<String>) -> Self {
        Self::NamedRef { name: name.into() }
    }

    /// Count `NamedRef` nodes pointing at `name` anywhere in this graph
    pub fn count_refs_to(&self, name: &str) -> usize {
        match self {
            Self::NamedRef { name: n } => usize::from(n == name),
            Self::Array { items } | Self::Map { values: items } => items.count_refs_to(name),
            Self::Object { fields } => fields.iter().map(|f| f.schema.count_refs_to(name)).sum(),
            Self::Union { variants } | Self::AllOf { members: variants } => {
                variants.iter().map(|v| v.count_refs_to(name)).sum()
            }
            Self::Any | Self::Primitive { .. } => 0,
        }
    }

    /// Whether this graph contains any `NamedRef` node at all
    pub fn has_named_refs(&self) -> bool {
        match self {
            Self::NamedRef { .. } => true,
            Self::Array { items } | Self::Map { values: items } => items.has_named_refs(),
            Self::Object { fields } => fields.iter().any(|f| f.schema.has_named_refs()),
            Self::Union { variants } | Self::AllOf { members: variants } => {
                variants.iter().any(ResolvedSchema::has_named_refs)
            }
            Self::Any | Self::Primitive { .. } => false,
        }
    }
}

/// Resolves raw schema nodes against a document store, memoizing named
/// types through the registry
pub struct SchemaResolver<'a> {
    store: &'a DocumentStore,
    registry: &'a SchemaRegistry,
}

impl<'a> SchemaResolver<'a> {
    pub fn new(store: &'a DocumentStore, registry: &'a SchemaRegistry) -> Self {
        Self { store, registry }
    }

    /// Resolve one node. `visiting` holds the names on the active resolution
    /// path; a reference back into it becomes a `NamedRef` instead of a
    /// recursive expansion.
    pub fn resolve(&self, node: &Value, visiting: &mut HashSet<String>) -> Result<ResolvedSchema> {
        if let Some(reference) = node.get("$ref").and_then(Value::as_str) {
            return self.resolve_reference(reference, visiting);
        }

        if let Some(variants) = union_members(node) {
            let variants = variants
                .iter()
                .map(|variant| self.resolve(variant, visiting))
                .collect::<Result<Vec<_>>>()?;
            return Ok(ResolvedSchema::Union { variants });
        }

        if let Some(members) = node.get("allOf").and_then(Value::as_array) {
            return self.resolve_all_of(members, visiting);
        }

        let type_str = node.get("type").and_then(Value::as_str);
        match type_str {
            Some("object") => self.resolve_object(node, visiting),
            Some("array") => self.resolve_array(node, visiting),
            Some(other) => Ok(resolve_primitive(node, other)),
            // Untyped nodes with object structure still resolve as objects;
            // anything else degrades to Any
            None if node.get("properties").is_some()
                || node.get("additionalProperties").is_some() =>
            {
                self.resolve_object(node, visiting)
            }
            None => Ok(ResolvedSchema::Any),
        }
    }

    fn resolve_reference(
        &self,
        reference: &str,
        visiting: &mut HashSet<String>,
    ) -> Result<ResolvedSchema> {
        let name = match reference_name(reference) {
            Some(name) => name.to_string(),
            None => {
                return Err(RegistryError::UnresolvedReference {
                    reference: reference.to_string(),
                })
            }
        };

        // Active on this traversal path: emit the back-edge
        if visiting.contains(&name) {
            return Ok(ResolvedSchema::named_ref(name));
        }

        match self.registry.claim(&name) {
            // Compiled already, or compiling elsewhere right now - either
            // way the name stands for itself
            Claim::Ready | Claim::Active => Ok(ResolvedSchema::named_ref(name)),
            Claim::Failed(reference) => Err(RegistryError::UnresolvedReference { reference }),
            Claim::Granted => {
                let target = match self.store.resolve(reference) {
                    Some(target) => target,
                    None => {
                        warn!(reference, "dangling schema reference");
                        self.registry.fail(&name, reference);
                        return Err(RegistryError::UnresolvedReference {
                            reference: reference.to_string(),
                        });
                    }
                };

                visiting.insert(name.clone());
                let resolved = self.resolve(target, visiting);
                visiting.remove(&name);

                match resolved {
                    // Store the compiled form and embed it inline: an
                    // acyclic resolution contains no ref nodes at all, and
                    // NamedRef appears only where a cycle was broken or a
                    // name had already settled
                    Ok(schema) => {
                        self.registry.finish(&name, schema.clone());
                        Ok(schema)
                    }
                    Err(err) => {
                        // The claim must not stay pending, or waiters hang
                        self.registry.fail(&name, failed_reference(&err, reference));
                        Err(err)
                    }
                }
            }
        }
    }

    /// allOf: merge into a single object when every member is an object
    /// (later members override earlier fields on name collision); otherwise
    /// keep the member list under an `AllOf` tag.
    fn resolve_all_of(
        &self,
        members: &[Value],
        visiting: &mut HashSet<String>,
    ) -> Result<ResolvedSchema> {
        let members = members
            .iter()
            .map(|member| self.resolve(member, visiting))
            .collect::<Result<Vec<_>>>()?;

        let all_objects = members
            .iter()
            .all(|member| matches!(member, ResolvedSchema::Object { .. }));
        if !all_objects {
            return Ok(ResolvedSchema::AllOf { members });
        }

        let mut merged: Vec<FieldSchema> = Vec::new();
        for member in members {
            let ResolvedSchema::Object { fields } = member else {
                unreachable!("checked all members are objects");
            };
            for field in fields {
                match merged.iter_mut().find(|f| f.name == field.name) {
                    Some(existing) => *existing = field,
                    None => merged.push(field),
                }
            }
        }
        Ok(ResolvedSchema::Object { fields: merged })
    }

    fn resolve_object(
        &self,
        node: &Value,
        visiting: &mut HashSet<String>,
    ) -> Result<ResolvedSchema> {
        if let Some(properties) = node.get("properties").and_then(Value::as_object) {
            if !properties.is_empty() {
                let required: HashSet<&str> = node
                    .get("required")
                    .and_then(Value::as_array)
                    .map(|names| names.iter().filter_map(Value::as_str).collect())
                    .unwrap_or_default();

                let fields = properties
                    .iter()
                    .map(|(name, prop)| {
                        Ok(FieldSchema {
                            name: name.clone(),
                            schema: self.resolve(prop, visiting)?,
                            optional: !required.contains(name.as_str()),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                return Ok(ResolvedSchema::Object { fields });
            }
        }

        match node.get("additionalProperties") {
            // Open dictionary: any string key, any value
            Some(Value::Bool(true)) => Ok(ResolvedSchema::Map {
                values: Box::new(ResolvedSchema::Any),
            }),
            Some(Value::Bool(false)) | None => Ok(ResolvedSchema::Object { fields: Vec::new() }),
            Some(value_schema) => Ok(ResolvedSchema::Map {
                values: Box::new(self.resolve(value_schema, visiting)?),
            }),
        }
    }

    fn resolve_array(&self, node: &Value, visiting: &mut HashSet<String>) -> Result<ResolvedSchema> {
        let items = match node.get("items") {
            Some(Value::Array(_)) => {
                warn!("tuple-form 'items' is not modeled; treating items as any");
                ResolvedSchema::Any
            }
            Some(items) => self.resolve(items, visiting)?,
            None => ResolvedSchema::Any,
        };
        Ok(ResolvedSchema::Array {
            items: Box::new(items),
        })
    }
}

fn union_members(node: &Value) -> Option<&Vec<Value>> {
    node.get("oneOf")
        .or_else(|| node.get("anyOf"))
        .and_then(Value::as_array)
}

fn resolve_primitive(node: &Value, type_str: &str) -> ResolvedSchema {
    match PrimitiveKind::from_type(type_str) {
        Some(kind) => ResolvedSchema::Primitive {
            kind,
            format: node.get("format").and_then(Value::as_str).map(String::from),
        },
        None => ResolvedSchema::Any,
    }
}

fn failed_reference<'a>(err: &'a RegistryError, fallback: &'a str) -> &'a str {
    match err {
        RegistryError::UnresolvedReference { reference } => reference,
        _ => fallback,
    }
}
