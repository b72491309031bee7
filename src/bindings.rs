//! Operation bindings
//!
//! An explicit builder replacing generated wrapper functions: iterate the
//! operation registry once and populate a map of ergonomic callable name to
//! bound operation metadata, each with an assembled documentation string.
//! Consumers (an HTTP invocation helper, a code generator) read these
//! records; nothing here performs a request.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::endpoint::EndpointRecord;
use crate::operations::OperationRegistry;

/// One callable-shaped view of a registry entry
#[derive(Debug, Clone, Serialize)]
pub struct OperationBinding {
    /// snake_case callable name derived from the operation key
    pub name: String,
    /// The registry key this binding resolves through
    pub key: String,
    pub method: String,
    pub path_template: String,
    /// Assembled documentation string
    pub doc: String,
}

/// All bindings for a registry, keyed by callable name
#[derive(Debug, Default)]
pub struct BindingSet {
    bindings: BTreeMap<String, OperationBinding>,
}

impl BindingSet {
    /// Build one binding per registry entry
    pub fn build(registry: &OperationRegistry) -> Self {
        let mut bindings = BTreeMap::new();
        for record in registry.iter() {
            let base = to_snake_case(&record.operation_key);
            // Distinct keys can lower to the same name (listPods vs
            // list_pods); suffix the later one
            let mut name = base.clone();
            let mut index = 2;
            while bindings.contains_key(&name) {
                name = format!("{}_{}", base, index);
                index += 1;
            }
            let binding = OperationBinding {
                name: name.clone(),
                key: record.operation_key.clone(),
                method: record.method.clone(),
                path_template: record.path_template.clone(),
                doc: build_doc(record),
            };
            bindings.insert(name, binding);
        }
        Self { bindings }
    }

    pub fn get(&self, name: &str) -> Option<&OperationBinding> {
        self.bindings.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationBinding> {
        self.bindings.values()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

fn build_doc(record: &EndpointRecord) -> String {
    let mut doc = String::new();
    if let Some(summary) = &record.summary {
        doc.push_str(summary);
    } else {
        doc.push_str(&format!(
            "{} {}",
            record.method.to_uppercase(),
            record.path_template
        ));
    }
    if let Some(description) = &record.description {
        doc.push_str("\n\n");
        doc.push_str(description);
    }
    if !record.parameter_defs.is_empty() {
        doc.push_str("\n\nParameters:");
        for param in &record.parameter_defs {
            doc.push_str(&format!(
                "\n- {} ({:?}{})",
                param.name,
                param.location,
                if param.required { ", required" } else { "" }
            ));
        }
    }
    doc
}

fn to_snake_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 4);
    let mut prev_lower = false;
    for ch in input.chars() {
        if ch.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower = false;
        } else if ch.is_ascii_alphanumeric() {
            out.push(ch);
            prev_lower = true;
        } else {
            if !out.ends_with('_') && !out.is_empty() {
                out.push('_');
            }
            prev_lower = false;
        }
    }
    out.trim_end_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentStore;
    use serde_json::json;

    fn bindings(doc: serde_json::Value) -> BindingSet {
        let store = DocumentStore::from_value(doc);
        BindingSet::build(&OperationRegistry::build(&store).unwrap())
    }

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("listNamespacedPod"), "list_namespaced_pod");
        assert_eq!(to_snake_case("get-api-v1-pods"), "get_api_v1_pods");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn test_one_binding_per_operation() {
        let set = bindings(json!({
            "paths": {
                "/pods": {
                    "get": {
                        "operationId": "listNamespacedPod",
                        "summary": "List all pods",
                        "description": "Returns every pod in the namespace.",
                        "parameters": [
                            { "name": "namespace", "in": "path", "required": true }
                        ]
                    }
                }
            }
        }));
        assert_eq!(set.len(), 1);
        let binding = set.get("list_namespaced_pod").unwrap();
        assert_eq!(binding.key, "listNamespacedPod");
        assert_eq!(binding.method, "get");
        assert!(binding.doc.starts_with("List all pods"));
        assert!(binding.doc.contains("namespace"));
        assert!(binding.doc.contains("required"));
    }

    #[test]
    fn test_doc_falls_back_to_method_and_path() {
        let set = bindings(json!({
            "paths": { "/pods": { "get": {} } }
        }));
        let binding = set.get("get_pods").unwrap();
        assert!(binding.doc.contains("GET /pods"));
    }

    #[test]
    fn test_colliding_names_are_suffixed() {
        let set = bindings(json!({
            "paths": {
                "/pods": { "get": { "operationId": "listPods" } },
                "/pods2": { "get": { "operationId": "list_pods" } }
            }
        }));
        assert_eq!(set.len(), 2);
        assert!(set.get("list_pods").is_some());
        assert!(set.get("list_pods_2").is_some());
    }
}
