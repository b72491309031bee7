//! Schema dependency graph
//!
//! Directed graph over the document's schema pool with one edge per `$ref`
//! between named types. A diagnostic companion to resolution: cycle groups
//! show exactly where the resolver will emit back-edges, and dangling
//! targets show which names will fail to compile.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde_json::Value;
use std::collections::HashMap;

use crate::document::{reference_name, DocumentStore};

/// Dependency graph of named schema definitions
pub struct SchemaDependencyGraph {
    graph: DiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
    dangling: Vec<(String, String)>,
}

impl SchemaDependencyGraph {
    /// Build the graph from a document's schema pool
    pub fn from_store(store: &DocumentStore) -> Self {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        let mut dangling = Vec::new();

        let pool: Vec<(String, Value)> = store
            .schema_pool()
            .map(|pool| pool.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        for (name, _) in &pool {
            let node = graph.add_node(name.clone());
            index.insert(name.clone(), node);
        }

        for (name, definition) in &pool {
            let from = index[name];
            let mut targets = Vec::new();
            collect_ref_targets(definition, &mut targets);
            for target in targets {
                match index.get(&target) {
                    Some(&to) => {
                        if graph.find_edge(from, to).is_none() {
                            graph.add_edge(from, to, ());
                        }
                    }
                    None => dangling.push((name.clone(), target)),
                }
            }
        }

        Self {
            graph,
            index,
            dangling,
        }
    }

    /// Cyclic groups: strongly connected components of size > 1, plus
    /// self-referential single names. Groups and members are sorted for
    /// stable output.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut cycles: Vec<Vec<String>> = petgraph::algo::tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || self.graph.find_edge(scc[0], scc[0]).is_some()
            })
            .map(|scc| {
                let mut names: Vec<String> =
                    scc.iter().map(|&n| self.graph[n].clone()).collect();
                names.sort();
                names
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Names this definition references directly
    pub fn direct_dependencies(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Names whose definitions reference this one
    pub fn dependents(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Incoming)
    }

    /// References whose target is not in the schema pool, as
    /// `(referencing name, missing target)` pairs
    pub fn dangling(&self) -> &[(String, String)] {
        &self.dangling
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn schema_count(&self) -> usize {
        self.graph.node_count()
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Vec<&str> {
        let Some(&node) = self.index.get(name) else {
            return Vec::new();
        };
        let mut names: Vec<&str> = self
            .graph
            .neighbors_directed(node, direction)
            .map(|n| self.graph[n].as_str())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Collect every `$ref` target name reachable in a definition subtree
fn collect_ref_targets(node: &Value, out: &mut Vec<String>) {
    match node {
        Value::Object(map) => {
            if let Some(name) = map
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(reference_name)
            {
                out.push(name.to_string());
            }
            for value in map.values() {
                collect_ref_targets(value, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_ref_targets(item, out);
            }
        }
        _ => {}
    }
}
