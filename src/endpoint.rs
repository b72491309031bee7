//! Endpoint extraction
//!
//! Walks the `paths` section of a document and yields one raw endpoint per
//! (path, method) pair, with parameter and schema-name metadata attached.
//! This is pure structure reading - no schema compilation happens here, and
//! schema names are only ever lifted out of `$ref` strings.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::document::{reference_name, DocumentStore};

/// HTTP methods recognized under a path item
const METHODS: &[&str] = &["get", "put", "post", "delete", "options", "head", "patch"];

/// Extraction tuning, threaded in from `RegistryConfig`
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Media type whose schema is read from request/response bodies
    pub media_type: String,
    /// Successful status codes, tried in order, before falling back to the
    /// first declared response
    pub preferred_statuses: Vec<String>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            media_type: "application/json".to_string(),
            preferred_statuses: vec![
                "200".to_string(),
                "201".to_string(),
                "202".to_string(),
                "204".to_string(),
            ],
        }
    }
}

/// Where a parameter is carried in the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Body,
}

impl ParameterLocation {
    fn parse(location: &str) -> Option<Self> {
        match location {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "body" => Some(Self::Body),
            _ => None,
        }
    }
}

/// A single operation parameter, sourced verbatim from the document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDef {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    /// Raw schema subtree for the parameter value
    pub schema: Value,
}

/// Extractor output before operation keys are assigned
#[derive(Debug, Clone)]
pub struct RawEndpoint {
    pub method: String,
    pub path: String,
    pub declared_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub parameters: Vec<ParameterDef>,
    pub request_schema_ref: Option<String>,
    pub response_schema_ref: Option<String>,
}

/// An immutable registry entry for one (path, method) pair
#[derive(Debug, Clone, Serialize)]
pub struct EndpointRecord {
    pub method: String,
    pub path_template: String,
    pub operation_key: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub parameter_defs: Vec<ParameterDef>,
    /// Request body schema name, when the body carries a named reference
    pub request_schema_ref: Option<String>,
    /// First successful response schema name, when it is a named reference
    pub response_schema_ref: Option<String>,
}

impl EndpointRecord {
    pub fn from_raw(raw: RawEndpoint, operation_key: String) -> Self {
        Self {
            method: raw.method,
            path_template: raw.path,
            operation_key,
            summary: raw.summary,
            description: raw.description,
            parameter_defs: raw.parameters,
            request_schema_ref: raw.request_schema_ref,
            response_schema_ref: raw.response_schema_ref,
        }
    }
}

/// Walks the document's `paths` section
pub struct EndpointExtractor<'a> {
    store: &'a DocumentStore,
    options: ExtractOptions,
}

impl<'a> EndpointExtractor<'a> {
    pub fn new(store: &'a DocumentStore) -> Self {
        Self::with_options(store, ExtractOptions::default())
    }

    pub fn with_options(store: &'a DocumentStore, options: ExtractOptions) -> Self {
        Self { store, options }
    }

    /// Produce one raw endpoint per (path, method) pair.
    ///
    /// An absent or non-object `paths` value yields an empty sequence - a
    /// partial document degrades, it does not fail.
    pub fn extract(&self) -> Vec<RawEndpoint> {
        let paths = match self.store.get(&["paths"]) {
            Some(Value::Object(paths)) => paths,
            Some(_) => {
                warn!("'paths' is not an object; treating document as empty");
                return Vec::new();
            }
            None => {
                warn!("document has no 'paths' section");
                return Vec::new();
            }
        };

        let mut endpoints = Vec::new();
        for (path, item) in paths {
            let item = match item.as_object() {
                Some(item) => item,
                None => {
                    warn!(path, "skipping non-object path item");
                    continue;
                }
            };
            let shared_params = parse_parameters(item.get("parameters"));

            for method in METHODS {
                let operation = match item.get(*method).and_then(Value::as_object) {
                    Some(op) => op,
                    None => continue,
                };
                endpoints.push(self.extract_operation(path, method, operation, &shared_params));
            }
        }
        endpoints
    }

    fn extract_operation(
        &self,
        path: &str,
        method: &str,
        operation: &serde_json::Map<String, Value>,
        shared_params: &[ParameterDef],
    ) -> RawEndpoint {
        let mut parameters = shared_params.to_vec();
        for param in parse_parameters(operation.get("parameters")) {
            // Operation-level parameters override path-level ones
            match parameters
                .iter_mut()
                .find(|p| p.name == param.name && p.location == param.location)
            {
                Some(existing) => *existing = param,
                None => parameters.push(param),
            }
        }

        let request_schema_ref = self
            .request_body_ref(operation)
            .or_else(|| body_parameter_ref(&parameters));
        let response_schema_ref = self.response_ref(operation.get("responses"));

        RawEndpoint {
            method: method.to_string(),
            path: path.to_string(),
            declared_id: string_field(operation, "operationId"),
            summary: string_field(operation, "summary"),
            description: string_field(operation, "description"),
            parameters,
            request_schema_ref,
            response_schema_ref,
        }
    }

    /// v3 shape: `requestBody/content/<media>/schema/$ref`
    fn request_body_ref(&self, operation: &serde_json::Map<String, Value>) -> Option<String> {
        let schema = operation
            .get("requestBody")?
            .get("content")?
            .get(&self.options.media_type)?
            .get("schema")?;
        schema_ref_name(schema)
    }

    /// Pick the first successful response schema, preferring status codes in
    /// ascending order, then falling back to the first declared response.
    fn response_ref(&self, responses: Option<&Value>) -> Option<String> {
        let responses = responses?.as_object()?;

        let preferred = self
            .options
            .preferred_statuses
            .iter()
            .filter_map(|status| responses.get(status));
        let fallback = responses.values();

        for response in preferred.chain(fallback) {
            if let Some(name) = self.single_response_ref(response) {
                return Some(name);
            }
        }
        None
    }

    fn single_response_ref(&self, response: &Value) -> Option<String> {
        // v3 nests the schema under a media type; v2 puts it directly on the
        // response object
        let schema = response
            .get("content")
            .and_then(|content| content.get(&self.options.media_type))
            .and_then(|media| media.get("schema"))
            .or_else(|| response.get("schema"))?;
        schema_ref_name(schema)
    }
}

/// v2 shape: an `in: body` parameter carrying the request schema
fn body_parameter_ref(parameters: &[ParameterDef]) -> Option<String> {
    parameters
        .iter()
        .filter(|p| p.location == ParameterLocation::Body)
        .find_map(|p| schema_ref_name(&p.schema))
}

fn parse_parameters(parameters: Option<&Value>) -> Vec<ParameterDef> {
    let parameters = match parameters.and_then(Value::as_array) {
        Some(parameters) => parameters,
        None => return Vec::new(),
    };

    parameters
        .iter()
        .filter_map(|param| {
            let name = param.get("name").and_then(Value::as_str)?.to_string();
            let raw_location = param.get("in").and_then(Value::as_str).unwrap_or("query");
            let location = ParameterLocation::parse(raw_location).unwrap_or_else(|| {
                warn!(name, location = raw_location, "unknown parameter location, treating as query");
                ParameterLocation::Query
            });
            // Path parameters are always required regardless of what the
            // document claims
            let required = param.get("required").and_then(Value::as_bool).unwrap_or(false)
                || location == ParameterLocation::Path;
            let schema = param
                .get("schema")
                .cloned()
                .unwrap_or_else(|| param.clone());
            Some(ParameterDef {
                name,
                location,
                required,
                schema,
            })
        })
        .collect()
}

fn schema_ref_name(schema: &Value) -> Option<String> {
    let reference = schema.get("$ref")?.as_str()?;
    reference_name(reference).map(String::from)
}

fn string_field(object: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(doc: Value) -> Vec<RawEndpoint> {
        let store = DocumentStore::from_value(doc);
        EndpointExtractor::new(&store).extract()
    }

    #[test]
    fn test_missing_paths_yields_empty() {
        assert!(extract(json!({})).is_empty());
        assert!(extract(json!({"paths": 42})).is_empty());
        assert!(extract(json!({"paths": {"/x": "not an object"}})).is_empty());
    }

    #[test]
    fn test_one_endpoint_per_method() {
        let endpoints = extract(json!({
            "paths": {
                "/pods": {
                    "get": { "operationId": "listPods", "summary": "List all pods" },
                    "post": { "operationId": "createPod" }
                }
            }
        }));
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].method, "get");
        assert_eq!(endpoints[0].declared_id.as_deref(), Some("listPods"));
        assert_eq!(endpoints[0].summary.as_deref(), Some("List all pods"));
        assert_eq!(endpoints[1].method, "post");
    }

    #[test]
    fn test_path_level_parameters_merged() {
        let endpoints = extract(json!({
            "paths": {
                "/pods/{name}": {
                    "parameters": [
                        { "name": "name", "in": "path", "required": true, "schema": { "type": "string" } },
                        { "name": "pretty", "in": "query", "schema": { "type": "boolean" } }
                    ],
                    "get": {
                        "parameters": [
                            { "name": "pretty", "in": "query", "required": true, "schema": { "type": "string" } }
                        ]
                    }
                }
            }
        }));
        let params = &endpoints[0].parameters;
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].location, ParameterLocation::Path);
        assert!(params[0].required);
        // Operation-level definition replaced the path-level one
        let pretty = params.iter().find(|p| p.name == "pretty").unwrap();
        assert!(pretty.required);
        assert_eq!(pretty.schema["type"], "string");
    }

    #[test]
    fn test_response_status_preference() {
        let endpoints = extract(json!({
            "paths": {
                "/pods": {
                    "post": {
                        "responses": {
                            "500": { "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Error" } } } },
                            "201": { "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Pod" } } } }
                        }
                    }
                }
            }
        }));
        assert_eq!(endpoints[0].response_schema_ref.as_deref(), Some("Pod"));
    }

    #[test]
    fn test_response_falls_back_to_first_declared() {
        let endpoints = extract(json!({
            "paths": {
                "/pods": {
                    "get": {
                        "responses": {
                            "default": { "schema": { "$ref": "#/definitions/PodList" } }
                        }
                    }
                }
            }
        }));
        assert_eq!(endpoints[0].response_schema_ref.as_deref(), Some("PodList"));
    }

    #[test]
    fn test_inline_response_schema_has_no_name() {
        let endpoints = extract(json!({
            "paths": {
                "/pods": {
                    "get": {
                        "responses": {
                            "200": { "content": { "application/json": { "schema": { "type": "object" } } } }
                        }
                    }
                }
            }
        }));
        assert!(endpoints[0].response_schema_ref.is_none());
    }

    #[test]
    fn test_request_body_ref_v3() {
        let endpoints = extract(json!({
            "paths": {
                "/pods": {
                    "post": {
                        "requestBody": {
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Pod" } } }
                        }
                    }
                }
            }
        }));
        assert_eq!(endpoints[0].request_schema_ref.as_deref(), Some("Pod"));
    }

    #[test]
    fn test_request_body_ref_v2() {
        let endpoints = extract(json!({
            "paths": {
                "/pods": {
                    "post": {
                        "parameters": [
                            { "name": "body", "in": "body", "required": true,
                              "schema": { "$ref": "#/definitions/Pod" } }
                        ]
                    }
                }
            }
        }));
        assert_eq!(endpoints[0].request_schema_ref.as_deref(), Some("Pod"));
        assert_eq!(endpoints[0].parameters[0].location, ParameterLocation::Body);
    }
}
