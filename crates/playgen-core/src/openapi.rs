//! OpenAPI specification parsing and utilities.
//!
//! This module provides functionality for loading and querying Swagger 2.0 and
//! OpenAPI 3.x specifications. It supports loading from files or URLs, in JSON
//! or YAML, and exposes the operations and model definitions the generator
//! consumes.
//!
//! # Examples
//!
//! ```no_run
//! use playgen_core::openapi::OpenApiContext;
//! use playgen_core::error::Result;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! // Load an OpenAPI spec from a file
//! let spec = OpenApiContext::from_file("petstore.yaml").await?;
//!
//! // Access common fields
//! if let Some(title) = spec.title() {
//!     println!("API Title: {}", title);
//! }
//! for op in spec.parse_operations()? {
//!     println!("{} {}", op.method, op.path);
//! }
//! # Ok(())
//! # }
//! ```

// Internal imports (std, crate)
use std::collections::HashMap;
use std::path::Path;

use crate::Error;

// External imports (alphabetized)
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tokio::fs;

const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

static UNICODE_PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[‘’“”—]").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Represents an OpenAPI specification
#[derive(Debug, Clone, serde::Serialize)]
#[serde(transparent)]
pub struct OpenApiContext {
    /// The raw JSON value of the OpenAPI spec
    pub json: JsonValue,
}

impl OpenApiContext {
    /// Wrap an already parsed document
    pub fn new(json: JsonValue) -> Self {
        Self { json }
    }

    /// Create a new spec from a file or URL (supports both YAML and JSON)
    pub async fn from_file_or_url<P: AsRef<str>>(location: P) -> crate::Result<Self> {
        let location = location.as_ref();

        if location.starts_with("http://") || location.starts_with("https://") {
            return Self::from_url(location).await;
        }

        Self::from_file(location).await
    }

    /// Create a new spec from a file (supports both YAML and JSON)
    pub async fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        Self::parse_content(&content).map_err(|e| {
            crate::Error::openapi(format!(
                "Failed to parse OpenAPI spec at {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Create a new spec from a URL (supports both YAML and JSON)
    pub async fn from_url(url: &str) -> crate::Result<Self> {
        let response = reqwest::get(url).await.map_err(|e| {
            crate::Error::openapi(format!("Failed to fetch OpenAPI spec from {}: {}", url, e))
        })?;

        if !response.status().is_success() {
            return Err(crate::Error::openapi(format!(
                "Failed to fetch OpenAPI spec from {}: HTTP {}",
                url,
                response.status()
            )));
        }

        let content = response.text().await.map_err(|e| {
            crate::Error::openapi(format!("Failed to read response from {}: {}", url, e))
        })?;

        Self::parse_content(&content).map_err(|e| {
            crate::Error::openapi(format!("Failed to parse OpenAPI spec from {}: {}", url, e))
        })
    }

    /// Parse content as either JSON or YAML
    pub fn parse_content(content: &str) -> Result<Self, String> {
        if let Ok(json) = serde_json::from_str::<JsonValue>(content) {
            return Self::checked(json);
        }

        match serde_yaml::from_str::<JsonValue>(content) {
            Ok(json) => Self::checked(json),
            Err(_) => Err("content is neither valid JSON nor YAML".to_string()),
        }
    }

    fn checked(json: JsonValue) -> Result<Self, String> {
        if !json.is_object() {
            return Err("document root must be an object".to_string());
        }
        if json.get("swagger").is_none() && json.get("openapi").is_none() {
            return Err("missing 'swagger' or 'openapi' version field".to_string());
        }
        Ok(Self { json })
    }

    /// Get a reference to the raw JSON value
    pub fn as_json(&self) -> &JsonValue {
        &self.json
    }

    /// Get the title of the API
    pub fn title(&self) -> Option<&str> {
        self.json.get("info")?.get("title")?.as_str()
    }

    /// Get the version of the API
    pub fn version(&self) -> Option<&str> {
        self.json.get("info")?.get("version")?.as_str()
    }

    /// Get the description of the API
    pub fn description(&self) -> Option<&str> {
        self.json.get("info")?.get("description")?.as_str()
    }

    /// Get the full base URL of the API
    pub fn base_url(&self) -> Option<String> {
        // OpenAPI 3.0+ servers
        if let Some(url) = self
            .json
            .get("servers")
            .and_then(JsonValue::as_array)
            .and_then(|servers| servers.first())
            .and_then(|server| server.get("url"))
            .and_then(JsonValue::as_str)
        {
            return Some(url.to_string());
        }

        // Swagger 2.0 host + basePath
        let host = self.json.get("host").and_then(JsonValue::as_str)?;
        let base_path = self
            .json
            .get("basePath")
            .and_then(JsonValue::as_str)
            .unwrap_or("");
        let scheme = match self.json.get("schemes").and_then(JsonValue::as_array) {
            Some(schemes) if schemes.iter().any(|s| s.as_str() == Some("https")) => "https",
            Some(schemes) => schemes
                .first()
                .and_then(JsonValue::as_str)
                .unwrap_or("https"),
            None => "https",
        };
        Some(format!("{}://{}{}", scheme, host, base_path))
    }

    /// Path prefix shared by every operation (`/v2`), without a trailing slash
    pub fn base_path(&self) -> String {
        if let Some(base) = self.json.get("basePath").and_then(JsonValue::as_str) {
            return base.trim_end_matches('/').to_string();
        }
        let Some(url) = self.base_url() else {
            return String::new();
        };
        let path = match url.split_once("://") {
            Some((_, rest)) => rest.find('/').map(|i| &rest[i..]).unwrap_or(""),
            None => url.as_str(),
        };
        path.trim_end_matches('/').to_string()
    }

    /// Model definitions (`definitions` or `components.schemas`)
    pub fn definitions(&self) -> Vec<(String, JsonValue)> {
        let defs = self
            .json
            .get("definitions")
            .or_else(|| self.json.get("components").and_then(|c| c.get("schemas")))
            .and_then(JsonValue::as_object);

        defs.map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    /// Resolve a local `$ref` pointer (`#/definitions/Pet`)
    pub fn resolve_ref(&self, reference: &str) -> Option<&JsonValue> {
        let pointer = reference.strip_prefix('#')?;
        self.json.pointer(pointer)
    }

    /// Follow `$ref` chains until a concrete object is reached
    fn deref<'a>(&'a self, value: &'a JsonValue) -> &'a JsonValue {
        let mut current = value;
        for _ in 0..16 {
            match current.get("$ref").and_then(JsonValue::as_str) {
                Some(reference) => match self.resolve_ref(reference) {
                    Some(target) => current = target,
                    None => break,
                },
                None => break,
            }
        }
        current
    }

    /// Parse all operations of every path, in document order of methods
    pub fn parse_operations(&self) -> crate::Result<Vec<OpenApiOperation>> {
        let mut operations = Vec::new();
        let paths = self
            .json
            .get("paths")
            .and_then(JsonValue::as_object)
            .ok_or_else(|| Error::openapi("Missing 'paths' object"))?;

        for (path, item) in paths {
            let item = self.deref(item);
            let shared_params = self.extract_parameters(item.get("parameters"));

            for method in HTTP_METHODS {
                let Some(op) = item.get(method).and_then(JsonValue::as_object) else {
                    continue;
                };

                let id = op
                    .get("operationId")
                    .and_then(JsonValue::as_str)
                    .map(String::from)
                    .unwrap_or_else(|| {
                        format!(
                            "{}_{}",
                            method,
                            path.trim_start_matches('/')
                                .replace(['/', '{', '}'], "_")
                        )
                    });

                // Operation-level parameters override path-level ones with the same name+location
                let mut parameters = shared_params.clone();
                for param in self.extract_parameters(op.get("parameters")) {
                    parameters.retain(|p| !(p.name == param.name && p.in_ == param.in_));
                    parameters.push(param);
                }

                let request_body = op
                    .get("requestBody")
                    .map(|body| self.extract_request_body(self.deref(body)));

                operations.push(OpenApiOperation {
                    id,
                    method: method.to_uppercase(),
                    path: path.clone(),
                    tags: op
                        .get("tags")
                        .and_then(JsonValue::as_array)
                        .map(|arr| {
                            arr.iter()
                                .filter_map(JsonValue::as_str)
                                .map(String::from)
                                .collect()
                        })
                        .unwrap_or_default(),
                    summary: op
                        .get("summary")
                        .and_then(JsonValue::as_str)
                        .map(String::from),
                    description: op
                        .get("description")
                        .and_then(JsonValue::as_str)
                        .map(String::from),
                    parameters,
                    request_body,
                    responses: self.extract_responses(op),
                    consumes: string_list(op.get("consumes")),
                    produces: string_list(op.get("produces")),
                    deprecated: op
                        .get("deprecated")
                        .and_then(JsonValue::as_bool)
                        .unwrap_or(false),
                    vendor_extensions: extract_vendor_extensions(op),
                });
            }
        }
        Ok(operations)
    }

    /// Parse a parameter list, resolving `$ref` entries
    pub fn extract_parameters(&self, params: Option<&JsonValue>) -> Vec<OpenApiParameter> {
        params
            .and_then(JsonValue::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|param| {
                        let resolved = self.deref(param);
                        match serde_json::from_value(resolved.clone()) {
                            Ok(p) => Some(p),
                            Err(e) => {
                                log::warn!("Skipping malformed parameter {}: {}", resolved, e);
                                None
                            }
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn extract_request_body(&self, body: &JsonValue) -> OpenApiRequestBody {
        let content = body.get("content").and_then(JsonValue::as_object);
        let (content_type, schema) = content
            .and_then(|map| {
                map.get("application/json")
                    .map(|media| ("application/json".to_string(), media))
                    .or_else(|| map.iter().next().map(|(k, v)| (k.clone(), v)))
            })
            .map(|(ct, media)| (Some(ct), media.get("schema").cloned()))
            .unwrap_or((None, None));

        OpenApiRequestBody {
            description: body
                .get("description")
                .and_then(JsonValue::as_str)
                .map(String::from),
            required: body
                .get("required")
                .and_then(JsonValue::as_bool)
                .unwrap_or(false),
            content_type,
            schema,
        }
    }

    /// Extract responses from an operation object, keyed by status code
    pub fn extract_responses(
        &self,
        op: &serde_json::Map<String, JsonValue>,
    ) -> IndexMap<String, OpenApiResponse> {
        op.get("responses")
            .and_then(JsonValue::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(code, resp)| {
                        serde_json::from_value(self.deref(resp).clone())
                            .ok()
                            .map(|resp| (code.clone(), resp))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Sanitizes Markdown for single-line doc comments.
    pub fn sanitize_markdown(input: &str) -> String {
        input
            .lines()
            .map(|line| {
                let line = line.replace('\t', " ");
                let line = UNICODE_PUNCT.replace_all(&line, |caps: &regex::Captures| {
                    match &caps[0] {
                        "\u{2018}" | "\u{2019}" => "'",
                        "\u{201C}" | "\u{201D}" => "\"",
                        "\u{2014}" => "-",
                        _ => "",
                    }
                });
                WHITESPACE
                    .replace_all(line.trim(), " ")
                    .replace("*/", "* /")
            })
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn string_list(value: Option<&JsonValue>) -> Vec<String> {
    value
        .and_then(JsonValue::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(JsonValue::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

/// Extract vendor extensions from a JSON object
pub fn extract_vendor_extensions(
    obj: &serde_json::Map<String, JsonValue>,
) -> HashMap<String, JsonValue> {
    obj.iter()
        .filter(|(k, _)| k.starts_with("x-"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Parsed operation of the API description
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OpenApiOperation {
    /// Unique string used to identify the operation
    #[serde(rename = "operationId")]
    pub id: String,
    /// Upper-case HTTP method
    pub method: String,
    /// The path where this operation is defined (e.g., "/pet/{petId}")
    pub path: String,
    /// Tags used to group operations into APIs
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    /// Path-level and operation-level parameters, merged
    pub parameters: Vec<OpenApiParameter>,
    /// OpenAPI 3 request body
    #[serde(rename = "requestBody")]
    pub request_body: Option<OpenApiRequestBody>,
    /// Responses keyed by status code, in document order
    pub responses: IndexMap<String, OpenApiResponse>,
    /// Swagger 2.0 `consumes`
    pub consumes: Vec<String>,
    /// Swagger 2.0 `produces`
    pub produces: Vec<String>,
    pub deprecated: bool,
    /// Specification extensions (fields starting with `x-`).
    pub vendor_extensions: HashMap<String, JsonValue>,
}

impl OpenApiOperation {
    /// Schema of the first successful response, if it has one
    pub fn success_schema(&self) -> Option<&JsonValue> {
        self.responses
            .iter()
            .filter(|(code, _)| code.starts_with('2'))
            .find_map(|(_, resp)| resp.schema())
    }
}

/// OpenAPI 3 request body, reduced to one media type
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OpenApiRequestBody {
    pub description: Option<String>,
    pub required: bool,
    pub content_type: Option<String>,
    pub schema: Option<JsonValue>,
}

/// Information about a single parameter in an operation.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OpenApiParameter {
    /// The name of the parameter. Parameter names are case sensitive.
    pub name: String,
    /// The location of the parameter: "query", "header", "path", "cookie", "body" or "formData".
    #[serde(rename = "in")]
    pub in_: String,
    pub description: Option<String>,
    /// Path parameters are always required
    pub required: Option<bool>,
    pub deprecated: Option<bool>,
    /// OpenAPI 3 / Swagger 2.0 body schema
    pub schema: Option<JsonValue>,
    /// Swagger 2.0 inline type
    #[serde(rename = "type")]
    pub type_: Option<String>,
    /// Swagger 2.0 inline format
    pub format: Option<String>,
    /// Swagger 2.0 inline array items
    pub items: Option<JsonValue>,
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<JsonValue>>,
    pub default: Option<JsonValue>,
    pub example: Option<JsonValue>,
}

impl OpenApiParameter {
    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(self.in_ == "path")
    }

    /// The parameter's schema, synthesized from inline Swagger 2.0 fields when needed
    pub fn effective_schema(&self) -> JsonValue {
        if let Some(schema) = &self.schema {
            return schema.clone();
        }
        let mut schema = serde_json::Map::new();
        schema.insert(
            "type".into(),
            json!(self.type_.clone().unwrap_or_else(|| "string".into())),
        );
        if let Some(format) = &self.format {
            schema.insert("format".into(), json!(format));
        }
        if let Some(items) = &self.items {
            schema.insert("items".into(), items.clone());
        }
        if let Some(values) = &self.enum_values {
            schema.insert("enum".into(), json!(values));
        }
        JsonValue::Object(schema)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OpenApiResponse {
    pub description: Option<String>,
    /// Swagger 2.0 response schema
    pub schema: Option<JsonValue>,
    /// OpenAPI 3 response content by media type
    pub content: Option<IndexMap<String, JsonValue>>,
}

impl OpenApiResponse {
    /// Response schema from either document flavor
    pub fn schema(&self) -> Option<&JsonValue> {
        if let Some(schema) = &self.schema {
            return Some(schema);
        }
        let content = self.content.as_ref()?;
        content
            .get("application/json")
            .or_else(|| content.values().next())
            .and_then(|media| media.get("schema"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn swagger2() -> OpenApiContext {
        OpenApiContext::new(json!({
            "swagger": "2.0",
            "info": {"title": "Petstore", "version": "1.0.0"},
            "host": "petstore.swagger.io",
            "basePath": "/v2",
            "schemes": ["http", "https"],
            "paths": {
                "/pet/{petId}": {
                    "parameters": [{"name": "petId", "in": "path", "type": "integer", "format": "int64"}],
                    "get": {
                        "operationId": "getPetById",
                        "tags": ["pet"],
                        "responses": {"200": {"description": "ok", "schema": {"$ref": "#/definitions/Pet"}}}
                    },
                    "delete": {
                        "tags": ["pet"],
                        "parameters": [{"name": "api_key", "in": "header", "type": "string"}],
                        "responses": {"400": {"description": "bad"}}
                    }
                }
            },
            "definitions": {
                "Pet": {"type": "object", "properties": {"name": {"type": "string"}}}
            }
        }))
    }

    #[tokio::test]
    async fn test_from_file() -> crate::Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("openapi.yaml");
        let yaml_content = r#"
openapi: 3.0.0
info:
  title: Test API
  version: 2.0.0
servers:
  - url: https://api.example.com/v2/
paths: {}
"#;
        tokio::fs::write(&file_path, yaml_content).await?;

        let spec = OpenApiContext::from_file(&file_path).await?;
        assert_eq!(spec.title(), Some("Test API"));
        assert_eq!(spec.version(), Some("2.0.0"));
        assert_eq!(spec.base_path(), "/v2");

        Ok(())
    }

    #[test]
    fn test_parse_content_rejects_non_specs() {
        assert!(OpenApiContext::parse_content("[1, 2]").is_err());
        assert!(OpenApiContext::parse_content("title: nope").is_err());
        assert!(OpenApiContext::parse_content("{\"swagger\": \"2.0\"}").is_ok());
    }

    #[test]
    fn test_swagger2_base_url() {
        let spec = swagger2();
        assert_eq!(
            spec.base_url(),
            Some("https://petstore.swagger.io/v2".to_string())
        );
        assert_eq!(spec.base_path(), "/v2");
    }

    #[test]
    fn test_parse_operations_merges_path_parameters() {
        let ops = swagger2().parse_operations().unwrap();
        assert_eq!(ops.len(), 2);

        let get = &ops[0];
        assert_eq!(get.id, "getPetById");
        assert_eq!(get.method, "GET");
        assert_eq!(get.parameters.len(), 1);
        assert!(get.parameters[0].is_required());
        assert!(get.success_schema().is_some());

        let delete = &ops[1];
        assert_eq!(delete.id, "delete_pet__petId_");
        let names: Vec<_> = delete.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["petId", "api_key"]);
        assert!(delete.success_schema().is_none());
    }

    #[test]
    fn test_parameter_refs_are_resolved() {
        let spec = OpenApiContext::new(json!({
            "openapi": "3.0.0",
            "paths": {"/pets": {"get": {
                "parameters": [{"$ref": "#/components/parameters/limit"}],
                "responses": {}
            }}},
            "components": {"parameters": {"limit": {
                "name": "limit", "in": "query", "schema": {"type": "integer"}
            }}}
        }));
        let ops = spec.parse_operations().unwrap();
        assert_eq!(ops[0].parameters[0].name, "limit");
        assert!(!ops[0].parameters[0].is_required());
    }

    #[test]
    fn test_request_body_prefers_json() {
        let spec = OpenApiContext::new(json!({
            "openapi": "3.0.0",
            "paths": {"/pets": {"post": {
                "requestBody": {"required": true, "content": {
                    "application/xml": {"schema": {"type": "string"}},
                    "application/json": {"schema": {"$ref": "#/components/schemas/Pet"}}
                }},
                "responses": {}
            }}}
        }));
        let ops = spec.parse_operations().unwrap();
        let body = ops[0].request_body.as_ref().unwrap();
        assert!(body.required);
        assert_eq!(body.content_type.as_deref(), Some("application/json"));
        assert_eq!(
            body.schema,
            Some(json!({"$ref": "#/components/schemas/Pet"}))
        );
    }

    #[test]
    fn test_definitions_from_both_flavors() {
        assert_eq!(swagger2().definitions()[0].0, "Pet");
        let oas3 = OpenApiContext::new(json!({
            "openapi": "3.0.0",
            "components": {"schemas": {"Order": {"type": "object"}}}
        }));
        assert_eq!(oas3.definitions()[0].0, "Order");
    }

    #[test]
    fn test_effective_schema_from_inline_fields() {
        let param: OpenApiParameter = serde_json::from_value(json!({
            "name": "status", "in": "query", "type": "array", "items": {"type": "string"}
        }))
        .unwrap();
        let schema = param.effective_schema();
        assert_eq!(schema["type"], "array");
        assert_eq!(schema["items"]["type"], "string");
    }

    #[test]
    fn test_sanitize_markdown_basic() {
        let raw = "Line one\n\nLine two";
        assert_eq!(OpenApiContext::sanitize_markdown(raw), "Line one Line two");
    }

    #[test]
    fn test_sanitize_markdown_unicode_and_comment_close() {
        let raw = "\u{201C}quote\u{201D} \u{2014} ends */ here";
        let out = OpenApiContext::sanitize_markdown(raw);
        assert_eq!(out, "\"quote\" - ends * / here");
    }
}
