//! Language-neutral intermediate representation handed to templates.
//!
//! The [`Normalizer`] turns the loader's models and operations into
//! [`CodegenModel`]s and [`CodegenApi`]s, applying the backend's naming and
//! type-mapping policies. Backend post-processing hooks run on this
//! representation before it reaches the template renderer.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::naming::{NamingContext, NamingPolicy};
use crate::openapi::{OpenApiContext, OpenApiOperation, OpenApiParameter};
use crate::types::{source, TypeMapping, TypeMappingPolicy};
use crate::utils::camelize_lower;

/// Generic annotation metadata attached to models with a description
pub const API_MODEL_ANNOTATION: &str = "ApiModel";
/// Generic annotation metadata attached to models with properties
pub const API_MODEL_PROPERTY_ANNOTATION: &str = "ApiModelProperty";

/// Normalized shape of a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaType {
    /// A source type name from [`crate::types::source`]
    Primitive(String),
    /// Reference to a named definition
    Model(String),
    List(Box<SchemaType>),
    Map(Box<SchemaType>),
}

impl SchemaType {
    /// Normalize a raw JSON schema. `$ref`s become [`SchemaType::Model`].
    pub fn from_schema(schema: &JsonValue) -> Self {
        if let Some(reference) = schema.get("$ref").and_then(JsonValue::as_str) {
            let name = reference.rsplit('/').next().unwrap_or(reference);
            return Self::Model(name.to_string());
        }

        let format = schema.get("format").and_then(JsonValue::as_str);
        match schema.get("type").and_then(JsonValue::as_str) {
            Some("array") => {
                let items = schema.get("items").cloned().unwrap_or(JsonValue::Null);
                Self::List(Box::new(Self::from_schema(&items)))
            }
            Some("string") => Self::Primitive(
                match format {
                    Some("date") => source::DATE,
                    Some("date-time") => source::DATE_TIME,
                    Some("binary") => source::BINARY,
                    Some("byte") => source::BYTE_ARRAY,
                    Some("uuid") => source::UUID,
                    _ => source::STRING,
                }
                .to_string(),
            ),
            Some("integer") => Self::Primitive(
                match format {
                    Some("int64") => source::LONG,
                    _ => source::INTEGER,
                }
                .to_string(),
            ),
            Some("number") => Self::Primitive(
                match format {
                    Some("float") => source::FLOAT,
                    Some("double") => source::DOUBLE,
                    _ => source::NUMBER,
                }
                .to_string(),
            ),
            Some("boolean") => Self::Primitive(source::BOOLEAN.to_string()),
            Some("file") => Self::Primitive(source::FILE.to_string()),
            _ => match schema.get("additionalProperties") {
                Some(inner) if inner.is_object() => Self::Map(Box::new(Self::from_schema(inner))),
                Some(JsonValue::Bool(true)) => {
                    Self::Map(Box::new(Self::Primitive(source::OBJECT.to_string())))
                }
                _ => Self::Primitive(source::OBJECT.to_string()),
            },
        }
    }
}

/// Whether a definition is emitted as a model (as opposed to an alias)
pub fn is_object_schema(schema: &JsonValue) -> bool {
    schema.get("properties").is_some()
        || schema.get("allOf").is_some()
        || (schema.get("type").and_then(JsonValue::as_str) == Some("object")
            && schema.get("additionalProperties").is_none())
}

/// Resolved target type of a property or parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedType {
    pub data_type: String,
    pub base_type: String,
    pub is_list: bool,
    pub is_map: bool,
    /// Referenced model, if any
    pub complex_type: Option<String>,
    /// Type names that may need an import
    pub imports: Vec<String>,
}

impl ResolvedType {
    pub fn is_container(&self) -> bool {
        self.is_list || self.is_map
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodegenProperty {
    /// Name as written in the API description
    pub base_name: String,
    /// Target-safe identifier
    pub name: String,
    pub data_type: String,
    pub base_type: String,
    pub complex_type: Option<String>,
    pub description: Option<String>,
    pub required: bool,
    pub is_container: bool,
    pub is_list: bool,
    pub is_map: bool,
    pub is_primitive_type: bool,
    pub is_enum: bool,
    pub enum_values: Vec<String>,
    pub default_value: Option<String>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub minimum: Option<String>,
    pub maximum: Option<String>,
    pub pattern: Option<String>,
    pub has_validation: bool,
    /// Whether this is the last property of the model (template convenience)
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodegenModel {
    /// Definition name as written in the API description
    pub name: String,
    pub classname: String,
    pub classvarname: String,
    pub classfilename: String,
    pub description: Option<String>,
    pub vars: Vec<CodegenProperty>,
    /// Type names this model refers to; mapped to import paths at render time
    pub imports: BTreeSet<String>,
    pub has_enums: bool,
    pub has_validation: bool,
}

impl CodegenModel {
    /// Import paths for every import that the type mapping can resolve
    pub fn import_paths(&self, mapping: &TypeMapping) -> Vec<String> {
        resolve_imports(&self.imports, mapping)
    }
}

/// Where a parameter is carried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
    Body,
    Form,
}

impl ParameterLocation {
    fn parse(location: &str) -> Self {
        match location {
            "path" => Self::Path,
            "header" => Self::Header,
            "cookie" => Self::Cookie,
            "body" => Self::Body,
            "formData" => Self::Form,
            _ => Self::Query,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodegenParameter {
    pub base_name: String,
    pub param_name: String,
    pub data_type: String,
    pub base_type: String,
    pub description: Option<String>,
    pub required: bool,
    pub location: ParameterLocation,
    pub is_file: bool,
    pub is_container: bool,
    pub is_enum: bool,
    pub enum_values: Vec<String>,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodegenOperation {
    pub operation_id: String,
    /// Method name in the generated controller
    pub nickname: String,
    pub http_method: String,
    /// Path as written in the API description (`/pet/{petId}`)
    pub path: String,
    /// Path in router syntax (`/pet/:petId`), including the base path
    pub route_path: String,
    pub summary: Option<String>,
    pub notes: Option<String>,
    pub all_params: Vec<CodegenParameter>,
    pub path_params: Vec<CodegenParameter>,
    pub query_params: Vec<CodegenParameter>,
    pub header_params: Vec<CodegenParameter>,
    pub cookie_params: Vec<CodegenParameter>,
    pub form_params: Vec<CodegenParameter>,
    pub body_param: Option<CodegenParameter>,
    pub return_type: Option<String>,
    pub return_base_type: Option<String>,
    pub return_container: bool,
    pub is_multipart: bool,
    pub deprecated: bool,
    pub imports: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodegenApi {
    pub tag: String,
    pub classname: String,
    pub classvarname: String,
    pub operations: Vec<CodegenOperation>,
    pub imports: BTreeSet<String>,
}

impl CodegenApi {
    pub fn import_paths(&self, mapping: &TypeMapping) -> Vec<String> {
        resolve_imports(&self.imports, mapping)
    }
}

fn resolve_imports(imports: &BTreeSet<String>, mapping: &TypeMapping) -> Vec<String> {
    imports
        .iter()
        .filter_map(|name| mapping.import_for(name))
        .map(String::from)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Applies naming and type policies to the loader's object graph
pub struct Normalizer<'a> {
    naming: &'a dyn NamingPolicy,
    ctx: &'a NamingContext,
    types: &'a dyn TypeMappingPolicy,
    mapping: &'a TypeMapping,
    aliases: HashMap<String, SchemaType>,
}

impl<'a> Normalizer<'a> {
    pub fn new(
        naming: &'a dyn NamingPolicy,
        ctx: &'a NamingContext,
        types: &'a dyn TypeMappingPolicy,
        mapping: &'a TypeMapping,
    ) -> Self {
        Self {
            naming,
            ctx,
            types,
            mapping,
            aliases: HashMap::new(),
        }
    }

    /// Register non-object definitions so references to them resolve to the underlying type
    pub fn with_aliases(mut self, spec: &OpenApiContext) -> Self {
        self.aliases = spec
            .definitions()
            .into_iter()
            .filter(|(_, schema)| !is_object_schema(schema))
            .map(|(name, schema)| (name, SchemaType::from_schema(&schema)))
            .collect();
        self
    }

    pub fn is_alias(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    /// Map a normalized schema to the target type
    pub fn resolve(&self, schema_type: &SchemaType) -> ResolvedType {
        self.resolve_depth(schema_type, 0)
    }

    fn resolve_depth(&self, schema_type: &SchemaType, depth: usize) -> ResolvedType {
        match schema_type {
            SchemaType::Primitive(name) => {
                let target = self.mapping.map_type(name);
                ResolvedType {
                    data_type: target.clone(),
                    base_type: target.clone(),
                    is_list: false,
                    is_map: false,
                    complex_type: None,
                    imports: vec![target],
                }
            }
            SchemaType::Model(name) => match self.aliases.get(name) {
                // Alias chains are cut off to avoid cycles
                Some(inner) if depth < 8 => self.resolve_depth(inner, depth + 1),
                _ => {
                    let classname = self.naming.model_name(self.ctx, name);
                    ResolvedType {
                        data_type: classname.clone(),
                        base_type: classname.clone(),
                        is_list: false,
                        is_map: false,
                        complex_type: Some(classname.clone()),
                        imports: vec![classname],
                    }
                }
            },
            SchemaType::List(inner) => {
                let inner = self.resolve_depth(inner, depth + 1);
                ResolvedType {
                    data_type: self.types.list_of(&inner.data_type),
                    is_list: true,
                    is_map: false,
                    ..inner
                }
            }
            SchemaType::Map(inner) => {
                let inner = self.resolve_depth(inner, depth + 1);
                ResolvedType {
                    data_type: self.types.map_of(&inner.data_type),
                    is_list: false,
                    is_map: true,
                    ..inner
                }
            }
        }
    }

    fn collect_imports(&self, target: &mut BTreeSet<String>, resolved: &ResolvedType) {
        for name in &resolved.imports {
            if !self.ctx.is_default_include(name) && !self.mapping.is_primitive(name) {
                target.insert(name.clone());
            }
        }
    }

    /// Build the generic model representation of a definition
    pub fn from_model(&self, spec: &OpenApiContext, name: &str, schema: &JsonValue) -> CodegenModel {
        let classname = self.naming.model_name(self.ctx, name);
        let (properties, required) = collect_properties(spec, schema);

        let mut imports = BTreeSet::new();
        let mut vars = Vec::with_capacity(properties.len());
        for (base_name, prop_schema) in &properties {
            let var = self.from_property(base_name, prop_schema, required.contains(base_name));
            self.collect_imports(
                &mut imports,
                &self.resolve(&SchemaType::from_schema(prop_schema)),
            );
            vars.push(var);
        }
        let count = vars.len();
        for (i, var) in vars.iter_mut().enumerate() {
            var.has_more = i + 1 < count;
        }

        let description = schema
            .get("description")
            .and_then(JsonValue::as_str)
            .map(OpenApiContext::sanitize_markdown);

        // Generic annotation metadata; backends that don't use it prune it
        if description.is_some() {
            imports.insert(API_MODEL_ANNOTATION.to_string());
        }
        if !vars.is_empty() {
            imports.insert(API_MODEL_PROPERTY_ANNOTATION.to_string());
        }
        imports.remove(&classname);

        CodegenModel {
            name: name.to_string(),
            classvarname: camelize_lower(&classname),
            classfilename: self.naming.model_filename(self.ctx, name),
            classname,
            description,
            has_enums: vars.iter().any(|v| v.is_enum),
            has_validation: vars.iter().any(|v| v.has_validation),
            vars,
            imports,
        }
    }

    /// Build a property; the schema is used as-is (no `$ref` following)
    pub fn from_property(&self, base_name: &str, schema: &JsonValue, required: bool) -> CodegenProperty {
        let resolved = self.resolve(&SchemaType::from_schema(schema));
        let enum_values = enum_strings(schema.get("enum"));
        let min_length = schema.get("minLength").and_then(JsonValue::as_u64);
        let max_length = schema.get("maxLength").and_then(JsonValue::as_u64);
        let minimum = schema.get("minimum").map(number_literal);
        let maximum = schema.get("maximum").map(number_literal);
        let pattern = schema
            .get("pattern")
            .and_then(JsonValue::as_str)
            .map(String::from);
        let has_validation = min_length.is_some()
            || max_length.is_some()
            || minimum.is_some()
            || maximum.is_some()
            || pattern.is_some()
            || !enum_values.is_empty();

        CodegenProperty {
            base_name: base_name.to_string(),
            name: self.naming.var_name(self.ctx, base_name),
            is_container: resolved.is_container(),
            is_list: resolved.is_list,
            is_map: resolved.is_map,
            is_primitive_type: resolved.complex_type.is_none(),
            data_type: resolved.data_type,
            base_type: resolved.base_type,
            complex_type: resolved.complex_type,
            description: schema
                .get("description")
                .and_then(JsonValue::as_str)
                .map(OpenApiContext::sanitize_markdown),
            required,
            is_enum: !enum_values.is_empty(),
            enum_values,
            default_value: schema.get("default").map(literal),
            min_length,
            max_length,
            minimum,
            maximum,
            pattern,
            has_validation,
            has_more: false,
        }
    }

    fn from_parameter(&self, param: &OpenApiParameter) -> CodegenParameter {
        let schema = param.effective_schema();
        let resolved = self.resolve(&SchemaType::from_schema(&schema));
        let enum_values = enum_strings(schema.get("enum"));
        CodegenParameter {
            base_name: param.name.clone(),
            param_name: self.naming.param_name(self.ctx, &param.name),
            is_file: is_file_type(&schema),
            is_container: resolved.is_container(),
            data_type: resolved.data_type,
            base_type: resolved.base_type,
            description: param
                .description
                .as_deref()
                .map(OpenApiContext::sanitize_markdown),
            required: param.is_required(),
            location: ParameterLocation::parse(&param.in_),
            is_enum: !enum_values.is_empty(),
            enum_values,
            default_value: param
                .default
                .as_ref()
                .or_else(|| schema.get("default"))
                .map(literal),
        }
    }

    /// Build the generic operation representation
    pub fn from_operation(
        &self,
        spec: &OpenApiContext,
        op: &OpenApiOperation,
        base_path: &str,
    ) -> CodegenOperation {
        let mut imports = BTreeSet::new();
        let mut all_params = Vec::new();
        let mut body_param = None;
        let mut form_params = Vec::new();

        for param in &op.parameters {
            let codegen = self.from_parameter(param);
            self.collect_imports(
                &mut imports,
                &self.resolve(&SchemaType::from_schema(&param.effective_schema())),
            );
            match codegen.location {
                ParameterLocation::Body => body_param = Some(codegen.clone()),
                ParameterLocation::Form => form_params.push(codegen.clone()),
                _ => {}
            }
            all_params.push(codegen);
        }

        let mut is_multipart = op
            .consumes
            .iter()
            .any(|c| c.starts_with("multipart/form-data"));

        if let Some(body) = &op.request_body {
            let content_type = body.content_type.as_deref().unwrap_or("application/json");
            let schema = body.schema.clone().unwrap_or(JsonValue::Null);
            if content_type.starts_with("multipart/form-data")
                || content_type == "application/x-www-form-urlencoded"
            {
                is_multipart |= content_type.starts_with("multipart/form-data");
                let (properties, required) = collect_properties(spec, &schema);
                for (name, prop_schema) in &properties {
                    let param = OpenApiParameter {
                        name: name.clone(),
                        in_: "formData".to_string(),
                        description: prop_schema
                            .get("description")
                            .and_then(JsonValue::as_str)
                            .map(String::from),
                        required: Some(required.contains(name)),
                        deprecated: None,
                        schema: Some(prop_schema.clone()),
                        type_: None,
                        format: None,
                        items: None,
                        enum_values: None,
                        default: None,
                        example: None,
                    };
                    self.collect_imports(
                        &mut imports,
                        &self.resolve(&SchemaType::from_schema(prop_schema)),
                    );
                    let codegen = self.from_parameter(&param);
                    form_params.push(codegen.clone());
                    all_params.push(codegen);
                }
            } else {
                let resolved = self.resolve(&SchemaType::from_schema(&schema));
                self.collect_imports(&mut imports, &resolved);
                let codegen = CodegenParameter {
                    base_name: "body".to_string(),
                    param_name: "body".to_string(),
                    is_file: false,
                    is_container: resolved.is_container(),
                    data_type: resolved.data_type,
                    base_type: resolved.base_type,
                    description: body.description.clone(),
                    required: body.required,
                    location: ParameterLocation::Body,
                    is_enum: false,
                    enum_values: Vec::new(),
                    default_value: None,
                };
                body_param = Some(codegen.clone());
                all_params.push(codegen);
            }
        }

        let (return_type, return_base_type, return_container) = match op.success_schema() {
            Some(schema) => {
                let resolved = self.resolve(&SchemaType::from_schema(schema));
                self.collect_imports(&mut imports, &resolved);
                let container = resolved.is_container();
                (Some(resolved.data_type), Some(resolved.base_type), container)
            }
            None => (None, None, false),
        };

        let by_location = |location: ParameterLocation| -> Vec<CodegenParameter> {
            all_params
                .iter()
                .filter(|p| p.location == location)
                .cloned()
                .collect()
        };

        CodegenOperation {
            operation_id: op.id.clone(),
            nickname: self.naming.operation_id(self.ctx, &op.id),
            http_method: op.method.clone(),
            route_path: route_path(base_path, &op.path, &all_params),
            path: op.path.clone(),
            summary: op.summary.as_deref().map(OpenApiContext::sanitize_markdown),
            notes: op
                .description
                .as_deref()
                .map(OpenApiContext::sanitize_markdown),
            path_params: by_location(ParameterLocation::Path),
            query_params: by_location(ParameterLocation::Query),
            header_params: by_location(ParameterLocation::Header),
            cookie_params: by_location(ParameterLocation::Cookie),
            form_params,
            body_param,
            return_type,
            return_base_type,
            return_container,
            is_multipart,
            deprecated: op.deprecated,
            imports,
            all_params,
        }
    }

    /// Group operations into APIs by their first tag
    pub fn group_operations(
        &self,
        spec: &OpenApiContext,
        operations: &[OpenApiOperation],
    ) -> Vec<CodegenApi> {
        let base_path = spec.base_path();
        let mut groups: BTreeMap<String, Vec<CodegenOperation>> = BTreeMap::new();
        for op in operations {
            let tag = op
                .tags
                .first()
                .cloned()
                .unwrap_or_else(|| "default".to_string());
            groups
                .entry(tag)
                .or_default()
                .push(self.from_operation(spec, op, &base_path));
        }

        groups
            .into_iter()
            .map(|(tag, operations)| {
                let classname = self.naming.api_name(self.ctx, &tag);
                let imports = operations
                    .iter()
                    .flat_map(|op| op.imports.iter().cloned())
                    .collect();
                CodegenApi {
                    classvarname: camelize_lower(&classname),
                    classname,
                    tag,
                    operations,
                    imports,
                }
            })
            .collect()
    }
}

/// Properties and required names of an object schema, following `allOf` and `$ref`
fn collect_properties(
    spec: &OpenApiContext,
    schema: &JsonValue,
) -> (Vec<(String, JsonValue)>, BTreeSet<String>) {
    let mut properties = Vec::new();
    let mut required = BTreeSet::new();
    collect_properties_into(spec, schema, &mut properties, &mut required, 0);
    (properties, required)
}

fn collect_properties_into(
    spec: &OpenApiContext,
    schema: &JsonValue,
    properties: &mut Vec<(String, JsonValue)>,
    required: &mut BTreeSet<String>,
    depth: usize,
) {
    if depth > 8 {
        return;
    }
    if let Some(target) = schema
        .get("$ref")
        .and_then(JsonValue::as_str)
        .and_then(|r| spec.resolve_ref(r))
    {
        collect_properties_into(spec, target, properties, required, depth + 1);
        return;
    }
    if let Some(parts) = schema.get("allOf").and_then(JsonValue::as_array) {
        for part in parts {
            collect_properties_into(spec, part, properties, required, depth + 1);
        }
    }
    if let Some(props) = schema.get("properties").and_then(JsonValue::as_object) {
        for (name, prop) in props {
            properties.retain(|(existing, _)| existing != name);
            properties.push((name.clone(), prop.clone()));
        }
    }
    if let Some(names) = schema.get("required").and_then(JsonValue::as_array) {
        required.extend(names.iter().filter_map(JsonValue::as_str).map(String::from));
    }
}

fn is_file_type(schema: &JsonValue) -> bool {
    matches!(
        SchemaType::from_schema(schema),
        SchemaType::Primitive(ref name) if name == source::FILE || name == source::BINARY
    )
}

/// Router path: base path prefix plus `{param}` segments as `:param`
fn route_path(base_path: &str, path: &str, params: &[CodegenParameter]) -> String {
    let segments: Vec<String> = path
        .split('/')
        .map(|segment| {
            match segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
            {
                Some(name) => {
                    let ident = params
                        .iter()
                        .find(|p| p.location == ParameterLocation::Path && p.base_name == name)
                        .map(|p| p.param_name.trim_matches('`').to_string())
                        .unwrap_or_else(|| name.to_string());
                    format!(":{ident}")
                }
                None => segment.to_string(),
            }
        })
        .collect();
    let path = segments.join("/");
    format!("{}{}", base_path.trim_end_matches('/'), path)
}

fn enum_strings(values: Option<&JsonValue>) -> Vec<String> {
    values
        .and_then(JsonValue::as_array)
        .map(|arr| {
            arr.iter()
                .map(|v| match v {
                    JsonValue::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn number_literal(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Source-language literal for a default value
fn literal(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => format!("{:?}", s),
        other => other.to_string(),
    }
}
