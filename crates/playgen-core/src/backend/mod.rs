//! Generator backends.
//!
//! A [`Backend`] is declarative wiring over the generic engine: an option
//! table plus one policy object per concern (project layout, naming, type
//! mapping, template selection, model post-processing, specification
//! snapshot). [`Backend::setup`] resolves user overrides and derives every
//! read-only value a run needs exactly once.

pub mod registry;
pub mod scala_play;

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::codegen::{CodegenModel, CodegenProperty};
use crate::error::{Error, Result};
use crate::naming::{NamingContext, NamingPolicy};
use crate::openapi::OpenApiContext;
use crate::options::{GeneratorOptions, OverridePolicy, ResolvedOptions};
use crate::templates::{ArtifactKind, SupportingFile, TemplateAssignment, TemplateSelectionPolicy};
use crate::types::{TypeMapping, TypeMappingPolicy};

pub use registry::GeneratorRegistry;

/// What a backend produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorTag {
    Client,
    Server,
    Documentation,
    Config,
    Other,
}

impl GeneratorTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
            Self::Documentation => "documentation",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for GeneratorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static identity of a backend
#[derive(Debug, Clone, Copy)]
pub struct BackendInfo {
    /// Registry name, e.g. `scala-play-framework`
    pub name: &'static str,
    pub tag: GeneratorTag,
    pub help: &'static str,
    /// Folder name looked up inside template override directories
    pub template_folder: &'static str,
    /// Built-in `(identifier, source)` templates
    pub templates: &'static [(&'static str, &'static str)],
}

/// Package layout and extra render data derived from the resolved options
pub trait ProjectLayout: Send + Sync {
    fn naming_context(&self, options: &ResolvedOptions) -> Result<NamingContext>;

    /// Values added to every render context
    fn additional_properties(&self, _options: &ResolvedOptions) -> Result<JsonMap<String, JsonValue>> {
        Ok(JsonMap::new())
    }
}

/// Per-model hooks run after the generic model is built and before rendering.
///
/// `post_process_property` is called once for every property of a model,
/// then `post_process_model` once for the model. During a property hook
/// `model.vars` still lists every property, the current one in its state
/// before the hook; changes to the property are written back afterwards.
pub trait ModelPostProcessor: Send + Sync {
    fn post_process_property(&self, _model: &mut CodegenModel, _property: &mut CodegenProperty) {}

    fn post_process_model(&self, _model: &mut CodegenModel) {}
}

/// Leaves models untouched
#[derive(Debug, Default)]
pub struct NoopPostProcessor;

impl ModelPostProcessor for NoopPostProcessor {}

/// Serializes the input specification for embedding in generated files
pub trait SpecSnapshot: Send + Sync {
    fn snapshot(&self, spec: &OpenApiContext) -> Result<String>;
}

/// Pretty-printed JSON
#[derive(Debug, Default)]
pub struct PrettyJsonSnapshot;

impl SpecSnapshot for PrettyJsonSnapshot {
    fn snapshot(&self, spec: &OpenApiContext) -> Result<String> {
        Ok(serde_json::to_string_pretty(&spec.json)?)
    }
}

/// Everything a run derives from the resolved options, computed once
#[derive(Debug, Clone)]
pub struct BackendSetup {
    pub options: ResolvedOptions,
    pub naming: NamingContext,
    pub type_mapping: TypeMapping,
    pub supporting_files: Vec<SupportingFile>,
    /// Template per artifact kind; disabled kinds are absent
    pub assignments: IndexMap<ArtifactKind, TemplateAssignment>,
    pub additional_properties: JsonMap<String, JsonValue>,
}

impl BackendSetup {
    pub fn assignment(&self, kind: ArtifactKind) -> Option<&TemplateAssignment> {
        self.assignments.get(&kind)
    }
}

/// A code generation backend
pub struct Backend {
    info: BackendInfo,
    options: GeneratorOptions,
    layout: Box<dyn ProjectLayout>,
    naming: Box<dyn NamingPolicy>,
    types: Box<dyn TypeMappingPolicy>,
    templates: Box<dyn TemplateSelectionPolicy>,
    post_processor: Box<dyn ModelPostProcessor>,
    snapshot: Option<Box<dyn SpecSnapshot>>,
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("name", &self.info.name)
            .field("tag", &self.info.tag)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Backend {
    pub fn new(
        info: BackendInfo,
        options: GeneratorOptions,
        layout: Box<dyn ProjectLayout>,
        naming: Box<dyn NamingPolicy>,
        types: Box<dyn TypeMappingPolicy>,
        templates: Box<dyn TemplateSelectionPolicy>,
    ) -> Self {
        Self {
            info,
            options,
            layout,
            naming,
            types,
            templates,
            post_processor: Box::new(NoopPostProcessor),
            snapshot: None,
        }
    }

    pub fn with_post_processor(mut self, post_processor: Box<dyn ModelPostProcessor>) -> Self {
        self.post_processor = post_processor;
        self
    }

    pub fn with_snapshot(mut self, snapshot: Box<dyn SpecSnapshot>) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn info(&self) -> &BackendInfo {
        &self.info
    }

    pub fn name(&self) -> &'static str {
        self.info.name
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    pub fn naming(&self) -> &dyn NamingPolicy {
        self.naming.as_ref()
    }

    pub fn types(&self) -> &dyn TypeMappingPolicy {
        self.types.as_ref()
    }

    pub fn templates(&self) -> &dyn TemplateSelectionPolicy {
        self.templates.as_ref()
    }

    pub fn post_processor(&self) -> &dyn ModelPostProcessor {
        self.post_processor.as_ref()
    }

    /// Resolve overrides and derive the run's read-only configuration.
    ///
    /// All option and type-mapping errors surface here, before any file is rendered.
    pub fn setup(
        &self,
        overrides: &IndexMap<String, String>,
        policy: OverridePolicy,
    ) -> Result<BackendSetup> {
        let options = self.options.resolve(overrides, policy)?;
        let naming = self.layout.naming_context(&options)?;

        let type_mapping = self.types.type_mapping(&options)?;
        type_mapping.validate()?;

        let mut assignments = IndexMap::new();
        for kind in ArtifactKind::all() {
            if let Some(assignment) = self.templates.select(kind, &options)? {
                if assignment.kind != kind {
                    return Err(Error::config(format!(
                        "Template selection for {} returned a {} assignment",
                        kind, assignment.kind
                    )));
                }
                assignments.insert(kind, assignment);
            }
        }

        let supporting_files = self.templates.supporting_files(&options)?;
        for file in &supporting_files {
            log::debug!("Supporting file {} -> {}", file.template, file.path());
        }

        let additional_properties = self.layout.additional_properties(&options)?;

        Ok(BackendSetup {
            options,
            naming,
            type_mapping,
            supporting_files,
            assignments,
            additional_properties,
        })
    }

    /// Run the model hooks: every property once, then the model once
    pub fn post_process_model(&self, model: &mut CodegenModel) {
        for index in 0..model.vars.len() {
            let Some(mut property) = model.vars.get(index).cloned() else {
                break;
            };
            self.post_processor.post_process_property(model, &mut property);
            if let Some(slot) = model.vars.get_mut(index) {
                *slot = property;
            }
        }
        self.post_processor.post_process_model(model);
    }

    /// Add backend data to the shared supporting-file context.
    ///
    /// Returns `false` when the specification snapshot could not be produced;
    /// the failure is logged and files that need the snapshot must be skipped.
    pub fn post_process_supporting_data(
        &self,
        spec: &OpenApiContext,
        data: &mut JsonMap<String, JsonValue>,
    ) -> bool {
        let Some(snapshot) = &self.snapshot else {
            return true;
        };
        match snapshot.snapshot(spec) {
            Ok(json) => {
                data.insert("swagger_json".to_string(), JsonValue::String(json));
                true
            }
            Err(e) => {
                log::error!("Failed to serialize the API specification: {}", e);
                false
            }
        }
    }
}
