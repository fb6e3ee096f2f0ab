//! Scala Play Framework server backend.
//!
//! Emits a Play 2.6 sbt project: one controller, one implementation stub
//! and (optionally) one interface per API, one case class per model, plus
//! routes, build files and an optional Swagger UI documentation route.

use serde_json::{json, Map as JsonMap, Value as JsonValue};

use crate::codegen::{
    CodegenModel, CodegenProperty, API_MODEL_ANNOTATION, API_MODEL_PROPERTY_ANNOTATION,
};
use crate::error::Result;
use crate::naming::{NamingContext, NamingPolicy};
use crate::options::{CliOption, GeneratorOptions, ResolvedOptions};
use crate::templates::{ArtifactKind, SupportingFile, TemplateAssignment, TemplateSelectionPolicy};
use crate::types::{source, TypeMapping, TypeMappingPolicy};

use super::{
    Backend, BackendInfo, GeneratorTag, ModelPostProcessor, PrettyJsonSnapshot, ProjectLayout,
};

pub const NAME: &str = "scala-play-framework";

pub const TITLE: &str = "title";
pub const CONFIG_PACKAGE: &str = "configPackage";
pub const BASE_PACKAGE: &str = "basePackage";
pub const CONTROLLER_ONLY: &str = "controllerOnly";
pub const USE_BEAN_VALIDATION: &str = "useBeanValidation";
pub const USE_INTERFACES: &str = "useInterfaces";
pub const HANDLE_EXCEPTIONS: &str = "handleExceptions";
pub const WRAP_CALLS: &str = "wrapCalls";
pub const USE_SWAGGER_UI: &str = "useSwaggerUI";

/// Scala type used for uploaded files
pub const FILE_PART: &str = "MultipartFormData.FilePart[Files.TemporaryFile]";

const RESERVED_WORDS: &[&str] = &[
    "abstract", "continue", "for", "new", "switch", "assert", "default", "if", "package",
    "synchronized", "boolean", "do", "goto", "private", "this", "break", "double", "implements",
    "protected", "throw", "byte", "else", "import", "public", "throws", "case", "enum",
    "instanceof", "return", "transient", "catch", "extends", "int", "short", "try", "char",
    "final", "interface", "static", "void", "class", "finally", "long", "strictfp", "volatile",
    "const", "float", "native", "super", "while", "type",
];

const DEFAULT_INCLUDES: &[&str] = &[
    "double", "Int", "Long", "Float", "Double", "char", "float", "String", "boolean", "Boolean",
    "Integer", "List", "Set", "Map",
];

const TEMPLATES: &[(&str, &str)] = &[
    ("macros.scala.tera", include_str!("../../templates/ScalaPlayFramework/macros.scala.tera")),
    ("model.scala.tera", include_str!("../../templates/ScalaPlayFramework/model.scala.tera")),
    (
        "newApiController.scala.tera",
        include_str!("../../templates/ScalaPlayFramework/newApiController.scala.tera"),
    ),
    ("newApi.scala.tera", include_str!("../../templates/ScalaPlayFramework/newApi.scala.tera")),
    (
        "newApiInterface.scala.tera",
        include_str!("../../templates/ScalaPlayFramework/newApiInterface.scala.tera"),
    ),
    ("README.tera", include_str!("../../templates/ScalaPlayFramework/README.tera")),
    ("LICENSE.tera", include_str!("../../templates/ScalaPlayFramework/LICENSE.tera")),
    ("build.sbt.tera", include_str!("../../templates/ScalaPlayFramework/build.sbt.tera")),
    (
        "build.properties.tera",
        include_str!("../../templates/ScalaPlayFramework/build.properties.tera"),
    ),
    ("plugins.sbt.tera", include_str!("../../templates/ScalaPlayFramework/plugins.sbt.tera")),
    ("logback.xml.tera", include_str!("../../templates/ScalaPlayFramework/logback.xml.tera")),
    (
        "application.conf.tera",
        include_str!("../../templates/ScalaPlayFramework/application.conf.tera"),
    ),
    ("routes.tera", include_str!("../../templates/ScalaPlayFramework/routes.tera")),
    (
        "JsonUtil.scala.tera",
        include_str!("../../templates/ScalaPlayFramework/JsonUtil.scala.tera"),
    ),
    ("swagger.json.tera", include_str!("../../templates/ScalaPlayFramework/swagger.json.tera")),
    (
        "ApiDocController.scala.tera",
        include_str!("../../templates/ScalaPlayFramework/ApiDocController.scala.tera"),
    ),
    (
        "ErrorHandler.scala.tera",
        include_str!("../../templates/ScalaPlayFramework/ErrorHandler.scala.tera"),
    ),
];

pub const INFO: BackendInfo = BackendInfo {
    name: NAME,
    tag: GeneratorTag::Server,
    help: "Generates a Scala Play Framework Server application.",
    template_folder: "ScalaPlayFramework",
    templates: TEMPLATES,
};

/// Build the backend
pub fn backend() -> Result<Backend> {
    Ok(Backend::new(
        INFO,
        options()?,
        Box::new(ScalaPlayLayout),
        Box::new(ScalaNaming),
        Box::new(ScalaPlayTypes),
        Box::new(ScalaPlayTemplates),
    )
    .with_post_processor(Box::new(ScalaPlayModels))
    .with_snapshot(Box::new(PrettyJsonSnapshot)))
}

/// Declared options, in the order they are listed by `config-help`
pub fn options() -> Result<GeneratorOptions> {
    let mut options = GeneratorOptions::new();
    options.declare(CliOption::string(
        TITLE,
        "server title name or client service name",
        "swagger-petstore",
    ))?;
    options.declare(CliOption::string(
        CONFIG_PACKAGE,
        "configuration package for generated code",
        "io.swagger.configuration",
    ))?;
    options.declare(CliOption::string(
        BASE_PACKAGE,
        "base package for generated code",
        "io.swagger",
    ))?;
    options.declare(CliOption::boolean(
        CONTROLLER_ONLY,
        "Whether to generate only API interface stubs without the server files.",
        false,
    ))?;
    options.declare(CliOption::boolean(
        USE_BEAN_VALIDATION,
        "Use BeanValidation API annotations",
        true,
    ))?;
    options.declare(CliOption::boolean(
        USE_INTERFACES,
        "Makes the controllerImp implements an interface to facilitate automatic completion when updating from version x to y of your spec",
        true,
    ))?;
    options.declare(CliOption::boolean(
        HANDLE_EXCEPTIONS,
        "Add a 'throw exception' to each controller function. Add also a custom error handler where you can put your custom logic",
        true,
    ))?;
    options.declare(CliOption::boolean(
        WRAP_CALLS,
        "Add a wrapper to each controller function to handle things like metrics, response modification, etc..",
        true,
    ))?;
    options.declare(CliOption::boolean(
        USE_SWAGGER_UI,
        "Add a route to /api which show your documentation in swagger-ui. Will also import needed dependencies",
        true,
    ))?;
    Ok(options)
}

/// Fixed package layout; config and base packages come from the options
#[derive(Debug, Default)]
pub struct ScalaPlayLayout;

impl ProjectLayout for ScalaPlayLayout {
    fn naming_context(&self, options: &ResolvedOptions) -> Result<NamingContext> {
        let mut ctx = NamingContext::new()
            .with_reserved_words(RESERVED_WORDS)
            .with_default_includes(DEFAULT_INCLUDES.iter().copied());
        ctx.api_package = "controllers".to_string();
        ctx.model_package = "apimodels".to_string();
        ctx.invoker_package = "io.swagger.api".to_string();
        ctx.config_package = options.string(CONFIG_PACKAGE)?.to_string();
        ctx.base_package = options.string(BASE_PACKAGE)?.to_string();
        ctx.source_folder = "app".to_string();
        Ok(ctx)
    }

    fn additional_properties(&self, _options: &ResolvedOptions) -> Result<JsonMap<String, JsonValue>> {
        let mut props = JsonMap::new();
        props.insert("jackson".to_string(), json!(true));
        props.insert("javaVersion".to_string(), json!("1.8"));
        props.insert("jdk8".to_string(), json!(true));
        Ok(props)
    }
}

/// Scala identifiers: reserved words are back-quoted
#[derive(Debug, Default)]
pub struct ScalaNaming;

impl NamingPolicy for ScalaNaming {
    fn escape_reserved_word(&self, name: &str) -> String {
        format!("`{name}`")
    }
}

/// Scala base mapping plus the Play overrides
#[derive(Debug, Default)]
pub struct ScalaPlayTypes;

impl TypeMappingPolicy for ScalaPlayTypes {
    fn type_mapping(&self, _options: &ResolvedOptions) -> Result<TypeMapping> {
        let mut mapping = TypeMapping::new();
        mapping
            .primitives([
                "String",
                "Boolean",
                "Int",
                "Long",
                "Float",
                "Double",
                "BigDecimal",
                "Array[Byte]",
                "Any",
            ])
            .map(source::STRING, "String")
            .map(source::BOOLEAN, "Boolean")
            .map(source::INTEGER, "Int")
            .map(source::LONG, "Long")
            .map(source::FLOAT, "Float")
            .map(source::DOUBLE, "Double")
            .map(source::NUMBER, "BigDecimal")
            .map(source::BYTE_ARRAY, "Array[Byte]")
            .map(source::OBJECT, "Any")
            .map(source::UUID, "UUID")
            .map(source::DATE, "LocalDate")
            .map(source::DATE_TIME, "OffsetDateTime")
            .map(source::FILE, FILE_PART)
            .map(source::BINARY, FILE_PART)
            .import("UUID", "java.util.UUID")
            .import("LocalDate", "java.time.LocalDate")
            .import("OffsetDateTime", "java.time.OffsetDateTime")
            .import("InputStream", "java.io.InputStream")
            .import(FILE_PART, "play.api.mvc.MultipartFormData");

        // Annotations are not emitted
        mapping.remove_import(API_MODEL_ANNOTATION);
        mapping.remove_import(API_MODEL_PROPERTY_ANNOTATION);
        Ok(mapping)
    }

    fn list_of(&self, inner: &str) -> String {
        format!("List[{inner}]")
    }

    fn map_of(&self, inner: &str) -> String {
        format!("Map[String, {inner}]")
    }
}

/// Template table keyed on the feature flags
#[derive(Debug, Default)]
pub struct ScalaPlayTemplates;

impl TemplateSelectionPolicy for ScalaPlayTemplates {
    fn select(
        &self,
        kind: ArtifactKind,
        options: &ResolvedOptions,
    ) -> Result<Option<TemplateAssignment>> {
        let assignment = match kind {
            ArtifactKind::Model => Some(("model.scala.tera", ".scala")),
            ArtifactKind::Controller => Some(("newApiController.scala.tera", "Controller.scala")),
            ArtifactKind::ControllerImpl => Some(("newApi.scala.tera", "ControllerImp.scala")),
            ArtifactKind::ControllerInterface if options.flag(USE_INTERFACES)? => {
                Some(("newApiInterface.scala.tera", "ControllerImpInterface.scala"))
            }
            ArtifactKind::ControllerInterface | ArtifactKind::Supporting => None,
        };
        Ok(assignment.map(|(template, suffix)| TemplateAssignment::new(kind, template, suffix)))
    }

    fn supporting_files(&self, options: &ResolvedOptions) -> Result<Vec<SupportingFile>> {
        let mut files = vec![
            SupportingFile::new("README.tera", "", "README"),
            SupportingFile::new("LICENSE.tera", "", "LICENSE"),
        ];

        if !options.flag(CONTROLLER_ONLY)? {
            files.extend([
                SupportingFile::new("build.sbt.tera", "", "build.sbt"),
                SupportingFile::new("build.properties.tera", "project", "build.properties"),
                SupportingFile::new("plugins.sbt.tera", "project", "plugins.sbt"),
                SupportingFile::new("logback.xml.tera", "conf", "logback.xml"),
                SupportingFile::new("application.conf.tera", "conf", "application.conf"),
                SupportingFile::new("routes.tera", "conf", "routes"),
            ]);
        }

        files.push(SupportingFile::new(
            "JsonUtil.scala.tera",
            "app/json",
            "JsonUtil.scala",
        ));

        if options.flag(USE_SWAGGER_UI)? {
            files.push(SupportingFile::new("swagger.json.tera", "public", "swagger.json").with_snapshot());
            files.push(SupportingFile::new(
                "ApiDocController.scala.tera",
                "app/controllers",
                "ApiDocController.scala",
            ));
        }

        if options.flag(HANDLE_EXCEPTIONS)? {
            files.push(SupportingFile::new("ErrorHandler.scala.tera", "app", "ErrorHandler.scala"));
        }

        Ok(files)
    }
}

/// Drops the annotation imports the generic engine adds
#[derive(Debug, Default)]
pub struct ScalaPlayModels;

impl ScalaPlayModels {
    fn drop_annotation_imports(model: &mut CodegenModel) {
        model.imports.remove(API_MODEL_PROPERTY_ANNOTATION);
        model.imports.remove(API_MODEL_ANNOTATION);
    }
}

impl ModelPostProcessor for ScalaPlayModels {
    fn post_process_property(&self, model: &mut CodegenModel, _property: &mut CodegenProperty) {
        Self::drop_annotation_imports(model);
    }

    fn post_process_model(&self, model: &mut CodegenModel) {
        Self::drop_annotation_imports(model);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OverridePolicy;
    use indexmap::IndexMap;
    use std::collections::BTreeSet;

    fn resolve(pairs: &[(&str, &str)]) -> ResolvedOptions {
        let overrides: IndexMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        options()
            .unwrap()
            .resolve(&overrides, OverridePolicy::default())
            .unwrap()
    }

    fn supporting_paths(pairs: &[(&str, &str)]) -> Vec<String> {
        ScalaPlayTemplates
            .supporting_files(&resolve(pairs))
            .unwrap()
            .iter()
            .map(SupportingFile::path)
            .collect()
    }

    #[test]
    fn test_declared_defaults() {
        let options = options().unwrap();
        let names: Vec<_> = options.cli_options().map(|o| o.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                TITLE,
                CONFIG_PACKAGE,
                BASE_PACKAGE,
                CONTROLLER_ONLY,
                USE_BEAN_VALIDATION,
                USE_INTERFACES,
                HANDLE_EXCEPTIONS,
                WRAP_CALLS,
                USE_SWAGGER_UI
            ]
        );

        let resolved = resolve(&[]);
        assert_eq!(resolved.string(TITLE).unwrap(), "swagger-petstore");
        assert_eq!(resolved.string(CONFIG_PACKAGE).unwrap(), "io.swagger.configuration");
        assert_eq!(resolved.string(BASE_PACKAGE).unwrap(), "io.swagger");
        assert!(!resolved.flag(CONTROLLER_ONLY).unwrap());
        for flag in [USE_BEAN_VALIDATION, USE_INTERFACES, HANDLE_EXCEPTIONS, WRAP_CALLS, USE_SWAGGER_UI] {
            assert!(resolved.flag(flag).unwrap(), "{flag} should default to true");
        }
    }

    #[test]
    fn test_layout() {
        let ctx = ScalaPlayLayout
            .naming_context(&resolve(&[(BASE_PACKAGE, "com.acme")]))
            .unwrap();
        assert_eq!(ctx.api_folder(), "app/controllers");
        assert_eq!(ctx.model_folder(), "app/apimodels");
        assert_eq!(ctx.base_package, "com.acme");
        assert_eq!(ctx.config_package, "io.swagger.configuration");
        assert!(ctx.is_default_include("List"));
        assert!(!ctx.is_default_include("LocalDate"));
    }

    #[test]
    fn test_every_reserved_word_is_escaped_in_any_casing() {
        let ctx = ScalaPlayLayout.naming_context(&resolve(&[])).unwrap();
        for word in RESERVED_WORDS {
            for casing in [word.to_string(), word.to_uppercase(), {
                let mut c = word.chars();
                c.next()
                    .map(|f| f.to_uppercase().collect::<String>() + c.as_str())
                    .unwrap_or_default()
            }] {
                assert!(ctx.is_reserved(&casing), "{casing} not reserved");
                let escaped = ScalaNaming.escape_reserved_word(&casing);
                assert_ne!(escaped, casing);
                assert!(escaped.starts_with('`') && escaped.ends_with('`'));
            }

            let var = ScalaNaming.var_name(&ctx, word);
            assert_ne!(&var, word);
            let model = ScalaNaming.model_name(&ctx, word);
            assert!(!ctx.is_reserved(&model), "{model} still reserved");
            let op = ScalaNaming.operation_id(&ctx, word);
            assert!(!ctx.is_reserved(&op), "{op} still reserved");
        }
    }

    #[test]
    fn test_type_mapping() {
        let mapping = ScalaPlayTypes.type_mapping(&resolve(&[])).unwrap();
        mapping.validate().unwrap();

        assert_eq!(mapping.map_type(source::DATE), "LocalDate");
        assert_eq!(mapping.map_type(source::DATE_TIME), "OffsetDateTime");
        assert_eq!(mapping.map_type(source::FILE), FILE_PART);
        assert_eq!(mapping.import_for("LocalDate"), Some("java.time.LocalDate"));
        assert_eq!(mapping.import_for("OffsetDateTime"), Some("java.time.OffsetDateTime"));
        assert_eq!(mapping.import_for("InputStream"), Some("java.io.InputStream"));
        assert!(mapping.import_for(API_MODEL_ANNOTATION).is_none());
        assert!(mapping.import_for(API_MODEL_PROPERTY_ANNOTATION).is_none());
        assert_eq!(ScalaPlayTypes.list_of("Pet"), "List[Pet]");
        assert_eq!(ScalaPlayTypes.map_of("Int"), "Map[String, Int]");
    }

    #[test]
    fn test_template_table() {
        let defaults = resolve(&[]);
        let select = |kind, options: &ResolvedOptions| {
            ScalaPlayTemplates
                .select(kind, options)
                .unwrap()
                .map(|a| (a.template, a.suffix))
        };

        assert_eq!(
            select(ArtifactKind::Model, &defaults),
            Some(("model.scala.tera".into(), ".scala".into()))
        );
        assert_eq!(
            select(ArtifactKind::Controller, &defaults),
            Some(("newApiController.scala.tera".into(), "Controller.scala".into()))
        );
        assert_eq!(
            select(ArtifactKind::ControllerImpl, &defaults),
            Some(("newApi.scala.tera".into(), "ControllerImp.scala".into()))
        );
        assert_eq!(
            select(ArtifactKind::ControllerInterface, &defaults),
            Some((
                "newApiInterface.scala.tera".into(),
                "ControllerImpInterface.scala".into()
            ))
        );
        assert_eq!(select(ArtifactKind::Supporting, &defaults), None);

        let no_interfaces = resolve(&[(USE_INTERFACES, "false")]);
        assert_eq!(select(ArtifactKind::ControllerInterface, &no_interfaces), None);
        assert!(select(ArtifactKind::ControllerImpl, &no_interfaces).is_some());
    }

    #[test]
    fn test_supporting_files_default() {
        let paths = supporting_paths(&[]);
        for expected in [
            "README",
            "LICENSE",
            "build.sbt",
            "project/build.properties",
            "project/plugins.sbt",
            "conf/logback.xml",
            "conf/application.conf",
            "conf/routes",
            "app/json/JsonUtil.scala",
            "public/swagger.json",
            "app/controllers/ApiDocController.scala",
            "app/ErrorHandler.scala",
        ] {
            assert!(paths.iter().any(|p| p == expected), "missing {expected}");
        }
    }

    #[test]
    fn test_controller_only_drops_project_files() {
        let paths = supporting_paths(&[(CONTROLLER_ONLY, "true")]);
        for dropped in ["build.sbt", "conf/routes", "project/plugins.sbt", "conf/application.conf"] {
            assert!(!paths.iter().any(|p| p == dropped), "{dropped} present");
        }
        assert!(paths.iter().any(|p| p == "app/json/JsonUtil.scala"));
    }

    #[test]
    fn test_flags_gate_optional_files() {
        let paths = supporting_paths(&[(USE_SWAGGER_UI, "false"), (HANDLE_EXCEPTIONS, "false")]);
        assert!(!paths.iter().any(|p| p == "public/swagger.json"));
        assert!(!paths.iter().any(|p| p == "app/controllers/ApiDocController.scala"));
        assert!(!paths.iter().any(|p| p == "app/ErrorHandler.scala"));

        let files = ScalaPlayTemplates.supporting_files(&resolve(&[])).unwrap();
        let snapshot: Vec<_> = files.iter().filter(|f| f.needs_snapshot).map(|f| f.path()).collect();
        assert_eq!(snapshot, vec!["public/swagger.json"]);
    }

    #[test]
    fn test_post_processing_is_idempotent() {
        let mut model = CodegenModel {
            name: "Pet".into(),
            classname: "Pet".into(),
            classvarname: "pet".into(),
            classfilename: "Pet".into(),
            description: Some("A pet".into()),
            vars: Vec::new(),
            imports: [API_MODEL_ANNOTATION, API_MODEL_PROPERTY_ANNOTATION, "LocalDate"]
                .into_iter()
                .map(String::from)
                .collect(),
            has_enums: false,
            has_validation: false,
        };

        ScalaPlayModels.post_process_model(&mut model);
        let once = model.clone();
        ScalaPlayModels.post_process_model(&mut model);
        assert_eq!(model, once);
        assert_eq!(model.imports, BTreeSet::from(["LocalDate".to_string()]));
    }

    #[test]
    fn test_backend_info() {
        let backend = backend().unwrap();
        assert_eq!(backend.name(), "scala-play-framework");
        assert_eq!(backend.info().tag, GeneratorTag::Server);
        assert_eq!(backend.info().templates.len(), 17);
    }
}
