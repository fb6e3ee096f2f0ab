//! Generation engine and emission pipeline.
//!
//! A run goes through four steps:
//!
//! 1. [`Generator::new`] resolves options and loads templates (setup errors surface here)
//! 2. [`Generator::plan`] builds the IR, runs the backend hooks and produces the [`OutputManifest`]
//! 3. [`Generator::render`] renders every entry in memory
//! 4. [`emit`] writes the files into a staging directory and publishes them
//!
//! Nothing is written under the output root before every file has rendered,
//! and nothing reaches its final path before every file has been staged.

use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Map as JsonMap, Value as JsonValue};
use tokio::process::Command as AsyncCommand;

use crate::{
    backend::{Backend, BackendSetup, GeneratorRegistry},
    codegen::{CodegenApi, CodegenModel, Normalizer},
    config::Config,
    error::{Error, Result},
    manifest::OutputManifest,
    openapi::OpenApiContext,
    options::OverridePolicy,
    templates::{ArtifactKind, TemplateDir, TemplateManager},
};

/// A rendered file, not yet written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    /// Relative to the output root
    pub destination: String,
    pub content: String,
}

/// What a run produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationSummary {
    /// Destinations, relative to the output root, in manifest order
    pub files: Vec<String>,
    pub models: usize,
    pub apis: usize,
    /// Files left out because their data could not be produced
    pub skipped: Vec<String>,
}

/// The result of planning a run
#[derive(Debug, Clone)]
pub struct Plan {
    pub manifest: OutputManifest,
    pub models: Vec<CodegenModel>,
    pub apis: Vec<CodegenApi>,
    pub skipped: Vec<String>,
}

/// Drives one backend over one specification
#[derive(Debug)]
pub struct Generator {
    backend: Backend,
    setup: BackendSetup,
    templates: TemplateManager,
}

impl Generator {
    /// Resolve options and load templates.
    ///
    /// `template_dir` is an explicit override directory; without one the
    /// standard locations are searched and the built-in templates used
    /// when none exists.
    pub async fn new(
        backend: Backend,
        overrides: &IndexMap<String, String>,
        policy: OverridePolicy,
        template_dir: Option<&Path>,
    ) -> Result<Self> {
        let setup = backend.setup(overrides, policy)?;

        let folder = backend.info().template_folder;
        let dir = match template_dir {
            Some(dir) => Some(TemplateDir::explicit(folder, dir)?),
            None => TemplateDir::discover(folder),
        };
        let templates = TemplateManager::new(backend.info().templates, dir).await?;

        for assignment in setup.assignments.values() {
            if !templates.has_template(&assignment.template) {
                return Err(Error::template(format!(
                    "Template not found: {} (selected for {})",
                    assignment.template, assignment.kind
                )));
            }
        }

        log::info!("Using generator {}", backend.name());
        Ok(Self {
            backend,
            setup,
            templates,
        })
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn setup(&self) -> &BackendSetup {
        &self.setup
    }

    pub fn templates(&self) -> &TemplateManager {
        &self.templates
    }

    /// Values shared by every render context
    fn base_context(&self, spec: &OpenApiContext, base_url: Option<&str>) -> JsonMap<String, JsonValue> {
        let ctx = &self.setup.naming;
        let mut base = self.setup.options.to_json();
        base.extend(self.setup.additional_properties.clone());

        base.insert("generatorName".into(), json!(self.backend.name()));
        base.insert("apiPackage".into(), json!(ctx.api_package));
        base.insert("modelPackage".into(), json!(ctx.model_package));
        base.insert("invokerPackage".into(), json!(ctx.invoker_package));
        base.insert("configPackage".into(), json!(ctx.config_package));
        base.insert("basePackage".into(), json!(ctx.base_package));
        base.insert("sourceFolder".into(), json!(ctx.source_folder));

        base.insert("appName".into(), json!(spec.title().unwrap_or("")));
        base.insert("appVersion".into(), json!(spec.version().unwrap_or("1.0.0")));
        base.insert(
            "appDescription".into(),
            json!(spec.description().map(OpenApiContext::sanitize_markdown)),
        );
        base.insert("basePath".into(), json!(spec.base_path()));
        let base_url = spec.base_url().or_else(|| base_url.map(String::from));
        base.insert("baseUrl".into(), json!(base_url));
        base
    }

    /// Build the IR and the output manifest
    pub fn plan(&self, spec: &OpenApiContext) -> Result<Plan> {
        self.plan_with_base_url(spec, None)
    }

    /// Like [`Generator::plan`], with a fallback server URL
    pub fn plan_with_base_url(&self, spec: &OpenApiContext, base_url: Option<&str>) -> Result<Plan> {
        let setup = &self.setup;
        let normalizer = Normalizer::new(
            self.backend.naming(),
            &setup.naming,
            self.backend.types(),
            &setup.type_mapping,
        )
        .with_aliases(spec);

        let mut models = Vec::new();
        for (name, schema) in spec.definitions() {
            if normalizer.is_alias(&name) {
                log::debug!("Definition {} is an alias, no model emitted", name);
                continue;
            }
            let mut model = normalizer.from_model(spec, &name, &schema);
            self.backend.post_process_model(&mut model);
            models.push(model);
        }

        let operations = spec.parse_operations()?;
        let apis = normalizer.group_operations(spec, &operations);
        log::info!(
            "Found {} models and {} operations in {} APIs",
            models.len(),
            operations.len(),
            apis.len()
        );

        let base = self.base_context(spec, base_url);
        let mut manifest = OutputManifest::new();

        if let Some(assignment) = setup.assignment(ArtifactKind::Model) {
            let folder = setup.naming.model_folder();
            for model in &models {
                let mut context = base.clone();
                context.insert("package".into(), json!(setup.naming.model_package));
                context.insert("imports".into(), json!(model.import_paths(&setup.type_mapping)));
                context.insert("model".into(), serde_json::to_value(model)?);
                manifest.push(
                    ArtifactKind::Model,
                    &assignment.template,
                    join(&folder, &assignment.file_name(&model.classfilename)),
                    JsonValue::Object(context),
                );
            }
        }

        let folder = setup.naming.api_folder();
        for api in &apis {
            let mut context = base.clone();
            context.insert("package".into(), json!(setup.naming.api_package));
            context.insert("imports".into(), json!(api.import_paths(&setup.type_mapping)));
            context.insert("classname".into(), json!(api.classname));
            context.insert("api".into(), serde_json::to_value(api)?);
            let context = JsonValue::Object(context);

            for kind in ArtifactKind::per_api() {
                if let Some(assignment) = setup.assignment(kind) {
                    manifest.push(
                        kind,
                        &assignment.template,
                        join(&folder, &assignment.file_name(&api.classname)),
                        context.clone(),
                    );
                }
            }
        }

        let mut supporting = base;
        supporting.insert("models".into(), serde_json::to_value(&models)?);
        supporting.insert("apis".into(), serde_json::to_value(&apis)?);
        let snapshot_ok = self
            .backend
            .post_process_supporting_data(spec, &mut supporting);
        let supporting = JsonValue::Object(supporting);

        let mut skipped = Vec::new();
        for file in &setup.supporting_files {
            if file.needs_snapshot && !snapshot_ok {
                log::warn!("Skipping {}: no specification snapshot", file.path());
                skipped.push(file.path());
                continue;
            }
            manifest.push(
                ArtifactKind::Supporting,
                &file.template,
                file.path(),
                supporting.clone(),
            );
        }

        for file in &self.templates.manifest().files {
            manifest.push(
                ArtifactKind::Supporting,
                &file.source,
                &file.destination,
                supporting.clone(),
            );
        }

        Ok(Plan {
            manifest,
            models,
            apis,
            skipped,
        })
    }

    /// Render every manifest entry in memory
    pub fn render(&self, manifest: &OutputManifest) -> Result<Vec<RenderedFile>> {
        manifest
            .iter()
            .map(|entry| {
                validate_destination(&entry.destination)?;
                let content = self.templates.render(&entry.template, &entry.context)?;
                Ok(RenderedFile {
                    destination: entry.destination.clone(),
                    content,
                })
            })
            .collect()
    }

    /// Plan, render, emit and run the overlay hooks
    pub async fn generate(&self, spec: &OpenApiContext, output_root: &Path) -> Result<GenerationSummary> {
        self.generate_with_base_url(spec, output_root, None).await
    }

    pub async fn generate_with_base_url(
        &self,
        spec: &OpenApiContext,
        output_root: &Path,
        base_url: Option<&str>,
    ) -> Result<GenerationSummary> {
        let plan = self.plan_with_base_url(spec, base_url)?;
        let files = self.render(&plan.manifest)?;

        let hooks = &self.templates.manifest().hooks;
        tokio::fs::create_dir_all(output_root).await?;
        run_hooks(&hooks.pre_generate, output_root).await?;
        emit(output_root, &files).await?;
        run_hooks(&hooks.post_generate, output_root).await?;

        log::info!(
            "Generated {} files in {}",
            files.len(),
            output_root.display()
        );
        Ok(GenerationSummary {
            files: files.into_iter().map(|f| f.destination).collect(),
            models: plan.models.len(),
            apis: plan.apis.len(),
            skipped: plan.skipped,
        })
    }
}

/// Main entry point: run the configured backend over the configured specification
pub async fn generate(config: &Config) -> Result<GenerationSummary> {
    let backend = GeneratorRegistry::with_builtins().create(&config.generator)?;
    let generator = Generator::new(
        backend,
        &config.additional_properties,
        config.override_policy(),
        config.template_dir.as_deref().map(Path::new),
    )
    .await?;

    let spec = OpenApiContext::from_file_or_url(&config.spec_path).await?;
    let base_url = config.base_url.as_ref().map(|u| u.as_str());
    generator
        .generate_with_base_url(&spec, Path::new(&config.output_dir), base_url)
        .await
}

/// Write files into a staging directory inside `output_root`, then move
/// each into place. A failure while staging leaves the output root untouched.
pub async fn emit(output_root: &Path, files: &[RenderedFile]) -> Result<()> {
    tokio::fs::create_dir_all(output_root).await?;
    let staging = tempfile::Builder::new()
        .prefix(".playgen-staging-")
        .tempdir_in(output_root)?;

    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(files.len());
    for file in files {
        let relative = validate_destination(&file.destination)?;
        let staged_path = staging.path().join(&relative);
        if let Some(parent) = staged_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&staged_path, &file.content).await?;
        staged.push((staged_path, output_root.join(relative)));
    }

    for (from, to) in &staged {
        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::rename(from, to).await?;
        log::debug!("Wrote {}", to.display());
    }

    staging.close()?;
    Ok(())
}

/// Destinations must stay below the output root
fn validate_destination(destination: &str) -> Result<PathBuf> {
    let path = PathBuf::from(destination);
    let escapes = path.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if destination.is_empty() || escapes {
        return Err(Error::template(format!(
            "Invalid output destination '{}'",
            destination
        )));
    }
    Ok(path)
}

fn join(folder: &str, file: &str) -> String {
    if folder.is_empty() {
        file.to_string()
    } else {
        format!("{}/{}", folder.trim_end_matches('/'), file)
    }
}

async fn run_hooks(commands: &[String], dir: &Path) -> Result<()> {
    for command in commands {
        log::info!("Running hook: {}", command);
        let output = AsyncCommand::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(dir)
            .output()
            .await
            .map_err(|e| {
                std::io::Error::new(
                    e.kind(),
                    format!("Failed to execute hook '{}': {}", command, e),
                )
            })?;

        if !output.status.success() {
            return Err(Error::template(format!(
                "Hook '{}' failed with {}: {}",
                command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{scala_play, SpecSnapshot};
    use tempfile::tempdir;

    const PETSTORE: &str = r##"
swagger: "2.0"
info:
  title: Swagger Petstore
  version: 1.0.0
  description: A sample server
host: petstore.swagger.io
basePath: /v2
schemes: [https]
paths:
  /pet/{petId}:
    get:
      tags: [pet]
      operationId: getPetById
      parameters:
        - name: petId
          in: path
          required: true
          type: integer
          format: int64
      responses:
        "200":
          description: ok
          schema:
            $ref: "#/definitions/Pet"
    delete:
      tags: [pet]
      operationId: deletePet
      parameters:
        - name: petId
          in: path
          required: true
          type: integer
          format: int64
      responses:
        "400":
          description: invalid id
  /store/order:
    post:
      tags: [store]
      operationId: placeOrder
      parameters:
        - name: body
          in: body
          required: true
          schema:
            $ref: "#/definitions/Order"
      responses:
        "200":
          description: ok
          schema:
            $ref: "#/definitions/Order"
definitions:
  Pet:
    description: A pet for sale
    required: [name]
    properties:
      id:
        type: integer
        format: int64
      name:
        type: string
      type:
        type: string
      birthday:
        type: string
        format: date
  Order:
    properties:
      id:
        type: integer
        format: int64
      shipDate:
        type: string
        format: date-time
"##;

    fn petstore() -> OpenApiContext {
        OpenApiContext::parse_content(PETSTORE).unwrap()
    }

    fn overrides(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    async fn generator(pairs: &[(&str, &str)]) -> Generator {
        Generator::new(
            scala_play::backend().unwrap(),
            &overrides(pairs),
            OverridePolicy::default(),
            None,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_plan_default_layout() {
        let generator = generator(&[]).await;
        let plan = generator.plan(&petstore()).unwrap();
        let manifest = &plan.manifest;

        for expected in [
            "app/apimodels/Pet.scala",
            "app/apimodels/Order.scala",
            "app/controllers/PetApiController.scala",
            "app/controllers/PetApiControllerImp.scala",
            "app/controllers/PetApiControllerImpInterface.scala",
            "app/controllers/StoreApiController.scala",
            "build.sbt",
            "conf/routes",
            "public/swagger.json",
            "app/ErrorHandler.scala",
        ] {
            assert!(manifest.contains(expected), "missing {expected}");
        }
        assert_eq!(manifest.count(ArtifactKind::Model), 2);
        assert_eq!(manifest.count(ArtifactKind::ControllerInterface), 2);
        assert!(plan.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_controller_only() {
        let generator = generator(&[("controllerOnly", "true")]).await;
        let manifest = generator.plan(&petstore()).unwrap().manifest;
        assert!(!manifest.contains("build.sbt"));
        assert!(!manifest.contains("conf/routes"));
        assert!(manifest.contains("app/controllers/PetApiController.scala"));
        assert!(manifest.contains("app/controllers/PetApiControllerImp.scala"));
    }

    #[tokio::test]
    async fn test_without_interfaces() {
        let generator = generator(&[("useInterfaces", "false")]).await;
        let manifest = generator.plan(&petstore()).unwrap().manifest;
        assert_eq!(manifest.count(ArtifactKind::ControllerInterface), 0);
        assert_eq!(manifest.count(ArtifactKind::ControllerImpl), 2);

        let files = generator.render(&manifest).unwrap();
        let imp = files
            .iter()
            .find(|f| f.destination == "app/controllers/PetApiControllerImp.scala")
            .unwrap();
        assert!(!imp.content.contains("ControllerImpInterface"));
    }

    #[tokio::test]
    async fn test_date_properties_import_java_time() {
        let generator = generator(&[]).await;
        let plan = generator.plan(&petstore()).unwrap();
        let mapping = &generator.setup().type_mapping;

        let pet = plan.models.iter().find(|m| m.classname == "Pet").unwrap();
        let birthday = pet.vars.iter().find(|v| v.base_name == "birthday").unwrap();
        assert_eq!(birthday.data_type, "LocalDate");
        assert!(pet.import_paths(mapping).contains(&"java.time.LocalDate".to_string()));
        assert!(!pet.imports.contains("ApiModel"));
        assert!(!pet.imports.contains("ApiModelProperty"));

        let order = plan.models.iter().find(|m| m.classname == "Order").unwrap();
        let ship = order.vars.iter().find(|v| v.base_name == "shipDate").unwrap();
        assert_eq!(ship.data_type, "OffsetDateTime");
        assert!(order
            .import_paths(mapping)
            .contains(&"java.time.OffsetDateTime".to_string()));

        let files = generator.render(&plan.manifest).unwrap();
        let pet_file = files
            .iter()
            .find(|f| f.destination == "app/apimodels/Pet.scala")
            .unwrap();
        assert!(pet_file.content.contains("import java.time.LocalDate"));
        assert!(pet_file.content.contains("`type`: Option[String]"));
    }

    struct Failing;

    impl SpecSnapshot for Failing {
        fn snapshot(&self, _spec: &OpenApiContext) -> Result<String> {
            Err(Error::template("snapshot unavailable"))
        }
    }

    #[tokio::test]
    async fn test_snapshot_failure_only_drops_swagger_json() -> Result<()> {
        let full = generator_paths(&generator(&[]).await);

        let backend = scala_play::backend()?.with_snapshot(Box::new(Failing));
        let generator =
            Generator::new(backend, &IndexMap::new(), OverridePolicy::default(), None).await?;

        let out = tempdir()?;
        let summary = generator.generate(&petstore(), out.path()).await?;
        assert_eq!(summary.skipped, vec!["public/swagger.json".to_string()]);
        assert!(!out.path().join("public/swagger.json").exists());
        assert!(out.path().join("app/controllers/ApiDocController.scala").exists());

        let missing: Vec<_> = full.iter().filter(|p| !summary.files.contains(p)).collect();
        assert_eq!(missing, vec!["public/swagger.json"]);
        Ok(())
    }

    fn generator_paths(generator: &Generator) -> Vec<String> {
        generator
            .plan(&petstore())
            .unwrap()
            .manifest
            .destinations()
            .map(String::from)
            .collect()
    }

    #[tokio::test]
    async fn test_generate_writes_project() -> Result<()> {
        let generator = generator(&[]).await;
        let out = tempdir()?;
        let summary = generator.generate(&petstore(), out.path()).await?;

        assert_eq!(summary.models, 2);
        assert_eq!(summary.apis, 2);
        for file in &summary.files {
            assert!(out.path().join(file).is_file(), "{file} not written");
        }

        let routes = tokio::fs::read_to_string(out.path().join("conf/routes")).await?;
        assert!(routes.contains("GET     /v2/pet/:petId"));
        assert!(routes.contains("controllers.PetApiController.getPetById(petId: Long)"));

        let swagger = tokio::fs::read_to_string(out.path().join("public/swagger.json")).await?;
        let parsed: JsonValue = serde_json::from_str(&swagger)?;
        assert_eq!(parsed["info"]["title"], "Swagger Petstore");

        // Staging directory is gone
        let mut entries = tokio::fs::read_dir(out.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            assert!(!name.to_string_lossy().starts_with(".playgen-staging-"));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_render_failure_publishes_nothing() -> Result<()> {
        let templates = tempdir()?;
        let folder = templates.path().join("ScalaPlayFramework");
        tokio::fs::create_dir_all(&folder).await?;
        tokio::fs::write(folder.join("routes.tera"), "{{ no_such_value.field }}").await?;

        let generator = Generator::new(
            scala_play::backend()?,
            &IndexMap::new(),
            OverridePolicy::default(),
            Some(templates.path()),
        )
        .await?;

        let out = tempdir()?;
        let err = generator.generate(&petstore(), out.path()).await.unwrap_err();
        assert!(err.to_string().contains("routes.tera"));

        let mut entries = tokio::fs::read_dir(out.path()).await?;
        assert!(entries.next_entry().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_boolean_fails_at_setup() {
        let err = Generator::new(
            scala_play::backend().unwrap(),
            &overrides(&[("useInterfaces", "yes")]),
            OverridePolicy::default(),
            None,
        )
        .await
        .unwrap_err();
        assert!(err.is_setup_error());
    }

    #[tokio::test]
    async fn test_emit_rejects_escaping_destinations() -> Result<()> {
        let out = tempdir()?;
        let files = vec![
            RenderedFile {
                destination: "ok.txt".into(),
                content: "ok".into(),
            },
            RenderedFile {
                destination: "../escape.txt".into(),
                content: "no".into(),
            },
        ];
        assert!(emit(out.path(), &files).await.is_err());
        assert!(!out.path().join("ok.txt").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_overlay_manifest_adds_files_and_hooks() -> Result<()> {
        let templates = tempdir()?;
        let folder = templates.path().join("ScalaPlayFramework");
        tokio::fs::create_dir_all(&folder).await?;
        tokio::fs::write(folder.join("NOTICE.tera"), "{{ appName }} {{ apis | length }}").await?;
        tokio::fs::write(
            folder.join("manifest.yaml"),
            "files:\n  - source: NOTICE.tera\n    destination: NOTICE\nhooks:\n  post_generate: touch hooked\n",
        )
        .await?;

        let generator = Generator::new(
            scala_play::backend()?,
            &IndexMap::new(),
            OverridePolicy::default(),
            Some(templates.path()),
        )
        .await?;
        let out = tempdir()?;
        generator.generate(&petstore(), out.path()).await?;

        let notice = tokio::fs::read_to_string(out.path().join("NOTICE")).await?;
        assert_eq!(notice, "Swagger Petstore 2");
        assert!(out.path().join("hooked").exists());
        Ok(())
    }
}
