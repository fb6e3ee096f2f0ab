//! Template loading and rendering

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde_json::Value as JsonValue;
use tera::{Context, Tera};
use tokio::task;

use crate::{
    error::{Error, Result},
    manifest::TemplateManifest,
};

use super::TemplateDir;

/// Renders templates by identifier.
///
/// Built-in templates are compiled into the binary; an override directory,
/// when given, replaces any built-in template with the same identifier and
/// may add new ones together with an overlay [`TemplateManifest`].
#[derive(Debug, Clone)]
pub struct TemplateManager {
    /// Cached Tera template engine instance
    tera: Arc<Tera>,
    template_dir: Option<TemplateDir>,
    manifest: TemplateManifest,
}

impl TemplateManager {
    /// Create a manager from built-in `(identifier, source)` pairs and an
    /// optional override directory
    pub async fn new(builtin: &[(&str, &str)], template_dir: Option<TemplateDir>) -> Result<Self> {
        let mut tera = Tera::default();
        // Generated sources are not HTML
        tera.autoescape_on(vec![]);
        tera.add_raw_templates(builtin.iter().copied())?;
        log::debug!("Registered {} built-in templates", builtin.len());

        let manifest = match &template_dir {
            Some(dir) => {
                let root = dir.template_path();
                let mut overrides = Vec::new();
                for path in Self::discover_template_files(root).await? {
                    let name = template_name(root, &path)?;
                    let content = tokio::fs::read_to_string(&path).await?;
                    log::debug!("Template override: {}", name);
                    overrides.push((name, content));
                }
                tera.add_raw_templates(overrides)?;
                TemplateManifest::load_from_dir(root).await?
            }
            None => TemplateManifest::default(),
        };

        Ok(Self {
            tera: Arc::new(tera),
            template_dir,
            manifest,
        })
    }

    pub fn template_dir(&self) -> Option<&TemplateDir> {
        self.template_dir.as_ref()
    }

    /// The overlay manifest; empty without an override directory
    pub fn manifest(&self) -> &TemplateManifest {
        &self.manifest
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template(name).is_ok()
    }

    /// Find every `.tera` file below `dir`.
    ///
    /// Runs on the blocking pool.
    pub async fn discover_template_files(dir: &Path) -> Result<Vec<PathBuf>> {
        let dir_buf = dir.to_path_buf();

        task::spawn_blocking(move || {
            let mut templates = Vec::new();

            fn walk_dir(dir: &Path, templates: &mut Vec<PathBuf>) -> std::io::Result<()> {
                for entry in std::fs::read_dir(dir)? {
                    let entry = entry?;
                    let path = entry.path();

                    if path.is_dir() {
                        walk_dir(&path, templates)?;
                    } else if path.extension().and_then(|s| s.to_str()) == Some("tera") {
                        templates.push(path);
                    }
                }
                Ok(())
            }

            walk_dir(&dir_buf, &mut templates)?;
            templates.sort();
            Ok(templates)
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Failed to join blocking task: {}", e)))?
    }

    /// Render a template with a JSON object as context
    pub fn render(&self, template_name: &str, context: &JsonValue) -> Result<String> {
        if !context.is_object() {
            return Err(Error::template(format!(
                "Context for '{}' must be a JSON object",
                template_name
            )));
        }
        if !self.has_template(template_name) {
            return Err(Error::template(format!(
                "Template not found: {}",
                template_name
            )));
        }

        let tera_context = Context::from_value(context.clone())?;
        log::debug!("Rendering template: {}", template_name);
        self.tera.render(template_name, &tera_context).map_err(|e| {
            log::error!("Template rendering failed for '{}': {}", template_name, e);
            Error::template(format!(
                "Failed to render template '{}': {}",
                template_name,
                error_chain(&e)
            ))
        })
    }
}

/// Identifier of an override file: its path below the root, `/`-separated
fn template_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|_| {
        Error::template(format!(
            "Template {} is outside {}",
            path.display(),
            root.display()
        ))
    })?;
    let parts: Option<Vec<&str>> = relative.iter().map(|p| p.to_str()).collect();
    parts
        .map(|parts| parts.join("/"))
        .ok_or_else(|| Error::template(format!("Non UTF-8 template path: {}", path.display())))
}

/// Flatten a tera error and its sources into one line
fn error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    const BUILTIN: &[(&str, &str)] = &[
        ("hello.tera", "Hello {{ name }}!"),
        ("nested/path.scala.tera", "package {{ pkg }}"),
        ("broken.tera", "{{ missing.field }}"),
    ];

    #[tokio::test]
    async fn test_builtin_templates() -> Result<()> {
        let manager = TemplateManager::new(BUILTIN, None).await?;
        assert!(manager.has_template("nested/path.scala.tera"));
        assert!(manager.template_dir().is_none());
        assert!(manager.manifest().files.is_empty());

        let output = manager.render("hello.tera", &json!({"name": "<World>"}))?;
        assert_eq!(output, "Hello <World>!");
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_template() -> Result<()> {
        let manager = TemplateManager::new(BUILTIN, None).await?;
        let err = manager.render("nope.tera", &json!({})).unwrap_err();
        assert!(err.to_string().contains("Template not found: nope.tera"));
        Ok(())
    }

    #[tokio::test]
    async fn test_render_failure_names_template() -> Result<()> {
        let manager = TemplateManager::new(BUILTIN, None).await?;
        let err = manager.render("broken.tera", &json!({})).unwrap_err();
        assert!(matches!(err, Error::Template(_)));
        assert!(err.to_string().contains("broken.tera"));
        Ok(())
    }

    #[tokio::test]
    async fn test_override_dir_replaces_builtin() -> Result<()> {
        let temp_dir = tempdir()?;
        let root = temp_dir.path().join("ScalaPlayFramework");
        tokio::fs::create_dir_all(root.join("nested")).await?;
        tokio::fs::write(root.join("hello.tera"), "Hi {{ name }}").await?;
        tokio::fs::write(root.join("nested/extra.tera"), "extra").await?;
        tokio::fs::write(root.join("notes.txt"), "ignored").await?;
        tokio::fs::write(
            root.join("manifest.yaml"),
            "files:\n  - source: nested/extra.tera\n    destination: EXTRA\n",
        )
        .await?;

        let dir = TemplateDir::explicit("ScalaPlayFramework", temp_dir.path())?;
        let manager = TemplateManager::new(BUILTIN, Some(dir)).await?;

        assert_eq!(manager.render("hello.tera", &json!({"name": "there"}))?, "Hi there");
        assert!(manager.has_template("nested/extra.tera"));
        assert!(!manager.has_template("notes.txt"));
        assert_eq!(manager.manifest().files[0].destination, "EXTRA");
        Ok(())
    }
}
