//! Output manifest and template overlay manifest.
//!
//! [`OutputManifest`] is the ordered list of files a run will produce.
//! [`TemplateManifest`] is the optional `manifest.yaml` / `manifest.toml`
//! found in a template override directory; it adds extra files and shell
//! hooks to a run.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use serde_value::Value as SerdeValue;
use tokio::fs;

use crate::error::{Error, Result};
use crate::templates::ArtifactKind;

/// One file to render
#[derive(Debug, Clone, Serialize)]
pub struct ManifestEntry {
    pub kind: ArtifactKind,
    /// Template identifier
    pub template: String,
    /// Destination relative to the output root, always `/`-separated
    pub destination: String,
    /// Render context
    pub context: JsonValue,
}

/// Ordered `(template, destination, context)` triples
#[derive(Debug, Clone, Default, Serialize)]
pub struct OutputManifest {
    entries: Vec<ManifestEntry>,
}

impl OutputManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. A later entry for the same destination replaces the earlier one.
    pub fn push(
        &mut self,
        kind: ArtifactKind,
        template: impl Into<String>,
        destination: impl Into<String>,
        context: JsonValue,
    ) {
        let destination = destination.into();
        if let Some(pos) = self.entries.iter().position(|e| e.destination == destination) {
            log::warn!("Replacing earlier manifest entry for {}", destination);
            self.entries.remove(pos);
        }
        self.entries.push(ManifestEntry {
            kind,
            template: template.into(),
            destination,
            context,
        });
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn destinations(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.destination.as_str())
    }

    pub fn contains(&self, destination: &str) -> bool {
        self.destinations().any(|d| d == destination)
    }

    pub fn count(&self, kind: ArtifactKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }
}

/// Overlay manifest of a template override directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateManifest {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub version: String,

    /// Extra files rendered once per run, next to the built-in supporting files
    #[serde(default)]
    pub files: Vec<TemplateFile>,

    #[serde(default)]
    pub hooks: TemplateHooks,
}

/// An extra file listed in an overlay manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateFile {
    /// Template path relative to the override directory
    pub source: String,

    /// Destination relative to the output root
    pub destination: String,
}

/// Shell commands run in the output root
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateHooks {
    /// Run after rendering, before anything is published
    #[serde(default, deserialize_with = "deserialize_commands")]
    pub pre_generate: Vec<String>,

    /// Run after every file has been published
    #[serde(default, deserialize_with = "deserialize_commands")]
    pub post_generate: Vec<String>,
}

impl TemplateManifest {
    /// Load `manifest.yaml` or `manifest.toml` from a directory.
    /// A directory without either yields an empty manifest.
    pub async fn load_from_dir(template_dir: &Path) -> Result<Self> {
        let yaml_path = template_dir.join("manifest.yaml");
        let toml_path = template_dir.join("manifest.toml");

        if fs::try_exists(&yaml_path).await? {
            log::debug!("Reading template manifest {}", yaml_path.display());
            let content = fs::read_to_string(&yaml_path).await?;
            serde_yaml::from_str(&content).map_err(|e| {
                Error::template(format!(
                    "Invalid YAML in template manifest at {}: {}",
                    yaml_path.display(),
                    e
                ))
            })
        } else if fs::try_exists(&toml_path).await? {
            log::debug!("Reading template manifest {}", toml_path.display());
            let content = fs::read_to_string(&toml_path).await?;
            toml::from_str(&content).map_err(|e| {
                Error::template(format!(
                    "Invalid TOML in template manifest at {}: {}",
                    toml_path.display(),
                    e
                ))
            })
        } else {
            Ok(Self::default())
        }
    }
}

/// Accept either a single command or a list of commands
fn deserialize_commands<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = SerdeValue::deserialize(deserializer)?;

    match value {
        SerdeValue::String(s) => Ok(vec![s]),
        SerdeValue::Seq(seq) => seq
            .into_iter()
            .map(|item| match item {
                SerdeValue::String(s) => Ok(s),
                _ => Err(serde::de::Error::custom(
                    "Expected string or array of strings",
                )),
            })
            .collect(),
        _ => Err(serde::de::Error::custom(
            "Expected string or array of strings",
        )),
    }
}
