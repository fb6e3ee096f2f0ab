//! Feature-flag driven template selection.

use serde::Serialize;

use crate::error::Result;
use crate::options::ResolvedOptions;

use super::ArtifactKind;

/// The template chosen for one artifact kind and the output file suffix
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateAssignment {
    pub kind: ArtifactKind,
    /// Template identifier as registered with the renderer
    pub template: String,
    /// Appended to the api/model class name to form the file name
    pub suffix: String,
}

impl TemplateAssignment {
    pub fn new(kind: ArtifactKind, template: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            kind,
            template: template.into(),
            suffix: suffix.into(),
        }
    }

    /// File name for a class (`PetApi` + `Controller.scala`)
    pub fn file_name(&self, classname: &str) -> String {
        format!("{}{}", classname, self.suffix)
    }
}

/// A project-level file rendered once per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupportingFile {
    pub template: String,
    /// Folder relative to the output root; empty for the root itself
    pub folder: String,
    pub destination: String,
    /// Renders the specification snapshot; dropped when no snapshot is available
    pub needs_snapshot: bool,
}

impl SupportingFile {
    pub fn new(
        template: impl Into<String>,
        folder: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            template: template.into(),
            folder: folder.into(),
            destination: destination.into(),
            needs_snapshot: false,
        }
    }

    pub fn with_snapshot(mut self) -> Self {
        self.needs_snapshot = true;
        self
    }

    /// Destination relative to the output root
    pub fn path(&self) -> String {
        if self.folder.is_empty() {
            self.destination.clone()
        } else {
            format!("{}/{}", self.folder.trim_end_matches('/'), self.destination)
        }
    }
}

/// Chooses templates from the resolved feature flags
pub trait TemplateSelectionPolicy: Send + Sync {
    /// Template for an artifact kind, or `None` when the kind is disabled
    fn select(&self, kind: ArtifactKind, options: &ResolvedOptions)
        -> Result<Option<TemplateAssignment>>;

    /// Project-level files for these options
    fn supporting_files(&self, options: &ResolvedOptions) -> Result<Vec<SupportingFile>>;
}
