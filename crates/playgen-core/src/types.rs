//! Type mapping between normalized source types and target-language types.
//!
//! The loader normalizes every schema to a source type name (`string`,
//! `long`, `date`, `DateTime`, `file`, a model name, ...). A [`TypeMapping`]
//! turns that into the target type and knows which import defines it.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::options::ResolvedOptions;

/// Source type names produced by schema normalization
pub mod source {
    pub const STRING: &str = "string";
    pub const BOOLEAN: &str = "boolean";
    pub const INTEGER: &str = "integer";
    pub const LONG: &str = "long";
    pub const FLOAT: &str = "float";
    pub const DOUBLE: &str = "double";
    pub const NUMBER: &str = "number";
    pub const DATE: &str = "date";
    pub const DATE_TIME: &str = "DateTime";
    pub const FILE: &str = "file";
    pub const BINARY: &str = "binary";
    pub const BYTE_ARRAY: &str = "ByteArray";
    pub const UUID: &str = "UUID";
    pub const OBJECT: &str = "object";
}

/// Source type -> target type, plus target type -> import path
#[derive(Debug, Clone, Default)]
pub struct TypeMapping {
    types: IndexMap<String, String>,
    imports: IndexMap<String, String>,
    primitives: BTreeSet<String>,
}

impl TypeMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(&mut self, source: impl Into<String>, target: impl Into<String>) -> &mut Self {
        self.types.insert(source.into(), target.into());
        self
    }

    pub fn import(&mut self, target: impl Into<String>, path: impl Into<String>) -> &mut Self {
        self.imports.insert(target.into(), path.into());
        self
    }

    pub fn remove_import(&mut self, target: &str) -> Option<String> {
        self.imports.shift_remove(target)
    }

    /// Declare target types that never need an import
    pub fn primitives<I, S>(&mut self, types: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primitives.extend(types.into_iter().map(Into::into));
        self
    }

    /// Target type for a source type; unmapped names are taken as target-native
    pub fn map_type(&self, source: &str) -> String {
        self.types
            .get(source)
            .cloned()
            .unwrap_or_else(|| source.to_string())
    }

    pub fn import_for(&self, target: &str) -> Option<&str> {
        self.imports.get(target).map(String::as_str)
    }

    pub fn is_primitive(&self, target: &str) -> bool {
        self.primitives.contains(target)
    }

    /// Every mapped, non-primitive target type must have an import
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<String> = self
            .types
            .iter()
            .filter(|(_, target)| !self.is_primitive(target) && !self.imports.contains_key(*target))
            .map(|(source, target)| format!("{source} -> {target}"))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::config(format!(
                "Mapped types without an import: {}",
                missing.join(", ")
            )))
        }
    }
}

/// Builds the final [`TypeMapping`] for a set of resolved options
pub trait TypeMappingPolicy: Send + Sync {
    fn type_mapping(&self, options: &ResolvedOptions) -> Result<TypeMapping>;

    /// Wrap an element type in the target list container
    fn list_of(&self, inner: &str) -> String;

    /// Wrap a value type in the target string-keyed map container
    fn map_of(&self, inner: &str) -> String;
}
