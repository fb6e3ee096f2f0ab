//! Naming conventions for generated identifiers.
//!
//! [`NamingContext`] carries the package layout and the reserved-word set of
//! the target language. A [`NamingPolicy`] turns raw names from the API
//! description (model names, property names, parameter names, tags) into
//! identifiers that are safe to emit.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::utils::{camelize, camelize_lower, package_path, sanitize_name};

/// Package names and reserved words for a backend
#[derive(Debug, Clone, Default, Serialize)]
pub struct NamingContext {
    pub api_package: String,
    pub model_package: String,
    pub invoker_package: String,
    pub config_package: String,
    pub base_package: String,
    /// Folder prepended to every api/model output path
    pub source_folder: String,
    /// Lower-cased reserved words
    #[serde(skip)]
    reserved_words: BTreeSet<String>,
    /// Types that never need an import
    #[serde(skip)]
    default_includes: BTreeSet<String>,
}

impl NamingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the reserved-word set; words are stored lower-cased
    pub fn with_reserved_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.reserved_words = words
            .into_iter()
            .map(|w| w.as_ref().to_lowercase())
            .collect();
        self
    }

    pub fn with_default_includes<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_includes = types.into_iter().map(Into::into).collect();
        self
    }

    /// Case-insensitive reserved-word lookup
    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved_words.contains(&name.to_lowercase())
    }

    pub fn reserved_words(&self) -> impl Iterator<Item = &str> {
        self.reserved_words.iter().map(String::as_str)
    }

    pub fn is_default_include(&self, type_name: &str) -> bool {
        self.default_includes.contains(type_name)
    }

    /// Relative folder for API files, e.g. `app/controllers`
    pub fn api_folder(&self) -> String {
        join_folder(&self.source_folder, &package_path(&self.api_package))
    }

    /// Relative folder for model files, e.g. `app/apimodels`
    pub fn model_folder(&self) -> String {
        join_folder(&self.source_folder, &package_path(&self.model_package))
    }
}

fn join_folder(base: &str, rest: &str) -> String {
    match (base.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{}/{}", base.trim_end_matches('/'), rest),
    }
}

/// Turns raw names into target-safe identifiers.
///
/// Only [`NamingPolicy::escape_reserved_word`] is language specific; the other
/// methods have defaults that apply the target casing and escape any result
/// that collides with a reserved word.
pub trait NamingPolicy: Send + Sync {
    /// Escape an identifier that collides with a reserved word.
    /// Must never return `name` unchanged.
    fn escape_reserved_word(&self, name: &str) -> String;

    /// Type name for a model (`pet_category` -> `PetCategory`)
    fn model_name(&self, ctx: &NamingContext, name: &str) -> String {
        let camelized = camelize(&sanitize_name(name));
        let camelized = if camelized.is_empty() {
            "Model".to_string()
        } else {
            camelized
        };
        if ctx.is_reserved(&camelized) || starts_with_digit(&camelized) {
            format!("Model{camelized}")
        } else {
            camelized
        }
    }

    /// File stem for a model
    fn model_filename(&self, ctx: &NamingContext, name: &str) -> String {
        self.model_name(ctx, name)
    }

    /// Variable/field name
    fn var_name(&self, ctx: &NamingContext, name: &str) -> String {
        let var = camelize_lower(&sanitize_name(name));
        let var = if var.is_empty() { "value".to_string() } else { var };
        if ctx.is_reserved(&var) {
            self.escape_reserved_word(&var)
        } else if starts_with_digit(&var) {
            format!("_{var}")
        } else {
            var
        }
    }

    /// Parameter name; same rules as variables unless overridden
    fn param_name(&self, ctx: &NamingContext, name: &str) -> String {
        self.var_name(ctx, name)
    }

    /// Class name of an API grouping (`pet` -> `PetApi`)
    fn api_name(&self, _ctx: &NamingContext, tag: &str) -> String {
        let base = camelize(&sanitize_name(tag));
        if base.is_empty() {
            "DefaultApi".to_string()
        } else if starts_with_digit(&base) {
            format!("_{base}Api")
        } else {
            format!("{base}Api")
        }
    }

    /// Method name of an operation
    fn operation_id(&self, ctx: &NamingContext, operation_id: &str) -> String {
        let id = camelize_lower(&sanitize_name(operation_id));
        if ctx.is_reserved(&id) || starts_with_digit(&id) {
            format!("call{}", camelize(&id))
        } else {
            id
        }
    }
}

/// Identifiers can't start with a digit once casing is applied
fn starts_with_digit(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_digit())
}
