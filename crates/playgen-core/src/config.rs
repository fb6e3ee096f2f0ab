//! Configuration management for playgen code generation.
//!
//! A `Config` describes one generation run. It can be built programmatically
//! or loaded from a YAML file; the CLI applies its flags on top.
//!
//! # Examples
//!
//! ```no_run
//! use playgen_core::config::Config;
//!
//! let mut config = Config::new("petstore", "petstore.yaml", "generated");
//! config
//!     .additional_properties
//!     .insert("useInterfaces".to_string(), "false".to_string());
//! assert_eq!(config.generator, "scala-play-framework");
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::fs;
use url::Url;

use crate::backend::scala_play;
use crate::options::OverridePolicy;

/// Configuration for a generation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Project name
    pub project_name: String,

    /// Path or URL of the API specification
    pub spec_path: String,

    /// Output directory for generated code
    pub output_dir: String,

    /// Registry name of the backend
    #[serde(default = "default_generator")]
    pub generator: String,

    /// Optional template override directory
    #[serde(default)]
    pub template_dir: Option<String>,

    /// Option overrides (`key: value`)
    #[serde(default)]
    pub additional_properties: IndexMap<String, String>,

    /// Reject overrides for undeclared options
    #[serde(default)]
    pub strict_options: bool,

    /// Treat any boolean override other than `true` as `false`
    #[serde(default)]
    pub lenient_booleans: bool,

    /// Server URL used when the specification doesn't carry one
    #[serde(default)]
    pub base_url: Option<Url>,
}

impl Config {
    /// Create a new Config with default values
    pub fn new(
        project_name: impl Into<String>,
        spec_path: impl Into<String>,
        output_dir: impl Into<String>,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            spec_path: spec_path.into(),
            output_dir: output_dir.into(),
            generator: default_generator(),
            template_dir: None,
            additional_properties: IndexMap::new(),
            strict_options: false,
            lenient_booleans: false,
            base_url: None,
        }
    }

    /// Load configuration from a file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// How option overrides are resolved for this run
    pub fn override_policy(&self) -> OverridePolicy {
        OverridePolicy {
            strict_booleans: !self.lenient_booleans,
            reject_unknown: self.strict_options,
        }
    }
}

fn default_generator() -> String {
    scala_play::NAME.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_config_roundtrip() -> crate::Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("config.yaml");

        let mut config = Config::new("petstore", "petstore.json", "output");
        config
            .additional_properties
            .insert("controllerOnly".to_string(), "true".to_string());
        config.base_url = Some(Url::parse("https://petstore.example.com/v2").unwrap());
        config.save(&file_path).await?;

        let loaded = Config::from_file(&file_path).await?;
        assert_eq!(loaded, config);
        assert_eq!(loaded.generator, "scala-play-framework");
        assert_eq!(
            loaded.additional_properties.get("controllerOnly").map(String::as_str),
            Some("true")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_minimal_file_uses_defaults() -> crate::Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("config.yaml");
        fs::write(
            &file_path,
            "project_name: zoo\nspec_path: zoo.yaml\noutput_dir: out\n",
        )
        .await?;

        let config = Config::from_file(&file_path).await?;
        assert_eq!(config.generator, "scala-play-framework");
        assert!(config.template_dir.is_none());
        assert!(config.additional_properties.is_empty());
        assert_eq!(config.override_policy(), OverridePolicy::default());
        Ok(())
    }

    #[test]
    fn test_override_policy() {
        let mut config = Config::new("p", "s", "o");
        config.strict_options = true;
        config.lenient_booleans = true;
        let policy = config.override_policy();
        assert!(policy.reject_unknown);
        assert!(!policy.strict_booleans);
    }
}
