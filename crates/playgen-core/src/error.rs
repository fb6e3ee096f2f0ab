//! Error handling for the playgen code generation library.
//!
//! This module defines the main error type `Error` used throughout the library,
//! along with a convenient `Result` type alias. It uses `thiserror` for easy
//! error handling and implements conversions from common error types.
//!
//! Configuration problems (bad option overrides, broken type mappings) are
//! reported before any file is emitted. Template and emission problems abort
//! the run.
//!
//! # Examples
//!
//! ```
//! use playgen_core::error::{Error, Result};
//!
//! fn might_fail(flag: &str) -> Result<()> {
//!     if flag != "true" && flag != "false" {
//!         return Err(Error::InvalidBoolean {
//!             option: "useInterfaces".into(),
//!             value: flag.into(),
//!         });
//!     }
//!     Ok(())
//! }
//!
//! assert!(might_fail("yes").is_err());
//! ```

use thiserror::Error;

/// Result type for playgen generation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for playgen generation operations
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// OpenAPI error
    #[error("OpenAPI error: {0}")]
    OpenApi(String),

    /// Template error
    #[error("Template error: {0}")]
    Template(String),

    /// Template engine error
    #[error("Template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// An option that the generator never declared
    #[error("Unknown generator option: {0}")]
    UnknownOption(String),

    /// A boolean option override that is neither `true` nor `false`
    #[error("Invalid boolean value '{value}' for option '{option}' (expected 'true' or 'false')")]
    InvalidBoolean { option: String, value: String },

    /// No generator registered under the requested name
    #[error("Unknown generator: {0}")]
    UnknownGenerator(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new OpenAPI error
    pub fn openapi<S: Into<String>>(msg: S) -> Self {
        Self::OpenApi(msg.into())
    }

    /// Create a new template error
    pub fn template<S: Into<String>>(msg: S) -> Self {
        Self::Template(msg.into())
    }

    /// Whether the error was raised while validating generator setup
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::UnknownOption(_)
                | Self::InvalidBoolean { .. }
                | Self::UnknownGenerator(_)
        )
    }
}
