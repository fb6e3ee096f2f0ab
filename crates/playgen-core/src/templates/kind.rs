//! Logical artifact kinds a backend can emit.
//!
//! # Examples
//!
//! ```
//! use playgen_core::templates::ArtifactKind;
//! use std::str::FromStr;
//!
//! let kind = ArtifactKind::from_str("controller_interface").unwrap();
//! assert_eq!(kind, ArtifactKind::ControllerInterface);
//! assert_eq!(kind.to_string(), "controller_interface");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// One kind of generated file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// One file per model definition
    Model,
    /// Routing controller per API
    Controller,
    /// Implementation stub per API
    ControllerImpl,
    /// Interface stub per API
    ControllerInterface,
    /// Project-level file rendered once per run
    Supporting,
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "model" => Ok(Self::Model),
            "controller" => Ok(Self::Controller),
            "controller_impl" => Ok(Self::ControllerImpl),
            "controller_interface" => Ok(Self::ControllerInterface),
            "supporting" => Ok(Self::Supporting),
            _ => Err(format!("Unknown artifact kind: {}", s)),
        }
    }
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Controller => "controller",
            Self::ControllerImpl => "controller_impl",
            Self::ControllerInterface => "controller_interface",
            Self::Supporting => "supporting",
        }
    }

    /// Kinds rendered once per API grouping
    pub fn per_api() -> impl Iterator<Item = Self> {
        [
            Self::Controller,
            Self::ControllerImpl,
            Self::ControllerInterface,
        ]
        .into_iter()
    }

    pub fn all() -> impl Iterator<Item = Self> {
        use ArtifactKind::*;
        [Model, Controller, ControllerImpl, ControllerInterface, Supporting].into_iter()
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
