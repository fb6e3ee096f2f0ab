//! Generator option declaration and resolution.
//!
//! A backend declares every option it understands in a [`GeneratorOptions`]
//! table. Overrides supplied by the user (`--additional-properties
//! key=value`) are resolved once against that table into an immutable
//! [`ResolvedOptions`] value which is then passed by reference to every
//! policy and rendered into every template context.
//!
//! # Example
//!
//! ```
//! use indexmap::IndexMap;
//! use playgen_core::options::{CliOption, GeneratorOptions, OverridePolicy};
//!
//! let mut options = GeneratorOptions::new();
//! options.declare(CliOption::boolean("useInterfaces", "Emit interfaces", true)).unwrap();
//! options.declare(CliOption::string("title", "Server title", "petstore")).unwrap();
//!
//! let mut overrides = IndexMap::new();
//! overrides.insert("useInterfaces".to_string(), "false".to_string());
//!
//! let resolved = options.resolve(&overrides, OverridePolicy::default()).unwrap();
//! assert!(!resolved.flag("useInterfaces").unwrap());
//! assert_eq!(resolved.string("title").unwrap(), "petstore");
//! ```

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::{Error, Result};

/// The value type of a declared option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Boolean,
    String,
}

impl OptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::String => "string",
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single option as surfaced to a host CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliOption {
    /// Option name as used in `key=value` overrides
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Compiled-in default, in its textual form
    pub default: String,
    /// Whether the option is a flag or a free-form string
    pub kind: OptionKind,
}

impl CliOption {
    pub fn boolean(name: impl Into<String>, description: impl Into<String>, default: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            default: default.to_string(),
            kind: OptionKind::Boolean,
        }
    }

    pub fn string(
        name: impl Into<String>,
        description: impl Into<String>,
        default: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            default: default.into(),
            kind: OptionKind::String,
        }
    }

    /// Parse a raw override for this option
    fn parse(&self, raw: &str, policy: OverridePolicy) -> Result<OptionValue> {
        match self.kind {
            OptionKind::String => Ok(OptionValue::Str(raw.to_string())),
            OptionKind::Boolean => match raw {
                "true" => Ok(OptionValue::Bool(true)),
                "false" => Ok(OptionValue::Bool(false)),
                _ if policy.strict_booleans => Err(Error::InvalidBoolean {
                    option: self.name.clone(),
                    value: raw.to_string(),
                }),
                _ => {
                    log::warn!(
                        "Treating value '{}' of boolean option '{}' as false",
                        raw,
                        self.name
                    );
                    Ok(OptionValue::Bool(false))
                }
            },
        }
    }

    fn default_value(&self) -> OptionValue {
        match self.kind {
            OptionKind::Boolean => OptionValue::Bool(self.default == "true"),
            OptionKind::String => OptionValue::Str(self.default.clone()),
        }
    }
}

/// How overrides that don't fit the declaration table are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverridePolicy {
    /// Reject boolean overrides other than exactly `true` / `false`.
    /// When off, anything but `true` resolves to `false`.
    pub strict_booleans: bool,
    /// Reject overrides naming an undeclared option instead of ignoring them
    pub reject_unknown: bool,
}

impl Default for OverridePolicy {
    fn default() -> Self {
        Self {
            strict_booleans: true,
            reject_unknown: false,
        }
    }
}

impl OverridePolicy {
    /// Legacy behavior: lenient booleans, unknown overrides ignored
    pub fn lenient() -> Self {
        Self {
            strict_booleans: false,
            reject_unknown: false,
        }
    }

    /// Every malformed or unknown override is an error
    pub fn strict() -> Self {
        Self {
            strict_booleans: true,
            reject_unknown: true,
        }
    }
}

/// Ordered table of declared generator options
#[derive(Debug, Clone, Default)]
pub struct GeneratorOptions {
    declared: IndexMap<String, CliOption>,
}

impl GeneratorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a new option. Names must be unique.
    pub fn declare(&mut self, option: CliOption) -> Result<()> {
        if option.kind == OptionKind::Boolean && !matches!(option.default.as_str(), "true" | "false")
        {
            return Err(Error::config(format!(
                "Boolean option '{}' has non-boolean default '{}'",
                option.name, option.default
            )));
        }
        if self.declared.contains_key(&option.name) {
            return Err(Error::config(format!(
                "Option '{}' is declared more than once",
                option.name
            )));
        }
        self.declared.insert(option.name.clone(), option);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&CliOption> {
        self.declared.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.declared.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.declared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    /// All declared options in declaration order
    pub fn cli_options(&self) -> impl Iterator<Item = &CliOption> {
        self.declared.values()
    }

    /// Resolve user overrides against the declarations.
    ///
    /// Every declared option ends up with a value: the parsed override when
    /// one was supplied, the compiled-in default otherwise.
    pub fn resolve(
        &self,
        overrides: &IndexMap<String, String>,
        policy: OverridePolicy,
    ) -> Result<ResolvedOptions> {
        for name in overrides.keys() {
            if !self.declared.contains_key(name) {
                if policy.reject_unknown {
                    return Err(Error::UnknownOption(name.clone()));
                }
                log::warn!("Ignoring override for undeclared option '{}'", name);
            }
        }

        let mut values = IndexMap::with_capacity(self.declared.len());
        for (name, option) in &self.declared {
            let value = match overrides.get(name) {
                Some(raw) => option.parse(raw, policy)?,
                None => option.default_value(),
            };
            log::debug!("Resolved option {} = {}", name, value);
            values.insert(name.clone(), value);
        }

        Ok(ResolvedOptions { values })
    }
}

/// A resolved option value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Str(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

/// Immutable result of option resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResolvedOptions {
    values: IndexMap<String, OptionValue>,
}

impl ResolvedOptions {
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Read a boolean option. Fails when the option was never declared.
    pub fn flag(&self, name: &str) -> Result<bool> {
        match self.values.get(name) {
            Some(OptionValue::Bool(b)) => Ok(*b),
            Some(OptionValue::Str(_)) => Err(Error::config(format!(
                "Option '{name}' is a string option, not a flag"
            ))),
            None => Err(Error::UnknownOption(name.to_string())),
        }
    }

    /// Read a string option. Fails when the option was never declared.
    pub fn string(&self, name: &str) -> Result<&str> {
        match self.values.get(name) {
            Some(OptionValue::Str(s)) => Ok(s),
            Some(OptionValue::Bool(_)) => Err(Error::config(format!(
                "Option '{name}' is a flag, not a string option"
            ))),
            None => Err(Error::UnknownOption(name.to_string())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OptionValue)> {
        self.values.iter()
    }

    /// Render the options as a JSON object for template contexts
    pub fn to_json(&self) -> JsonMap<String, JsonValue> {
        self.values
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    OptionValue::Bool(b) => JsonValue::Bool(*b),
                    OptionValue::Str(s) => JsonValue::String(s.clone()),
                };
                (k.clone(), value)
            })
            .collect()
    }
}

/// Parse a single `key=value` pair; the value is taken verbatim and may
/// contain commas (`-p title=Foo, Inc`).
pub fn parse_override(pair: &str) -> Result<(String, String)> {
    let (key, value) = pair
        .split_once('=')
        .ok_or_else(|| Error::config(format!("Expected key=value, got '{}'", pair.trim())))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::config(format!("Missing option name in '{}'", pair)));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Parse comma separated `key=value` lists (`--additional-properties a=1,b=2`)
pub fn parse_overrides<I, S>(items: I) -> Result<IndexMap<String, String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut overrides = IndexMap::new();
    for item in items {
        for pair in item.as_ref().split(',').filter(|p| !p.trim().is_empty()) {
            let (key, value) = parse_override(pair)?;
            overrides.insert(key, value);
        }
    }
    Ok(overrides)
}
