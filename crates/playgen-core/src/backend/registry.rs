//! Lookup of backends by name

use indexmap::IndexMap;

use crate::error::{Error, Result};

use super::{scala_play, Backend};

/// Builds a fresh backend
pub type BackendFactory = fn() -> Result<Backend>;

/// Backends available to a host, keyed by registry name
#[derive(Debug, Clone, Default)]
pub struct GeneratorRegistry {
    factories: IndexMap<&'static str, BackendFactory>,
}

impl GeneratorRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every backend shipped with this crate
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(scala_play::NAME, scala_play::backend);
        registry
    }

    /// Register a factory; a later registration under the same name wins
    pub fn register(&mut self, name: &'static str, factory: BackendFactory) {
        if self.factories.insert(name, factory).is_some() {
            log::warn!("Generator '{}' registered more than once", name);
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build the backend registered under `name`
    pub fn create(&self, name: &str) -> Result<Backend> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::UnknownGenerator(name.to_string()))?;
        factory()
    }

    /// Build every registered backend, in registration order
    pub fn backends(&self) -> Result<Vec<Backend>> {
        self.factories.values().map(|factory| factory()).collect()
    }
}
