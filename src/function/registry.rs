//! Name-to-factory registry consulted by the planner.

use super::{builtin, Function};
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;

/// Produces a fresh, uninitialized function instance
pub type FunctionFactory = Arc<dyn Fn() -> Box<dyn Function> + Send + Sync>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unsupported function: {0}")]
    NotFound(String),
}

/// Registry of scalar functions keyed by lowercase name.
///
/// Registration normally happens once during setup; lookups happen only while
/// planning. The map is concurrent so a registry can sit behind an `Arc` and
/// still accept registrations.
#[derive(Default)]
pub struct FunctionRegistry {
    factories: DashMap<String, FunctionFactory>,
}

impl FunctionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in functions
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        builtin::register_builtins(&registry);
        registry
    }

    /// Register a factory under `name`, replacing any previous entry
    pub fn register<F>(&self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn Function> + Send + Sync + 'static,
    {
        let key = name.to_lowercase();
        if self.factories.insert(key.clone(), Arc::new(factory)).is_some() {
            log::warn!("function {} re-registered, previous factory replaced", key);
        }
    }

    /// Instantiate the function registered under `name` (case-insensitive)
    pub fn resolve(&self, name: &str) -> Result<Box<dyn Function>, RegistryError> {
        let key = name.to_lowercase();
        // Clone the factory out so the shard lock is not held while it runs
        let factory = self
            .factories
            .get(&key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(RegistryError::NotFound(key))?;
        Ok(factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_lowercase())
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
