//! Motion-class registry.
//!
//! Group configurations name their motion class by string; the registry
//! maps the name to a factory that turns the group's JSON parameter object
//! into a law instance. The registry is an explicitly constructed value the
//! driver owns and passes down — never a process-wide singleton — so tests
//! and embedders can run clusters with different class sets side by side.

use crate::builtin::{OscillateLaw, StaticLaw, TranslateLaw};
use crate::error::RegistryError;
use crate::law::MotionLaw;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Factory producing a law instance from a group's parameter object.
pub type MotionFactory =
    Box<dyn Fn(&serde_json::Value) -> Result<Arc<dyn MotionLaw>, RegistryError> + Send + Sync>;

/// Name-keyed registry of motion classes.
pub struct MotionRegistry {
    factories: HashMap<String, MotionFactory>,
}

impl MotionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Creates a registry with the builtin classes registered:
    /// `static`, `translate`, and `oscillate`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("static", |_params| Ok(Arc::new(StaticLaw)));
        registry.register("translate", |params| {
            Ok(Arc::new(TranslateLaw::from_params(params)?))
        });
        registry.register("oscillate", |params| {
            Ok(Arc::new(OscillateLaw::from_params(params)?))
        });
        registry
    }

    /// Registers `factory` under `name`, replacing any previous registration.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&serde_json::Value) -> Result<Arc<dyn MotionLaw>, RegistryError>
            + Send
            + Sync
            + 'static,
    {
        debug!(class = name, "motion class registered");
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    /// Resolves `class` with `params` into a law instance.
    ///
    /// # Errors
    ///
    /// `RegistryError::UnknownClass` when no factory is registered under
    /// `class`; whatever the factory returns when the parameters are bad.
    pub fn create(
        &self,
        class: &str,
        params: &serde_json::Value,
    ) -> Result<Arc<dyn MotionLaw>, RegistryError> {
        let factory = self
            .factories
            .get(class)
            .ok_or_else(|| RegistryError::UnknownClass(class.to_string()))?;
        factory(params)
    }

    /// Names of every registered class, for diagnostics.
    pub fn class_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for MotionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
