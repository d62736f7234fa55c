//! # Plugin Registry & Resolver
//!
//! Registro esplicito nome → factory, popolato all'avvio. Risolve la lista dei
//! plugin richiesti in una `TransformChain` prima di qualsiasi lavoro sui file.
//!
//! ## Regole di risoluzione:
//! - Lista vuota → plugin di default (gifsicle, jpegtran, optipng, svgo)
//! - Frammenti con lo stesso nome → un solo plugin con opzioni fuse
//! - Nome sconosciuto → errore fatale con suggerimento di rimedio
//! - Tool mancante per un plugin di default → plugin saltato con warning

use super::builtin;
use super::spec::{merge_specs, TransformSpec};
use super::{Transform, TransformChain};
use crate::error::{ImageminError, Result};
use crate::platform::ToolLocator;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Plugins used when none are requested
pub const DEFAULT_PLUGINS: [&str; 4] = ["gifsicle", "jpegtran", "optipng", "svgo"];

/// Builds a transform from a plugin request
pub type TransformFactory = Arc<dyn Fn(&TransformSpec) -> Result<Arc<dyn Transform>> + Send + Sync>;

/// Name → factory lookup
#[derive(Clone, Default)]
pub struct PluginRegistry {
    factories: HashMap<String, TransformFactory>,
}

impl PluginRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in backend, tools looked up from the environment
    pub fn with_builtins() -> Self {
        Self::with_builtins_from(ToolLocator::from_env())
    }

    pub fn with_builtins_from(locator: ToolLocator) -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry, locator);
        registry
    }

    /// Register (or replace) the factory for `name`
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&TransformSpec) -> Result<Arc<dyn Transform>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve requested plugins into a chain
    pub fn resolve(&self, requested: &[TransformSpec]) -> Result<TransformChain> {
        if requested.is_empty() {
            return self.resolve_defaults();
        }

        let merged = merge_specs(requested);
        if let Some(missing) = merged.iter().find(|spec| !self.contains(&spec.name)) {
            return Err(self.unknown(&missing.name));
        }

        let mut transforms = Vec::with_capacity(merged.len());
        for spec in &merged {
            let factory = self.factories.get(&spec.name).ok_or_else(|| self.unknown(&spec.name))?;
            debug!("Resolving plugin {} with options {:?}", spec.name, spec.options);
            transforms.push(factory(spec)?);
        }

        Ok(TransformChain::new(transforms))
    }

    fn resolve_defaults(&self) -> Result<TransformChain> {
        let mut transforms = Vec::new();

        for name in DEFAULT_PLUGINS {
            let Some(factory) = self.factories.get(name) else {
                debug!("Default plugin {} is not registered", name);
                continue;
            };

            match factory(&TransformSpec::new(name)) {
                Ok(transform) => transforms.push(transform),
                Err(ImageminError::MissingTool { tool, .. }) => {
                    warn!("Skipping default plugin {}: `{}` is not installed", name, tool);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(TransformChain::new(transforms))
    }

    fn unknown(&self, name: &str) -> ImageminError {
        ImageminError::UnknownPlugin {
            name: name.to_string(),
            remediation: format!(
                "Check the plugin name, or install the tool it wraps.\nAvailable plugins: {}",
                self.names().join(", ")
            ),
        }
    }
}
