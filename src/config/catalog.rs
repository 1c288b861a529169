//! Component catalog
//!
//! Configuration documents name builders, marshallers and unmarshallers by
//! class name. The catalog maps those names to shared instances.

use crate::builders::XmlObjectBuilder;
use crate::error::{ConfigurationError, Result};
use crate::marshalling::Marshaller;
use crate::unmarshalling::Unmarshaller;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Named component instances available to configuration documents
#[derive(Clone, Default)]
pub struct ComponentCatalog {
    builders: HashMap<String, Arc<dyn XmlObjectBuilder>>,
    marshallers: HashMap<String, Arc<dyn Marshaller>>,
    unmarshallers: HashMap<String, Arc<dyn Unmarshaller>>,
}

impl ComponentCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding the built-in object types
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        crate::objects::register_components(&mut catalog);
        catalog
    }

    /// Register a builder under `name`
    pub fn register_builder(&mut self, name: impl Into<String>, builder: Arc<dyn XmlObjectBuilder>) {
        self.builders.insert(name.into(), builder);
    }

    /// Register a marshaller under `name`
    pub fn register_marshaller(&mut self, name: impl Into<String>, marshaller: Arc<dyn Marshaller>) {
        self.marshallers.insert(name.into(), marshaller);
    }

    /// Register an unmarshaller under `name`
    pub fn register_unmarshaller(
        &mut self,
        name: impl Into<String>,
        unmarshaller: Arc<dyn Unmarshaller>,
    ) {
        self.unmarshallers.insert(name.into(), unmarshaller);
    }

    /// Builder registered as `name`
    pub fn builder(&self, name: &str) -> Result<Arc<dyn XmlObjectBuilder>> {
        self.builders
            .get(name)
            .cloned()
            .ok_or_else(|| unknown_class("builder", name))
    }

    /// Marshaller registered as `name`
    pub fn marshaller(&self, name: &str) -> Result<Arc<dyn Marshaller>> {
        self.marshallers
            .get(name)
            .cloned()
            .ok_or_else(|| unknown_class("marshaller", name))
    }

    /// Unmarshaller registered as `name`
    pub fn unmarshaller(&self, name: &str) -> Result<Arc<dyn Unmarshaller>> {
        self.unmarshallers
            .get(name)
            .cloned()
            .ok_or_else(|| unknown_class("unmarshaller", name))
    }
}

fn unknown_class(kind: &str, name: &str) -> crate::error::Error {
    ConfigurationError::new(format!("{} class '{}' cannot be instantiated", kind, name)).into()
}

fn sorted_names<V>(map: &HashMap<String, V>) -> Vec<&str> {
    let mut names: Vec<&str> = map.keys().map(|k| k.as_str()).collect();
    names.sort_unstable();
    names
}

impl fmt::Debug for ComponentCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentCatalog")
            .field("builders", &sorted_names(&self.builders))
            .field("marshallers", &sorted_names(&self.marshallers))
            .field("unmarshallers", &sorted_names(&self.unmarshallers))
            .finish()
    }
}
