//! Provider registry
//!
//! A [`Configuration`] maps element names and schema types to the
//! [`ObjectProviders`] (builder, marshaller, unmarshaller) responsible for
//! them, and records which attribute names are XML IDs. Registries are plain
//! values, so tests and embedders can build isolated ones; [`global`] holds
//! the process-wide instance.

mod catalog;
mod parsing;

pub use catalog::ComponentCatalog;
pub use parsing::{default_provider_name, CONFIG_NAMESPACE};

use crate::builders::XmlObjectBuilder;
use crate::documents::{Document, Element, ParseOptions};
use crate::error::{ConfigurationError, Error, Result};
use crate::limits::Limits;
use crate::loaders::Loader;
use crate::locations::Location;
use crate::marshalling::Marshaller;
use crate::namespaces::QName;
use crate::object::{NodeId, ObjectTree, XmlObject};
use crate::unmarshalling::Unmarshaller;
use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Builder, marshaller and unmarshaller for one kind of object
#[derive(Clone)]
pub struct ObjectProviders {
    /// Creates empty objects
    pub builder: Arc<dyn XmlObjectBuilder>,
    /// Object to DOM
    pub marshaller: Arc<dyn Marshaller>,
    /// DOM to object
    pub unmarshaller: Arc<dyn Unmarshaller>,
}

impl ObjectProviders {
    /// Bundle three providers
    pub fn new(
        builder: impl XmlObjectBuilder + 'static,
        marshaller: impl Marshaller + 'static,
        unmarshaller: impl Unmarshaller + 'static,
    ) -> Self {
        Self {
            builder: Arc::new(builder),
            marshaller: Arc::new(marshaller),
            unmarshaller: Arc::new(unmarshaller),
        }
    }
}

impl fmt::Debug for ObjectProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ObjectProviders { .. }")
    }
}

/// Registry of object providers and ID attribute names
#[derive(Clone)]
pub struct Configuration {
    providers: IndexMap<QName, ObjectProviders>,
    default_providers: Option<ObjectProviders>,
    id_attributes: IndexSet<QName>,
    catalog: ComponentCatalog,
    limits: Limits,
}

static GLOBAL: Lazy<RwLock<Configuration>> = Lazy::new(|| RwLock::new(Configuration::new()));

/// The process-wide configuration.
///
/// Lookups take the read lock; loading more configuration takes the write
/// lock, which keeps it from interleaving with running conversions.
pub fn global() -> &'static RwLock<Configuration> {
    &GLOBAL
}

impl Configuration {
    /// Configuration with the built-in object types registered and `xml:id`
    /// treated as an ID attribute
    pub fn new() -> Self {
        let mut config = Self::empty();
        config.register_id_attribute(QName::prefixed(crate::XML_NAMESPACE, "id", "xml"));
        crate::objects::register_builtin_providers(&mut config);
        config
    }

    /// Configuration with nothing registered; the catalog still knows the
    /// built-in components
    pub fn empty() -> Self {
        Self {
            providers: IndexMap::new(),
            default_providers: None,
            id_attributes: IndexSet::new(),
            catalog: ComponentCatalog::with_builtins(),
            limits: Limits::default(),
        }
    }

    /// Replace the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Limits applied when parsing and converting
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Components that configuration documents may name
    pub fn catalog(&self) -> &ComponentCatalog {
        &self.catalog
    }

    /// Mutable access to the component catalog
    pub fn catalog_mut(&mut self) -> &mut ComponentCatalog {
        &mut self.catalog
    }

    /// Register providers for an element name or schema type
    pub fn register_providers(&mut self, name: QName, providers: ObjectProviders) -> Option<ObjectProviders> {
        tracing::debug!(name = %name, "registering object providers");
        self.providers.insert(name, providers)
    }

    /// Remove the providers for `name`
    pub fn deregister_providers(&mut self, name: &QName) -> Option<ObjectProviders> {
        self.providers.shift_remove(name)
    }

    /// Providers registered for exactly `name`
    pub fn providers(&self, name: &QName) -> Option<&ObjectProviders> {
        self.providers.get(name)
    }

    /// Names with registered providers
    pub fn registered_names(&self) -> impl Iterator<Item = &QName> {
        self.providers.keys()
    }

    /// Builder registered for `name`
    pub fn builder(&self, name: &QName) -> Option<Arc<dyn XmlObjectBuilder>> {
        self.providers(name).map(|p| Arc::clone(&p.builder))
    }

    /// Marshaller registered for `name`
    pub fn marshaller(&self, name: &QName) -> Option<Arc<dyn Marshaller>> {
        self.providers(name).map(|p| Arc::clone(&p.marshaller))
    }

    /// Unmarshaller registered for `name`
    pub fn unmarshaller(&self, name: &QName) -> Option<Arc<dyn Unmarshaller>> {
        self.providers(name).map(|p| Arc::clone(&p.unmarshaller))
    }

    /// Set (or clear) the providers used when nothing more specific matches
    pub fn set_default_providers(&mut self, providers: Option<ObjectProviders>) {
        self.default_providers = providers;
    }

    /// Providers used when nothing more specific matches
    pub fn default_providers(&self) -> Option<&ObjectProviders> {
        self.default_providers.as_ref()
    }

    /// Providers for an element: by element name, then schema type, then the default
    pub fn providers_for(&self, element_name: &QName, schema_type: Option<&QName>) -> Result<&ObjectProviders> {
        if let Some(providers) = self.providers.get(element_name) {
            return Ok(providers);
        }
        if let Some(providers) = schema_type.and_then(|t| self.providers.get(t)) {
            tracing::debug!(element = %element_name, "using providers registered for xsi:type");
            return Ok(providers);
        }
        if let Some(providers) = &self.default_providers {
            tracing::debug!(element = %element_name, "using default providers");
            return Ok(providers);
        }

        let message = match schema_type {
            Some(t) => format!("no providers registered for element {} or type {}", element_name, t),
            None => format!("no providers registered for element {}", element_name),
        };
        Err(ConfigurationError::new(message).into())
    }

    /// Providers for an existing object
    pub fn providers_for_object(&self, object: &XmlObject) -> Result<&ObjectProviders> {
        self.providers_for(object.element_name(), object.schema_type())
    }

    /// Treat attributes named `name` as XML IDs
    pub fn register_id_attribute(&mut self, name: QName) {
        self.id_attributes.insert(name);
    }

    /// Stop treating attributes named `name` as XML IDs
    pub fn deregister_id_attribute(&mut self, name: &QName) -> bool {
        self.id_attributes.shift_remove(name)
    }

    /// Whether attributes named `name` are XML IDs
    pub fn is_id_attribute(&self, name: &QName) -> bool {
        self.id_attributes.contains(name)
    }

    /// Registered ID attribute names
    pub fn id_attributes(&self) -> impl Iterator<Item = &QName> {
        self.id_attributes.iter()
    }

    /// Parse options matching this configuration
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            limits: self.limits.clone(),
            id_attributes: self.id_attributes.clone(),
        }
    }

    /// Parse a document with this configuration's limits and ID attributes
    pub fn parse_document(&self, xml: &str) -> Result<Document> {
        Document::parse_with(xml, &self.parse_options())
    }

    /// Apply a configuration document.
    ///
    /// Either every entry is applied or, on error, none is.
    pub fn load(&mut self, document: &Document) -> Result<()> {
        let staged = parsing::parse_configuration(document, &self.catalog)?;

        let provider_count = staged.providers.len();
        for (name, providers) in staged.providers {
            self.register_providers(name, providers);
        }
        if let Some(providers) = staged.default_providers {
            self.set_default_providers(Some(providers));
        }
        for name in staged.id_attributes {
            self.register_id_attribute(name);
        }

        tracing::debug!(providers = provider_count, "configuration loaded");
        Ok(())
    }

    /// Read and apply a configuration document
    pub fn load_from(&mut self, loader: &Loader, location: &Location) -> Result<()> {
        let in_context = |err: Error| -> Error {
            match err {
                Error::Configuration(inner) if inner.location.is_none() => {
                    inner.with_location(location.to_string()).into()
                }
                Error::Configuration(inner) => inner.into(),
                other => ConfigurationError::new(other.to_string())
                    .with_location(location.to_string())
                    .into(),
            }
        };

        let document = loader
            .load_document(location, &ParseOptions::new().with_limits(loader.limits().clone()))
            .map_err(in_context)?;
        self.load(&document).map_err(in_context)
    }

    /// Unmarshall `element` into `tree`
    pub fn unmarshall(&self, tree: &mut ObjectTree, element: &Element) -> Result<NodeId> {
        crate::unmarshalling::unmarshall(self, tree, element)
    }

    /// Marshall `node` and its subtree
    pub fn marshall(&self, tree: &mut ObjectTree, node: NodeId) -> Result<Element> {
        crate::marshalling::marshall(self, tree, node)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.providers.keys().map(|k| k.to_string()).collect();
        f.debug_struct("Configuration")
            .field("providers", &names)
            .field("default_providers", &self.default_providers.is_some())
            .field("id_attributes", &self.id_attributes)
            .field("limits", &self.limits)
            .finish()
    }
}
