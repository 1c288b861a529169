//! Built-in object types

pub mod proxy;
pub mod simple;

pub use proxy::{ElementProxy, ElementProxyBuilder, ElementProxyMarshaller, ElementProxyUnmarshaller};
pub use simple::{
    SimpleXmlObject, SimpleXmlObjectBuilder, SimpleXmlObjectMarshaller, SimpleXmlObjectUnmarshaller,
};

use crate::config::{ComponentCatalog, Configuration};
use std::sync::Arc;

/// Catalog name of [`SimpleXmlObjectBuilder`]
pub const SIMPLE_BUILDER: &str = "SimpleXmlObjectBuilder";
/// Catalog name of [`SimpleXmlObjectMarshaller`]
pub const SIMPLE_MARSHALLER: &str = "SimpleXmlObjectMarshaller";
/// Catalog name of [`SimpleXmlObjectUnmarshaller`]
pub const SIMPLE_UNMARSHALLER: &str = "SimpleXmlObjectUnmarshaller";
/// Catalog name of [`ElementProxyBuilder`]
pub const PROXY_BUILDER: &str = "ElementProxyBuilder";
/// Catalog name of [`ElementProxyMarshaller`]
pub const PROXY_MARSHALLER: &str = "ElementProxyMarshaller";
/// Catalog name of [`ElementProxyUnmarshaller`]
pub const PROXY_UNMARSHALLER: &str = "ElementProxyUnmarshaller";

/// Make the built-in components available to configuration documents
pub fn register_components(catalog: &mut ComponentCatalog) {
    catalog.register_builder(SIMPLE_BUILDER, Arc::new(SimpleXmlObjectBuilder));
    catalog.register_marshaller(SIMPLE_MARSHALLER, Arc::new(SimpleXmlObjectMarshaller));
    catalog.register_unmarshaller(SIMPLE_UNMARSHALLER, Arc::new(SimpleXmlObjectUnmarshaller));
    catalog.register_builder(PROXY_BUILDER, Arc::new(ElementProxyBuilder));
    catalog.register_marshaller(PROXY_MARSHALLER, Arc::new(ElementProxyMarshaller));
    catalog.register_unmarshaller(PROXY_UNMARSHALLER, Arc::new(ElementProxyUnmarshaller));
}

/// Register providers for the built-in typed objects (by element name and schema type)
pub fn register_builtin_providers(config: &mut Configuration) {
    let providers = SimpleXmlObject::providers();
    config.register_providers(SimpleXmlObject::element_name(), providers.clone());
    config.register_providers(SimpleXmlObject::type_name(), providers);
}
