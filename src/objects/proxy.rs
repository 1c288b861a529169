//! Generic objects for elements without a dedicated type
//!
//! An element proxy keeps the element name, all attributes (in the attribute
//! map), and either text or child elements. It has no typed ID; IDs on a
//! proxy come from registered ID attributes. It is the usual default
//! provider.

use crate::builders::{validate_names, XmlObjectBuilder};
use crate::config::ObjectProviders;
use crate::error::Result;
use crate::marshalling::Marshaller;
use crate::namespaces::QName;
use crate::object::{NodeId, ObjectTree, XmlObject};
use crate::unmarshalling::Unmarshaller;

/// Generic element proxy type
pub struct ElementProxy;

impl ElementProxy {
    /// Providers for element proxies
    pub fn providers() -> ObjectProviders {
        ObjectProviders::new(
            ElementProxyBuilder,
            ElementProxyMarshaller,
            ElementProxyUnmarshaller,
        )
    }
}

/// Builds element proxies for any name
#[derive(Debug, Default, Clone, Copy)]
pub struct ElementProxyBuilder;

impl XmlObjectBuilder for ElementProxyBuilder {
    fn build_object(
        &self,
        tree: &mut ObjectTree,
        element_name: QName,
        schema_type: Option<QName>,
    ) -> Result<NodeId> {
        validate_names(&element_name, schema_type.as_ref())?;
        Ok(tree.insert(XmlObject::new(element_name).with_schema_type(schema_type)))
    }
}

/// Marshaller for element proxies
#[derive(Debug, Default, Clone, Copy)]
pub struct ElementProxyMarshaller;

impl Marshaller for ElementProxyMarshaller {}

/// Unmarshaller for element proxies
#[derive(Debug, Default, Clone, Copy)]
pub struct ElementProxyUnmarshaller;

impl Unmarshaller for ElementProxyUnmarshaller {}
