//! `SimpleElement`: a small object type with a typed `Id` attribute,
//! text content and any number of `SimpleElement` children

use crate::builders::{validate_names, XmlObjectBuilder};
use crate::config::ObjectProviders;
use crate::error::Result;
use crate::marshalling::Marshaller;
use crate::namespaces::QName;
use crate::object::{IndexKey, NodeId, ObjectTree, XmlObject};
use crate::unmarshalling::Unmarshaller;

/// Namespace of the simple object type
pub const NAMESPACE: &str = "http://www.example.org/testObjects";

/// Preferred prefix for [`NAMESPACE`]
pub const NAMESPACE_PREFIX: &str = "test";

/// Names of the simple object type
pub struct SimpleXmlObject;

impl SimpleXmlObject {
    /// Element local name
    pub const LOCAL_NAME: &'static str = "SimpleElement";

    /// Schema type local name
    pub const TYPE_LOCAL_NAME: &'static str = "SimpleElementType";

    /// ID attribute local name
    pub const ID_ATTRIB_NAME: &'static str = "Id";

    /// Element name
    pub fn element_name() -> QName {
        QName::prefixed(NAMESPACE, Self::LOCAL_NAME, NAMESPACE_PREFIX)
    }

    /// Schema type name
    pub fn type_name() -> QName {
        QName::prefixed(NAMESPACE, Self::TYPE_LOCAL_NAME, NAMESPACE_PREFIX)
    }

    /// Name of the typed ID attribute
    pub fn id_attribute_name() -> QName {
        QName::local(Self::ID_ATTRIB_NAME)
    }

    /// Key of the `SimpleElement` children of an object
    pub fn children_key() -> IndexKey {
        IndexKey::Element(Self::element_name())
    }

    /// Providers for this type
    pub fn providers() -> ObjectProviders {
        ObjectProviders::new(
            SimpleXmlObjectBuilder,
            SimpleXmlObjectMarshaller,
            SimpleXmlObjectUnmarshaller,
        )
    }
}

/// Builds `SimpleElement` objects
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleXmlObjectBuilder;

impl SimpleXmlObjectBuilder {
    /// Build an object with the default element name
    pub fn build_default(&self, tree: &mut ObjectTree) -> Result<NodeId> {
        self.build_object(tree, SimpleXmlObject::element_name(), None)
    }
}

impl XmlObjectBuilder for SimpleXmlObjectBuilder {
    fn build_object(
        &self,
        tree: &mut ObjectTree,
        element_name: QName,
        schema_type: Option<QName>,
    ) -> Result<NodeId> {
        validate_names(&element_name, schema_type.as_ref())?;
        let object = XmlObject::new(element_name)
            .with_schema_type(schema_type)
            .with_id_attribute(SimpleXmlObject::id_attribute_name());
        Ok(tree.insert(object))
    }
}

/// Marshaller for `SimpleElement`; the default hooks cover it
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleXmlObjectMarshaller;

impl Marshaller for SimpleXmlObjectMarshaller {}

/// Unmarshaller for `SimpleElement`; the default hooks cover it
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleXmlObjectUnmarshaller;

impl Unmarshaller for SimpleXmlObjectUnmarshaller {}
