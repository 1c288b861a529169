//! Object builders
//!
//! A builder creates an empty, detached object of one kind in an
//! [`ObjectTree`]. Builders are registered per element name (or schema
//! type) in a [`Configuration`](crate::config::Configuration) together
//! with the matching marshaller and unmarshaller.

use crate::error::Result;
use crate::names::validate_ncname;
use crate::namespaces::QName;
use crate::object::{NodeId, ObjectTree};

/// Factory for empty objects
pub trait XmlObjectBuilder: Send + Sync {
    /// Build a detached object for `element_name`, optionally typed with `schema_type`
    fn build_object(
        &self,
        tree: &mut ObjectTree,
        element_name: QName,
        schema_type: Option<QName>,
    ) -> Result<NodeId>;

    /// Build from the parts of an element name
    fn build(
        &self,
        tree: &mut ObjectTree,
        namespace: Option<&str>,
        local_name: &str,
        prefix: Option<&str>,
    ) -> Result<NodeId> {
        let name = QName::new(namespace, local_name).with_prefix(prefix);
        self.build_object(tree, name, None)
    }
}

/// Check the local names and prefixes a builder is handed
pub fn validate_names(element_name: &QName, schema_type: Option<&QName>) -> Result<()> {
    for name in std::iter::once(element_name).chain(schema_type) {
        validate_ncname(&name.local_name)?;
        if let Some(prefix) = name.prefix.as_deref().filter(|p| !p.is_empty()) {
            validate_ncname(prefix)?;
        }
    }
    Ok(())
}
