//! Marshalling: object trees to DOM
//!
//! The driver ([`marshall`]) walks an object tree, picks a [`Marshaller`]
//! for each object from the [`Configuration`], and assembles the resulting
//! [`Element`]s. Each object's element is cached; an object whose cache is
//! still fresh is not walked again.
//!
//! Type-specific behavior plugs into the three [`Marshaller`] hooks. The
//! default hook bodies are also exported as free functions so an override
//! can extend rather than replace them.

use crate::config::Configuration;
use crate::documents::{Attribute, Document, Element};
use crate::error::{Error, Result};
use crate::namespaces::{Namespace, QName};
use crate::object::{NodeId, ObjectTree};
use std::sync::Arc;

/// Prefix used for an `xsi:type` value when no better one is known
const TYPE_PREFIX: &str = "xt";

/// Per-type marshalling hooks
pub trait Marshaller: Send + Sync {
    /// Write the object's attributes onto `element`
    fn marshall_attributes(
        &self,
        tree: &ObjectTree,
        node: NodeId,
        element: &mut Element,
    ) -> Result<()> {
        marshall_attributes(tree, node, element)
    }

    /// Write the object's simple content onto `element`
    fn marshall_element_content(
        &self,
        tree: &ObjectTree,
        node: NodeId,
        element: &mut Element,
    ) -> Result<()> {
        marshall_text(tree, node, element)
    }

    /// Runs once the element is complete, children included
    fn post_marshall(&self, _tree: &ObjectTree, _node: NodeId, _element: &mut Element) -> Result<()> {
        Ok(())
    }
}

/// Write the typed ID and every attribute of the object's [`AttributeMap`](crate::object::AttributeMap)
pub fn marshall_attributes(tree: &ObjectTree, node: NodeId, element: &mut Element) -> Result<()> {
    let object = tree.get(node)?;

    if let (Some(name), Some(id)) = (object.id_attribute(), object.id()) {
        element.set_attribute(Attribute::id(name.clone(), id));
    }

    let attributes = object.attributes();
    for (name, value) in attributes.iter() {
        element.set_attribute(Attribute {
            name: name.clone(),
            value: value.to_string(),
            is_id: attributes.is_id_attribute(name),
        });
    }
    Ok(())
}

/// Write the object's text, if any
pub fn marshall_text(tree: &ObjectTree, node: NodeId, element: &mut Element) -> Result<()> {
    if let Some(text) = tree.get(node)?.text() {
        element.push_text(text);
    }
    Ok(())
}

/// External signature service invoked after an element is built
pub trait ElementSigner: Send + Sync {
    /// Sign `element` in place
    fn sign(&self, element: &mut Element) -> Result<()>;
}

/// Marshaller that signs what another marshaller produces
pub struct SigningMarshaller {
    inner: Arc<dyn Marshaller>,
    signer: Arc<dyn ElementSigner>,
}

impl SigningMarshaller {
    /// Wrap `inner` so its output is passed through `signer`
    pub fn new(inner: Arc<dyn Marshaller>, signer: Arc<dyn ElementSigner>) -> Self {
        Self { inner, signer }
    }
}

impl Marshaller for SigningMarshaller {
    fn marshall_attributes(
        &self,
        tree: &ObjectTree,
        node: NodeId,
        element: &mut Element,
    ) -> Result<()> {
        self.inner.marshall_attributes(tree, node, element)
    }

    fn marshall_element_content(
        &self,
        tree: &ObjectTree,
        node: NodeId,
        element: &mut Element,
    ) -> Result<()> {
        self.inner.marshall_element_content(tree, node, element)
    }

    fn post_marshall(&self, tree: &ObjectTree, node: NodeId, element: &mut Element) -> Result<()> {
        self.inner.post_marshall(tree, node, element)?;
        self.signer.sign(element).map_err(|e| {
            Error::Marshalling(format!("unable to sign {}: {}", element.qname(), e))
        })
    }
}

/// Marshall `node` and its subtree
pub fn marshall(config: &Configuration, tree: &mut ObjectTree, node: NodeId) -> Result<Element> {
    marshall_at(config, tree, node, 1)
}

/// Marshall `node` as the root of a new document
pub fn marshall_document(
    config: &Configuration,
    tree: &mut ObjectTree,
    node: NodeId,
) -> Result<Document> {
    Ok(Document::with_root(marshall(config, tree, node)?))
}

/// Marshall `node` and append the result to `parent`
pub fn marshall_into(
    config: &Configuration,
    tree: &mut ObjectTree,
    node: NodeId,
    parent: &mut Element,
) -> Result<()> {
    let element = marshall(config, tree, node)?;
    parent.append_child(element);
    Ok(())
}

fn marshall_at(
    config: &Configuration,
    tree: &mut ObjectTree,
    node: NodeId,
    depth: usize,
) -> Result<Element> {
    config.limits().check_depth(depth)?;

    if let Some(cached) = tree.dom_cache(node)?.element() {
        tracing::trace!(node = %node, "reusing cached DOM");
        return Ok(cached.clone());
    }

    let object = tree.get(node)?;
    let marshaller = Arc::clone(&config.providers_for_object(object)?.marshaller);

    let mut element = Element::new(object.element_name().clone());
    for namespace in object.namespaces() {
        element.declare_namespace(namespace.clone());
    }
    if let Some(schema_type) = object.schema_type() {
        write_schema_type(&mut element, schema_type);
    }

    marshaller.marshall_attributes(tree, node, &mut element)?;
    marshaller.marshall_element_content(tree, node, &mut element)?;

    let children: Vec<NodeId> = tree.children(node)?.iter().collect();
    for child in children {
        let child_element = marshall_at(config, tree, child, depth + 1)?;
        element.append_child(child_element);
    }

    marshaller.post_marshall(tree, node, &mut element)?;

    tree.cache_dom(node, element.clone())?;
    tracing::trace!(node = %node, element = %element.qname(), "marshalled and cached");
    Ok(element)
}

/// The `xsi:type` attribute name
pub fn xsi_type_name() -> QName {
    QName::prefixed(crate::XSI_NAMESPACE, "type", "xsi")
}

fn write_schema_type(element: &mut Element, schema_type: &QName) {
    let value = match schema_type.namespace() {
        None => schema_type.local_name.clone(),
        Some(namespace) => {
            let prefix = type_prefix(element, schema_type, namespace);
            element.declare_namespace(Namespace::new(Some(prefix.clone()), namespace));
            format!("{}:{}", prefix, schema_type.local_name)
        }
    };
    element.set_attribute(Attribute::new(xsi_type_name(), value));
}

/// A prefix for `namespace` that does not rebind one the element already uses
fn type_prefix(element: &Element, schema_type: &QName, namespace: &str) -> String {
    let conflicts = |prefix: &str| {
        let element_prefix = element.qname().prefix.as_deref() == Some(prefix)
            && element.namespace() != Some(namespace);
        let declared = element
            .namespaces()
            .iter()
            .any(|ns| ns.prefix.as_deref() == Some(prefix) && ns.uri != namespace);
        element_prefix || declared
    };

    let element_prefix = element
        .qname()
        .prefix
        .as_deref()
        .filter(|_| element.namespace() == Some(namespace));
    let preferred = schema_type
        .prefix
        .as_deref()
        .or(element_prefix)
        .filter(|p| !p.is_empty() && !conflicts(*p));
    if let Some(prefix) = preferred {
        return prefix.to_string();
    }

    let mut candidate = TYPE_PREFIX.to_string();
    let mut counter = 0;
    while conflicts(&candidate) {
        counter += 1;
        candidate = format!("{}{}", TYPE_PREFIX, counter);
    }
    candidate
}
