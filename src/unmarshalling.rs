//! Unmarshalling: DOM to object trees
//!
//! [`unmarshall`] selects providers for each element by element name, then
//! by `xsi:type`, then the configured default. The chosen builder creates an
//! empty object and the [`Unmarshaller`] hooks fill it in: one call per
//! attribute, one per child (after the child has been unmarshalled itself),
//! and one for non-blank text content. Mixed content (non-blank text next
//! to child elements) is rejected.
//!
//! A failed unmarshall leaves nothing behind: the partially built subtree is
//! released from the arena.

use crate::config::{Configuration, ObjectProviders};
use crate::documents::{Attribute, Content, Element};
use crate::error::{Error, Result, UnmarshallingError};
use crate::marshalling::xsi_type_name;
use crate::namespaces::{Namespace, NamespaceContext, QName};
use crate::object::{NodeId, ObjectTree};

/// Per-type unmarshalling hooks
pub trait Unmarshaller: Send + Sync {
    /// Store one attribute of the source element
    fn process_attribute(&self, tree: &mut ObjectTree, node: NodeId, attribute: &Attribute) -> Result<()> {
        unmarshall_attribute(tree, node, attribute)
    }

    /// Store an unmarshalled child object
    fn process_child_element(&self, tree: &mut ObjectTree, parent: NodeId, child: NodeId) -> Result<()> {
        tree.children_mut(parent)?.add(child)
    }

    /// Store the (non-blank) text content of the source element
    fn process_element_content(&self, tree: &mut ObjectTree, node: NodeId, content: &str) -> Result<()> {
        tree.set_text(node, Some(content))
    }
}

/// Store `attribute` in the typed ID field when it is the object's ID
/// attribute, and in the attribute map otherwise
pub fn unmarshall_attribute(tree: &mut ObjectTree, node: NodeId, attribute: &Attribute) -> Result<()> {
    if tree.get(node)?.id_attribute() == Some(&attribute.name) {
        return tree.set_id(node, Some(&attribute.value));
    }

    let mut attributes = tree.attributes_mut(node)?;
    if attribute.is_id {
        attributes.register_id(attribute.name.clone())?;
    }
    attributes.put(attribute.name.clone(), attribute.value.clone())?;
    Ok(())
}

/// Unmarshall `element` into a new detached subtree of `tree`
pub fn unmarshall(config: &Configuration, tree: &mut ObjectTree, element: &Element) -> Result<NodeId> {
    let node = unmarshall_at(config, tree, element, &NamespaceContext::new(), "", 1)?;
    tracing::debug!(node = %node, element = %element.qname(), "unmarshalled");
    Ok(node)
}

fn unmarshall_at(
    config: &Configuration,
    tree: &mut ObjectTree,
    element: &Element,
    parent_scope: &NamespaceContext,
    parent_path: &str,
    depth: usize,
) -> Result<NodeId> {
    let limits = config.limits();
    limits.check_depth(depth)?;
    limits.check_attributes(element.attribute_count())?;

    let path = format!("{}/{}", parent_path, element.qname().prefixed_name());
    let scope = parent_scope.with_declarations(element.namespaces());
    let schema_type = schema_type_of(element, &scope).map_err(|e| at_path(e, &path))?;

    let providers = config.providers_for(element.qname(), schema_type.as_ref())?;
    let node = providers
        .builder
        .build_object(tree, element.qname().clone(), schema_type)?;

    if let Err(err) = populate(config, tree, node, element, providers, &scope, &path, depth) {
        if let Err(release_err) = tree.release(node) {
            tracing::warn!(node = %node, error = %release_err, "could not release partial object");
        }
        return Err(at_path(err, &path));
    }
    Ok(node)
}

#[allow(clippy::too_many_arguments)]
fn populate(
    config: &Configuration,
    tree: &mut ObjectTree,
    node: NodeId,
    element: &Element,
    providers: &ObjectProviders,
    scope: &NamespaceContext,
    path: &str,
    depth: usize,
) -> Result<()> {
    if is_mixed(element) {
        return Err(Error::Unmarshalling(
            UnmarshallingError::new("mixed content is not supported")
                .with_reason("text and child elements cannot both be kept in order"),
        ));
    }

    for namespace in element.namespaces() {
        tree.declare_namespace(node, namespace.clone())?;
    }

    // The source element is cached standalone, so it must carry any
    // ancestor declaration its xsi:type value depends on.
    let mut source = element.clone();
    let binding = tree
        .get(node)?
        .schema_type()
        .and_then(|schema_type| inherited_type_binding(element, schema_type));
    if let Some(binding) = binding {
        tree.declare_namespace(node, binding.clone())?;
        source.declare_namespace(binding);
    }

    let xsi_type = xsi_type_name();
    for attribute in element.attributes() {
        if attribute.name == xsi_type {
            continue;
        }
        let mut attribute = attribute.clone();
        attribute.is_id = attribute.is_id || config.is_id_attribute(&attribute.name);
        providers.unmarshaller.process_attribute(tree, node, &attribute)?;
    }

    let mut text = String::new();
    let mut child_count = 0;
    for content in element.children() {
        match content {
            Content::Text(t) => text.push_str(t),
            Content::Element(child_element) => {
                child_count += 1;
                config.limits().check_children(child_count)?;

                let child = unmarshall_at(config, tree, child_element, scope, path, depth + 1)?;
                let outcome = providers.unmarshaller.process_child_element(tree, node, child);
                if tree.get(child)?.parent().is_none() {
                    tracing::debug!(child = %child, path, "child not kept by parent, releasing");
                    tree.release(child)?;
                }
                outcome?;
            }
        }
    }

    if !text.trim().is_empty() {
        providers.unmarshaller.process_element_content(tree, node, &text)?;
    }

    tree.cache_dom(node, source)
}

fn is_mixed(element: &Element) -> bool {
    let mut text = false;
    let mut elements = false;
    for content in element.children() {
        match content {
            Content::Text(t) => text |= !t.trim().is_empty(),
            Content::Element(_) => elements = true,
        }
    }
    text && elements
}

/// The declaration an `xsi:type` value relies on when only an ancestor makes it
fn inherited_type_binding(element: &Element, schema_type: &QName) -> Option<Namespace> {
    let uri = schema_type.namespace()?;
    let prefix = schema_type.prefix.clone();
    let declared = element.namespaces().iter().any(|ns| ns.prefix == prefix);
    (!declared).then(|| Namespace::new(prefix, uri))
}

/// Resolve the element's `xsi:type`, if present
fn schema_type_of(element: &Element, scope: &NamespaceContext) -> Result<Option<QName>> {
    let value = match element.attribute_value(&xsi_type_name()) {
        Some(value) => value.trim(),
        None => return Ok(None),
    };

    crate::names::validate_qname(value)?;
    let schema_type = scope.resolve(value).map_err(|e| {
        Error::Unmarshalling(
            UnmarshallingError::new(format!("cannot resolve xsi:type '{}'", value))
                .with_reason(e.to_string()),
        )
    })?;
    Ok(Some(schema_type))
}

/// Attach the element path to errors that do not carry one yet
fn at_path(err: Error, path: &str) -> Error {
    match err {
        Error::Unmarshalling(inner) if inner.path.is_none() => {
            Error::Unmarshalling(inner.with_path(path))
        }
        Error::Name(message) | Error::Namespace(message) => {
            Error::Unmarshalling(UnmarshallingError::new(message).with_path(path))
        }
        other => other,
    }
}
