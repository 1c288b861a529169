//! Object trees
//!
//! Every [`XmlObject`] lives in an [`ObjectTree`] arena and is addressed by a
//! generation-checked [`NodeId`]. The tree owns the parent/child relation, so
//! the invariants that span several nodes are maintained in one place:
//!
//! - a node has at most one parent and never becomes its own ancestor
//! - each parent keeps a [`QNameIndex`] of its children, in child-list order
//! - each node keeps an [`IdIndex`] of every ID value in its subtree
//! - any mutation marks the cached DOM of the node and its ancestors stale

mod attributes;
mod cache;
mod children;
mod ids;
mod index;

pub use attributes::{AttributeMap, AttributeMapMut};
pub use cache::CacheLookup;
pub use children::{ChildList, ChildListMut, SubListMut};
pub use ids::IdIndex;
pub use index::{IndexKey, QNameIndex};

use crate::documents::Element;
use crate::error::{Result, StructuralError};
use crate::namespaces::{Namespace, QName};
use cache::DomCache;
use std::fmt;

/// Handle to an object in an [`ObjectTree`].
///
/// Handles are only meaningful for the tree that issued them. A handle to a
/// released object is rejected, even after its slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// An XML-backed object
#[derive(Debug, Clone)]
pub struct XmlObject {
    element_name: QName,
    schema_type: Option<QName>,
    id_attribute: Option<QName>,
    id: Option<String>,
    text: Option<String>,
    namespaces: Vec<Namespace>,
    attributes: AttributeMap,
    parent: Option<NodeId>,
    children: ChildList,
    ids: IdIndex,
    dom: DomCache,
}

impl XmlObject {
    /// Create an object for the given element name
    pub fn new(element_name: QName) -> Self {
        Self {
            element_name,
            schema_type: None,
            id_attribute: None,
            id: None,
            text: None,
            namespaces: Vec::new(),
            attributes: AttributeMap::default(),
            parent: None,
            children: ChildList::default(),
            ids: IdIndex::default(),
            dom: DomCache::default(),
        }
    }

    /// Set the schema type (`xsi:type`)
    pub fn with_schema_type(mut self, schema_type: Option<QName>) -> Self {
        self.schema_type = schema_type;
        self
    }

    /// Declare the attribute that carries this object's typed ID
    pub fn with_id_attribute(mut self, name: QName) -> Self {
        self.id_attribute = Some(name);
        self
    }

    /// Element name
    pub fn element_name(&self) -> &QName {
        &self.element_name
    }

    /// Schema type, fixed at build time
    pub fn schema_type(&self) -> Option<&QName> {
        self.schema_type.as_ref()
    }

    /// Name of the typed ID attribute, if this kind of object has one
    pub fn id_attribute(&self) -> Option<&QName> {
        self.id_attribute.as_ref()
    }

    /// Typed ID value
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Text content
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Namespace declarations carried by this object
    pub fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }

    /// Attributes without a typed field
    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    /// Parent handle
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in order
    pub fn children(&self) -> &ChildList {
        &self.children
    }

    /// IDs resolvable within this object's subtree
    pub fn id_index(&self) -> &IdIndex {
        &self.ids
    }

    /// State of the cached DOM
    pub fn dom_cache(&self) -> CacheLookup<'_> {
        self.dom.lookup()
    }

    /// Keys under which a parent indexes this object
    pub fn index_keys(&self) -> Vec<IndexKey> {
        IndexKey::keys_for(self)
    }

    /// Whether this object itself carries `id` in one of its ID attributes
    fn claims_id(&self, id: &str) -> bool {
        self.id.as_deref() == Some(id) || self.attributes.id_values().any(|v| v == id)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    object: Option<XmlObject>,
}

/// Arena holding every object of one or more trees
#[derive(Debug, Clone, Default)]
pub struct ObjectTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl ObjectTree {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether the arena holds no objects
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Add a detached object to the arena
    pub fn insert(&mut self, object: XmlObject) -> NodeId {
        let mut object = object;
        object.parent = None;
        self.live += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.object = Some(object);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            object: Some(object),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    /// Whether `node` names a live object
    pub fn contains(&self, node: NodeId) -> bool {
        self.get(node).is_ok()
    }

    /// Borrow an object
    pub fn get(&self, node: NodeId) -> Result<&XmlObject> {
        self.slots
            .get(node.index as usize)
            .filter(|slot| slot.generation == node.generation)
            .and_then(|slot| slot.object.as_ref())
            .ok_or_else(|| StructuralError::UnknownNode(node.to_string()).into())
    }

    pub(crate) fn get_mut(&mut self, node: NodeId) -> Result<&mut XmlObject> {
        self.slots
            .get_mut(node.index as usize)
            .filter(|slot| slot.generation == node.generation)
            .and_then(|slot| slot.object.as_mut())
            .ok_or_else(|| StructuralError::UnknownNode(node.to_string()).into())
    }

    /// Parent of `node`
    pub fn parent(&self, node: NodeId) -> Result<Option<NodeId>> {
        Ok(self.get(node)?.parent)
    }

    /// Topmost ancestor of `node` (itself when detached)
    pub fn root(&self, node: NodeId) -> Result<NodeId> {
        let mut current = node;
        while let Some(parent) = self.get(current)?.parent {
            current = parent;
        }
        Ok(current)
    }

    /// `node` followed by its ancestors, nearest first
    pub fn ancestors(&self, node: NodeId) -> Result<Vec<NodeId>> {
        let mut chain = vec![node];
        let mut current = self.get(node)?;
        while let Some(parent) = current.parent {
            chain.push(parent);
            current = self.get(parent)?;
        }
        Ok(chain)
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> Result<bool> {
        Ok(self.ancestors(node)?.contains(&ancestor))
    }

    /// `node` and all its descendants, in document order
    pub fn descendants(&self, node: NodeId) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            out.push(current);
            let children = &self.get(current)?.children;
            stack.extend(children.iter().rev());
        }
        Ok(out)
    }

    /// Children of `node`
    pub fn children(&self, node: NodeId) -> Result<&ChildList> {
        Ok(&self.get(node)?.children)
    }

    /// Mutable view of the children of `node`
    pub fn children_mut(&mut self, node: NodeId) -> Result<ChildListMut<'_>> {
        self.get(node)?;
        Ok(ChildListMut::new(self, node))
    }

    /// Attributes of `node`
    pub fn attributes(&self, node: NodeId) -> Result<&AttributeMap> {
        Ok(&self.get(node)?.attributes)
    }

    /// Mutable view of the attributes of `node`
    pub fn attributes_mut(&mut self, node: NodeId) -> Result<AttributeMapMut<'_>> {
        self.get(node)?;
        Ok(AttributeMapMut::new(self, node))
    }

    /// Set the typed ID of `node`.
    ///
    /// Only objects with a typed ID attribute can hold an ID; clearing is
    /// always allowed.
    pub fn set_id(&mut self, node: NodeId, id: Option<&str>) -> Result<()> {
        let object = self.get_mut(node)?;
        if id.is_some() && object.id_attribute.is_none() {
            return Err(StructuralError::NoIdAttribute(node.to_string()).into());
        }
        let old = std::mem::replace(&mut object.id, id.map(str::to_string));
        if old.as_deref() == id {
            return Ok(());
        }
        self.on_id_changed(node, old.as_deref(), id)?;
        self.mark_dirty(node)
    }

    /// Set the text content of `node`
    pub fn set_text(&mut self, node: NodeId, text: Option<&str>) -> Result<()> {
        let object = self.get_mut(node)?;
        if object.text.as_deref() == text {
            return Ok(());
        }
        object.text = text.map(str::to_string);
        self.mark_dirty(node)
    }

    /// Declare a namespace on `node`, replacing a declaration of the same prefix
    pub fn declare_namespace(&mut self, node: NodeId, namespace: Namespace) -> Result<()> {
        let object = self.get_mut(node)?;
        match object
            .namespaces
            .iter_mut()
            .find(|ns| ns.prefix == namespace.prefix)
        {
            Some(existing) if *existing == namespace => return Ok(()),
            Some(existing) => *existing = namespace,
            None => object.namespaces.push(namespace),
        }
        self.mark_dirty(node)
    }

    /// Cached DOM state of `node`
    pub fn dom_cache(&self, node: NodeId) -> Result<CacheLookup<'_>> {
        Ok(self.get(node)?.dom.lookup())
    }

    pub(crate) fn cache_dom(&mut self, node: NodeId, element: Element) -> Result<()> {
        self.get_mut(node)?.dom.store(element);
        Ok(())
    }

    /// Mark the cached DOM of `node` and every ancestor stale
    pub fn mark_dirty(&mut self, node: NodeId) -> Result<()> {
        for scope in self.ancestors(node)? {
            if self.get_mut(scope)?.dom.invalidate() {
                tracing::trace!(node = %scope, "cached DOM invalidated");
            }
        }
        Ok(())
    }

    /// Remove `node` from its parent's child list.
    ///
    /// Returns false when the node was already detached.
    pub fn detach(&mut self, node: NodeId) -> Result<bool> {
        match self.get(node)?.parent {
            Some(parent) => self.children_mut(parent)?.remove(node),
            None => Ok(false),
        }
    }

    /// Drop a detached node and its subtree from the arena
    pub fn release(&mut self, node: NodeId) -> Result<()> {
        if self.get(node)?.parent.is_some() {
            return Err(StructuralError::StillAttached(node.to_string()).into());
        }

        let subtree = self.descendants(node)?;
        for released in &subtree {
            let slot = &mut self.slots[released.index as usize];
            slot.object = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(released.index);
            self.live -= 1;
        }
        tracing::trace!(node = %node, count = subtree.len(), "released subtree");
        Ok(())
    }
}
