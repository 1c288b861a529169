//! Attributes without a typed field
//!
//! Attributes that a type does not model explicitly ("unknown" attributes)
//! are kept here in document order. Names registered as ID attributes feed
//! their values into the tree's ID registry.

use super::{NodeId, ObjectTree};
use crate::error::Result;
use crate::namespaces::QName;
use indexmap::{IndexMap, IndexSet};

/// Attribute values keyed by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeMap {
    entries: IndexMap<QName, String>,
    id_attributes: IndexSet<QName>,
}

impl AttributeMap {
    /// Value of `name`
    pub fn get(&self, name: &QName) -> Option<&str> {
        self.entries.get(name).map(|v| v.as_str())
    }

    /// Whether `name` is present
    pub fn contains_key(&self, name: &QName) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no attributes
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Attributes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&QName, &str)> {
        self.entries.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Whether `name` is registered as an ID attribute
    pub fn is_id_attribute(&self, name: &QName) -> bool {
        self.id_attributes.contains(name)
    }

    /// Names registered as ID attributes
    pub fn id_attribute_names(&self) -> impl Iterator<Item = &QName> {
        self.id_attributes.iter()
    }

    /// Values of the present ID attributes
    pub fn id_values(&self) -> impl Iterator<Item = &str> {
        self.id_attributes
            .iter()
            .filter_map(|name| self.entries.get(name))
            .map(|v| v.as_str())
    }
}

/// Mutable view of one object's [`AttributeMap`]
pub struct AttributeMapMut<'t> {
    tree: &'t mut ObjectTree,
    node: NodeId,
}

impl<'t> AttributeMapMut<'t> {
    pub(super) fn new(tree: &'t mut ObjectTree, node: NodeId) -> Self {
        Self { tree, node }
    }

    fn map(&mut self) -> Result<&mut AttributeMap> {
        Ok(&mut self.tree.get_mut(self.node)?.attributes)
    }

    /// Value of `name`
    pub fn get(&self, name: &QName) -> Option<&str> {
        self.tree
            .get(self.node)
            .ok()
            .and_then(|o| o.attributes.get(name))
    }

    /// Set `name`, returning the previous value
    pub fn put(&mut self, name: QName, value: impl Into<String>) -> Result<Option<String>> {
        let value = value.into();
        let map = self.map()?;
        let is_id = map.id_attributes.contains(&name);
        let old = map.entries.insert(name, value.clone());
        if old.as_deref() == Some(value.as_str()) {
            return Ok(old);
        }

        if is_id {
            self.tree
                .on_id_changed(self.node, old.as_deref(), Some(value.as_str()))?;
        }
        self.tree.mark_dirty(self.node)?;
        Ok(old)
    }

    /// Remove `name`, returning its value
    pub fn remove(&mut self, name: &QName) -> Result<Option<String>> {
        let map = self.map()?;
        let is_id = map.id_attributes.contains(name);
        let old = map.entries.shift_remove(name);
        if old.is_none() {
            return Ok(None);
        }

        if is_id {
            self.tree.on_id_changed(self.node, old.as_deref(), None)?;
        }
        self.tree.mark_dirty(self.node)?;
        Ok(old)
    }

    /// Treat `name` as an ID attribute
    pub fn register_id(&mut self, name: QName) -> Result<()> {
        let map = self.map()?;
        let value = map.entries.get(&name).cloned();
        if !map.id_attributes.insert(name) {
            return Ok(());
        }

        if let Some(value) = value {
            self.tree.on_id_changed(self.node, None, Some(value.as_str()))?;
        }
        self.tree.mark_dirty(self.node)
    }

    /// Stop treating `name` as an ID attribute
    pub fn deregister_id(&mut self, name: &QName) -> Result<()> {
        let map = self.map()?;
        if !map.id_attributes.shift_remove(name) {
            return Ok(());
        }
        let value = map.entries.get(name).cloned();

        if let Some(value) = value {
            self.tree.on_id_changed(self.node, Some(value.as_str()), None)?;
        }
        self.tree.mark_dirty(self.node)
    }

    /// Remove every attribute; ID registrations of names are kept
    pub fn clear(&mut self) -> Result<()> {
        let map = self.map()?;
        if map.entries.is_empty() {
            return Ok(());
        }
        let id_values: Vec<String> = map.id_values().map(str::to_string).collect();
        map.entries.clear();

        for value in &id_values {
            self.tree.on_id_changed(self.node, Some(value.as_str()), None)?;
        }
        self.tree.mark_dirty(self.node)
    }
}
