//! Ordered child lists
//!
//! [`ChildList`] is the read side, reachable from any borrowed object.
//! Mutation goes through [`ChildListMut`] and [`SubListMut`], which borrow
//! the whole tree so that ownership, the QName index, the ID registry and
//! the DOM cache are all updated in the same call.

use super::index::{IndexKey, QNameIndex};
use super::{NodeId, ObjectTree};
use crate::error::{Result, StructuralError};

/// Children of one object, in order
#[derive(Debug, Clone, Default)]
pub struct ChildList {
    items: Vec<NodeId>,
    index: QNameIndex,
}

impl ChildList {
    /// Number of children
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no children
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Child at `index`
    pub fn get(&self, index: usize) -> Option<NodeId> {
        self.items.get(index).copied()
    }

    /// Children in order
    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'_, NodeId>> {
        self.items.iter().copied()
    }

    /// Children as a slice
    pub fn as_slice(&self) -> &[NodeId] {
        &self.items
    }

    /// Whether `node` is a child
    pub fn contains(&self, node: NodeId) -> bool {
        self.items.contains(&node)
    }

    /// Position of `node`
    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.items.iter().position(|n| *n == node)
    }

    /// The QName index over these children
    pub fn index(&self) -> &QNameIndex {
        &self.index
    }

    /// Children indexed under `key`, in list order
    pub fn indexed(&self, key: &IndexKey) -> Option<&[NodeId]> {
        self.index.get(key)
    }
}

impl<'a> IntoIterator for &'a ChildList {
    type Item = NodeId;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, NodeId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn out_of_bounds(index: usize, len: usize) -> crate::error::Error {
    StructuralError::IndexOutOfBounds { index, len }.into()
}

/// List primitives shared by [`ChildListMut`] and [`SubListMut`]
impl ObjectTree {
    /// Check that `node` may become a child of `parent`, without mutating anything
    fn check_attachable(&self, parent: NodeId, node: NodeId) -> Result<()> {
        self.get(parent)?;
        if let Some(owner) = self.get(node)?.parent {
            return Err(StructuralError::AlreadyOwned {
                child: node.to_string(),
                owner: owner.to_string(),
            }
            .into());
        }
        if self.is_ancestor_or_self(node, parent)? {
            return Err(StructuralError::Cycle {
                child: node.to_string(),
                parent: parent.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Put an already checked `node` at `position` and index it
    fn link(&mut self, parent: NodeId, position: usize, node: NodeId) -> Result<()> {
        let keys = self.get(node)?.index_keys();
        let list = &mut self.get_mut(parent)?.children;
        for key in keys {
            let bucket_position = list.index.bucket_position(&key, &list.items[..position]);
            list.index.insert_at(key, bucket_position, node);
        }
        list.items.insert(position, node);

        self.get_mut(node)?.parent = Some(parent);
        self.attach_ids(node, parent)
    }

    /// Take the child at `position` out of the list and its index
    fn unlink(&mut self, parent: NodeId, position: usize) -> Result<NodeId> {
        let node = {
            let list = &mut self.get_mut(parent)?.children;
            if position >= list.items.len() {
                return Err(out_of_bounds(position, list.items.len()));
            }
            list.items.remove(position)
        };

        let keys = self.get(node)?.index_keys();
        let list = &mut self.get_mut(parent)?.children;
        for key in &keys {
            list.index.remove(key, node);
        }

        self.get_mut(node)?.parent = None;
        self.detach_ids(node, parent)?;
        Ok(node)
    }

    fn list_insert(&mut self, parent: NodeId, position: usize, node: NodeId) -> Result<()> {
        let len = self.get(parent)?.children.len();
        if position > len {
            return Err(out_of_bounds(position, len));
        }
        self.check_attachable(parent, node)?;

        self.link(parent, position, node)?;
        self.mark_dirty(parent)?;
        tracing::trace!(parent = %parent, child = %node, position, "child attached");
        Ok(())
    }

    fn list_remove_at(&mut self, parent: NodeId, position: usize) -> Result<NodeId> {
        let node = self.unlink(parent, position)?;
        self.mark_dirty(parent)?;
        tracing::trace!(parent = %parent, child = %node, position, "child detached");
        Ok(node)
    }

    fn list_set(&mut self, parent: NodeId, position: usize, node: NodeId) -> Result<NodeId> {
        let list = &self.get(parent)?.children;
        let old = list
            .get(position)
            .ok_or_else(|| out_of_bounds(position, list.len()))?;
        if old == node {
            return Ok(old);
        }
        self.check_attachable(parent, node)?;

        self.unlink(parent, position)?;
        self.link(parent, position, node)?;
        self.mark_dirty(parent)?;
        tracing::trace!(parent = %parent, old = %old, new = %node, position, "child replaced");
        Ok(old)
    }

    fn list_clear(&mut self, parent: NodeId) -> Result<()> {
        let removed = {
            let list = &mut self.get_mut(parent)?.children;
            list.index.clear();
            std::mem::take(&mut list.items)
        };
        if removed.is_empty() {
            return Ok(());
        }

        for child in &removed {
            self.get_mut(*child)?.parent = None;
            self.detach_ids(*child, parent)?;
        }
        self.mark_dirty(parent)?;
        tracing::trace!(parent = %parent, count = removed.len(), "children cleared");
        Ok(())
    }
}

/// Mutable view of an object's children
pub struct ChildListMut<'t> {
    tree: &'t mut ObjectTree,
    parent: NodeId,
}

impl<'t> ChildListMut<'t> {
    pub(super) fn new(tree: &'t mut ObjectTree, parent: NodeId) -> Self {
        Self { tree, parent }
    }

    fn list(&self) -> Option<&ChildList> {
        self.tree.get(self.parent).ok().map(|o| &o.children)
    }

    /// Owner of the list
    pub fn parent(&self) -> NodeId {
        self.parent
    }

    /// Number of children
    pub fn len(&self) -> usize {
        self.list().map_or(0, ChildList::len)
    }

    /// Whether there are no children
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Child at `index`
    pub fn get(&self, index: usize) -> Option<NodeId> {
        self.list().and_then(|l| l.get(index))
    }

    /// Append a detached node
    pub fn add(&mut self, node: NodeId) -> Result<()> {
        let len = self.len();
        self.tree.list_insert(self.parent, len, node)
    }

    /// Insert a detached node at `index` (0..=len)
    pub fn insert(&mut self, index: usize, node: NodeId) -> Result<()> {
        self.tree.list_insert(self.parent, index, node)
    }

    /// Replace the child at `index`, returning the detached old child
    pub fn set(&mut self, index: usize, node: NodeId) -> Result<NodeId> {
        self.tree.list_set(self.parent, index, node)
    }

    /// Remove `node` if it is a child; false otherwise
    pub fn remove(&mut self, node: NodeId) -> Result<bool> {
        match self.list().and_then(|l| l.position(node)) {
            Some(position) => {
                self.tree.list_remove_at(self.parent, position)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove the child at `index`
    pub fn remove_at(&mut self, index: usize) -> Result<NodeId> {
        self.tree.list_remove_at(self.parent, index)
    }

    /// Detach every child
    pub fn clear(&mut self) -> Result<()> {
        self.tree.list_clear(self.parent)
    }

    /// View of the children indexed under `key`
    pub fn sub_list(&mut self, key: IndexKey) -> SubListMut<'_> {
        SubListMut {
            tree: &mut *self.tree,
            parent: self.parent,
            key,
        }
    }

    /// Turn this handle into a view of the children indexed under `key`
    pub fn into_sub_list(self, key: IndexKey) -> SubListMut<'t> {
        SubListMut {
            tree: self.tree,
            parent: self.parent,
            key,
        }
    }
}

/// Mutable view of the children indexed under one key.
///
/// Changes made here are changes to the underlying child list: added nodes
/// are appended to the end of the full list, removed ones leave it.
pub struct SubListMut<'t> {
    tree: &'t mut ObjectTree,
    parent: NodeId,
    key: IndexKey,
}

impl<'t> SubListMut<'t> {
    fn bucket(&self) -> &[NodeId] {
        self.tree
            .get(self.parent)
            .ok()
            .and_then(|o| o.children.index.get(&self.key))
            .unwrap_or(&[])
    }

    fn primary_position(&self, node: NodeId) -> Option<usize> {
        self.tree
            .get(self.parent)
            .ok()
            .and_then(|o| o.children.position(node))
    }

    fn check_key(&self, node: NodeId) -> Result<()> {
        if self.key.matches(self.tree.get(node)?) {
            Ok(())
        } else {
            Err(StructuralError::KeyMismatch {
                node: node.to_string(),
                key: self.key.to_string(),
            }
            .into())
        }
    }

    /// Key of this view
    pub fn key(&self) -> &IndexKey {
        &self.key
    }

    /// Number of matching children
    pub fn len(&self) -> usize {
        self.bucket().len()
    }

    /// Whether no child matches
    pub fn is_empty(&self) -> bool {
        self.bucket().is_empty()
    }

    /// Matching child at `index`
    pub fn get(&self, index: usize) -> Option<NodeId> {
        self.bucket().get(index).copied()
    }

    /// Matching children, in list order
    pub fn to_vec(&self) -> Vec<NodeId> {
        self.bucket().to_vec()
    }

    /// Append a detached node matching the key to the end of the full list
    pub fn add(&mut self, node: NodeId) -> Result<()> {
        self.check_key(node)?;
        let len = self.tree.get(self.parent)?.children.len();
        self.tree.list_insert(self.parent, len, node)
    }

    /// Replace the `index`th matching child, in place in the full list
    pub fn set(&mut self, index: usize, node: NodeId) -> Result<NodeId> {
        let old = self
            .get(index)
            .ok_or_else(|| out_of_bounds(index, self.len()))?;
        self.check_key(node)?;
        let position = self
            .primary_position(old)
            .ok_or_else(|| StructuralError::UnknownNode(old.to_string()))?;
        self.tree.list_set(self.parent, position, node)
    }

    /// Remove `node` if it is a matching child
    pub fn remove(&mut self, node: NodeId) -> Result<bool> {
        if !self.bucket().contains(&node) {
            return Ok(false);
        }
        match self.primary_position(node) {
            Some(position) => {
                self.tree.list_remove_at(self.parent, position)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove the `index`th matching child
    pub fn remove_at(&mut self, index: usize) -> Result<NodeId> {
        let node = self
            .get(index)
            .ok_or_else(|| out_of_bounds(index, self.len()))?;
        self.remove(node)?;
        Ok(node)
    }

    /// Remove every matching child from the full list
    pub fn clear(&mut self) -> Result<()> {
        for node in self.to_vec() {
            self.remove(node)?;
        }
        Ok(())
    }
}
