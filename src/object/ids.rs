//! ID attribute registry
//!
//! Every object keeps an [`IdIndex`] mapping the ID values found in its
//! subtree to the objects carrying them. Registration goes to the owner and
//! each of its ancestors; attaching a child merges the child's index into
//! the new parent chain, and detaching takes it back out.
//!
//! When two objects claim the same value in one scope, the most recent
//! registration wins and a warning is logged. If the winner later leaves,
//! a remaining claimant in that scope takes the value back.

use super::{NodeId, ObjectTree};
use crate::error::Result;
use std::collections::HashMap;

/// ID values resolvable within one subtree
#[derive(Debug, Clone, Default)]
pub struct IdIndex {
    ids: HashMap<String, NodeId>,
}

impl IdIndex {
    /// Object carrying `id`
    pub fn get(&self, id: &str) -> Option<NodeId> {
        self.ids.get(id).copied()
    }

    /// Whether `id` is known
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    /// Number of registered values
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Registered values and their owners, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.ids.iter().map(|(id, owner)| (id.as_str(), *owner))
    }

    fn claim(&mut self, scope: NodeId, id: &str, owner: NodeId) {
        if let Some(previous) = self.ids.insert(id.to_string(), owner) {
            if previous != owner {
                tracing::warn!(
                    id,
                    scope = %scope,
                    previous = %previous,
                    owner = %owner,
                    "duplicate ID value, latest registration wins"
                );
            }
        }
    }

    fn release(&mut self, id: &str, owner: NodeId) -> bool {
        if self.ids.get(id) == Some(&owner) {
            self.ids.remove(id);
            true
        } else {
            false
        }
    }
}

impl ObjectTree {
    /// Resolve `id` anywhere in the tree containing `from`
    pub fn resolve_id(&self, from: NodeId, id: &str) -> Result<Option<NodeId>> {
        let root = self.root(from)?;
        Ok(self.get(root)?.ids.get(id))
    }

    /// Resolve `id` within the subtree rooted at `scope`
    pub fn resolve_id_within(&self, scope: NodeId, id: &str) -> Result<Option<NodeId>> {
        Ok(self.get(scope)?.ids.get(id))
    }

    /// An ID value carried by `owner` changed from `old` to `new`.
    ///
    /// The owner's fields must already hold the new value.
    pub(crate) fn on_id_changed(
        &mut self,
        owner: NodeId,
        old: Option<&str>,
        new: Option<&str>,
    ) -> Result<()> {
        if old == new {
            return Ok(());
        }
        if let Some(old) = old {
            self.deregister_id(owner, old)?;
        }
        if let Some(new) = new {
            self.register_id(owner, new)?;
        }
        Ok(())
    }

    fn register_id(&mut self, owner: NodeId, id: &str) -> Result<()> {
        for scope in self.ancestors(owner)? {
            self.get_mut(scope)?.ids.claim(scope, id, owner);
        }
        tracing::debug!(id, owner = %owner, "registered ID");
        Ok(())
    }

    fn deregister_id(&mut self, owner: NodeId, id: &str) -> Result<()> {
        for scope in self.ancestors(owner)? {
            if self.get_mut(scope)?.ids.release(id, owner) {
                self.reclaim(scope, id)?;
            }
        }
        tracing::debug!(id, owner = %owner, "deregistered ID");
        Ok(())
    }

    /// Merge the subtree IDs of a newly attached `child` into `parent` and its ancestors
    pub(super) fn attach_ids(&mut self, child: NodeId, parent: NodeId) -> Result<()> {
        let entries: Vec<(String, NodeId)> = self
            .get(child)?
            .ids
            .iter()
            .map(|(id, owner)| (id.to_string(), owner))
            .collect();
        if entries.is_empty() {
            return Ok(());
        }

        for scope in self.ancestors(parent)? {
            let ids = &mut self.get_mut(scope)?.ids;
            for (id, owner) in &entries {
                ids.claim(scope, id, *owner);
            }
        }
        Ok(())
    }

    /// Remove the subtree IDs of a detached `child` from `old_parent` and its ancestors
    pub(super) fn detach_ids(&mut self, child: NodeId, old_parent: NodeId) -> Result<()> {
        let entries: Vec<(String, NodeId)> = self
            .get(child)?
            .ids
            .iter()
            .map(|(id, owner)| (id.to_string(), owner))
            .collect();
        if entries.is_empty() {
            return Ok(());
        }

        // nearest scope first, so reclaiming sees already-updated children
        for scope in self.ancestors(old_parent)? {
            for (id, owner) in &entries {
                if self.get_mut(scope)?.ids.release(id, *owner) {
                    self.reclaim(scope, id)?;
                }
            }
        }
        Ok(())
    }

    /// After `id` was released in `scope`, hand it to another claimant in that scope
    fn reclaim(&mut self, scope: NodeId, id: &str) -> Result<()> {
        let object = self.get(scope)?;
        let claimant = if object.claims_id(id) {
            Some(scope)
        } else {
            let mut found = None;
            for child in object.children.iter() {
                if let Some(owner) = self.get(child)?.ids.get(id) {
                    found = Some(owner);
                    break;
                }
            }
            found
        };

        if let Some(owner) = claimant {
            self.get_mut(scope)?.ids.ids.insert(id.to_string(), owner);
            tracing::debug!(id, scope = %scope, owner = %owner, "ID reclaimed");
        }
        Ok(())
    }
}
