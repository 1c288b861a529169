//! QName index over a child list

use super::{NodeId, XmlObject};
use crate::namespaces::QName;
use indexmap::IndexMap;
use std::fmt;

/// Key of a [`QNameIndex`] bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    /// Objects with this element name
    Element(QName),
    /// Objects with this schema type
    Type(QName),
}

impl IndexKey {
    /// Keys an object is indexed under: its element name, and its schema
    /// type when it has one
    pub fn keys_for(object: &XmlObject) -> Vec<IndexKey> {
        let mut keys = vec![IndexKey::Element(object.element_name().clone())];
        if let Some(schema_type) = object.schema_type() {
            keys.push(IndexKey::Type(schema_type.clone()));
        }
        keys
    }

    /// Whether `object` is indexed under this key
    pub fn matches(&self, object: &XmlObject) -> bool {
        match self {
            IndexKey::Element(name) => object.element_name() == name,
            IndexKey::Type(name) => object.schema_type() == Some(name),
        }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKey::Element(name) => write!(f, "element {}", name),
            IndexKey::Type(name) => write!(f, "type {}", name),
        }
    }
}

/// Children grouped by element name and by schema type.
///
/// Each bucket lists its members in child-list order. A bucket is created
/// the first time something is indexed under its key and stays (possibly
/// empty) afterwards.
#[derive(Debug, Clone, Default)]
pub struct QNameIndex {
    buckets: IndexMap<IndexKey, Vec<NodeId>>,
}

impl QNameIndex {
    /// Members under `key`; None if nothing was ever indexed under it
    pub fn get(&self, key: &IndexKey) -> Option<&[NodeId]> {
        self.buckets.get(key).map(|b| b.as_slice())
    }

    /// Every key ever indexed
    pub fn keys(&self) -> impl Iterator<Item = &IndexKey> {
        self.buckets.keys()
    }

    /// Number of buckets
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether no bucket exists
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Whether `node` is in the bucket for `key`
    pub fn contains(&self, key: &IndexKey, node: NodeId) -> bool {
        self.buckets
            .get(key)
            .map_or(false, |bucket| bucket.contains(&node))
    }

    /// Position a new member takes in the bucket for `key` when it follows
    /// `preceding` in the child list
    pub(crate) fn bucket_position(&self, key: &IndexKey, preceding: &[NodeId]) -> usize {
        match self.buckets.get(key) {
            Some(bucket) => preceding.iter().filter(|n| bucket.contains(n)).count(),
            None => 0,
        }
    }

    pub(crate) fn insert_at(&mut self, key: IndexKey, position: usize, node: NodeId) {
        let bucket = self.buckets.entry(key).or_default();
        let position = position.min(bucket.len());
        bucket.insert(position, node);
    }

    pub(crate) fn remove(&mut self, key: &IndexKey, node: NodeId) -> bool {
        match self.buckets.get_mut(key) {
            Some(bucket) => match bucket.iter().position(|n| *n == node) {
                Some(position) => {
                    bucket.remove(position);
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    /// Empty every bucket, keeping the keys
    pub(crate) fn clear(&mut self) {
        for bucket in self.buckets.values_mut() {
            bucket.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(index: u32) -> NodeId {
        NodeId {
            index,
            generation: 0,
        }
    }

    #[test]
    fn test_keys_for_object() {
        let object = XmlObject::new(QName::namespaced("urn:test", "a"))
            .with_schema_type(Some(QName::namespaced("urn:test", "AType")));
        let keys = IndexKey::keys_for(&object);
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().all(|k| k.matches(&object)));

        let untyped = XmlObject::new(QName::local("b"));
        assert_eq!(IndexKey::keys_for(&untyped).len(), 1);
        assert!(!IndexKey::Type(QName::local("b")).matches(&untyped));
    }

    #[test]
    fn test_bucket_position_follows_list_order() {
        let key = IndexKey::Element(QName::local("x"));
        let mut index = QNameIndex::default();
        index.insert_at(key.clone(), 0, node(1));
        index.insert_at(key.clone(), 1, node(3));

        // list: [1, 2, 3]; node 2 is not in the bucket
        let list = [node(1), node(2), node(3)];
        assert_eq!(index.bucket_position(&key, &list[..2]), 1);
        index.insert_at(key.clone(), 1, node(4));
        assert_eq!(index.get(&key).unwrap(), &[node(1), node(4), node(3)]);
    }

    #[test]
    fn test_emptied_bucket_is_kept() {
        let key = IndexKey::Element(QName::local("x"));
        let mut index = QNameIndex::default();
        assert!(index.get(&key).is_none());

        index.insert_at(key.clone(), 0, node(1));
        assert!(index.remove(&key, node(1)));
        assert!(!index.remove(&key, node(1)));
        assert_eq!(index.get(&key), Some(&[][..]));

        index.insert_at(key.clone(), 0, node(2));
        index.clear();
        assert_eq!(index.len(), 1);
        assert!(index.get(&key).unwrap().is_empty());
    }

    #[test]
    fn test_key_display() {
        let key = IndexKey::Type(QName::namespaced("urn:test", "T"));
        assert_eq!(key.to_string(), "type {urn:test}T");
    }
}
