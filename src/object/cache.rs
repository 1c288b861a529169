//! Cached DOM of an object

use crate::documents::Element;

/// What [`XmlObject::dom_cache`](super::XmlObject::dom_cache) reports
#[derive(Debug, Clone, Copy)]
pub enum CacheLookup<'a> {
    /// Nothing was ever cached
    Empty,
    /// An element was cached and the object has not changed since
    Fresh(&'a Element),
    /// An element was cached but the object has since been modified
    Stale,
}

impl<'a> CacheLookup<'a> {
    /// Whether a current element is cached
    pub fn is_fresh(&self) -> bool {
        matches!(self, CacheLookup::Fresh(_))
    }

    /// The cached element, if current
    pub fn element(&self) -> Option<&'a Element> {
        match *self {
            CacheLookup::Fresh(element) => Some(element),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
enum CacheState {
    #[default]
    Empty,
    Fresh(Element),
    Stale,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct DomCache {
    state: CacheState,
}

impl DomCache {
    pub(crate) fn lookup(&self) -> CacheLookup<'_> {
        match &self.state {
            CacheState::Empty => CacheLookup::Empty,
            CacheState::Fresh(element) => CacheLookup::Fresh(element),
            CacheState::Stale => CacheLookup::Stale,
        }
    }

    pub(crate) fn store(&mut self, element: Element) {
        self.state = CacheState::Fresh(element);
    }

    /// Drop a cached element; true if one was current
    pub(crate) fn invalidate(&mut self) -> bool {
        match self.state {
            CacheState::Fresh(_) => {
                self.state = CacheState::Stale;
                true
            }
            _ => false,
        }
    }
}
