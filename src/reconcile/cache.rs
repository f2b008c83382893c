//! Retained-node cache: StableId → host node.

use std::collections::{BTreeMap, HashMap};

use crate::compose::StableId;
use crate::host::HostHandle;

/// A host node the renderer keeps alive across passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetainedNode {
    pub id: StableId,
    pub handle: HostHandle,
    pub tag: String,
    /// Attributes last written by the renderer.
    pub attributes: BTreeMap<String, String>,
    /// Text last written by the renderer.
    pub text: Option<String>,
}

impl RetainedNode {
    /// A node with nothing applied yet.
    pub fn new(id: StableId, handle: HostHandle, tag: impl Into<String>) -> Self {
        Self {
            id,
            handle,
            tag: tag.into(),
            attributes: BTreeMap::new(),
            text: None,
        }
    }
}

/// Bidirectional index of retained nodes.
///
/// Holds at most one node per [`StableId`] and at most one id per handle.
#[derive(Debug, Default)]
pub struct RetainedCache {
    by_id: HashMap<StableId, RetainedNode>,
    by_handle: HashMap<HostHandle, StableId>,
}

impl RetainedCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `node`, replacing any previous entry for its id or handle.
    pub fn insert(&mut self, node: RetainedNode) -> Option<RetainedNode> {
        if let Some(other) = self.by_handle.get(&node.handle).cloned() {
            if other != node.id {
                self.evict(&other);
            }
        }
        let previous = self.evict(&node.id);
        self.by_handle.insert(node.handle.clone(), node.id.clone());
        self.by_id.insert(node.id.clone(), node);
        previous
    }

    /// Remove the entry for `id`.
    pub fn evict(&mut self, id: &StableId) -> Option<RetainedNode> {
        let node = self.by_id.remove(id)?;
        self.by_handle.remove(&node.handle);
        Some(node)
    }

    pub fn get(&self, id: &StableId) -> Option<&RetainedNode> {
        self.by_id.get(id)
    }

    pub fn get_mut(&mut self, id: &StableId) -> Option<&mut RetainedNode> {
        self.by_id.get_mut(id)
    }

    /// The id retained for `handle`.
    pub fn id_for(&self, handle: &HostHandle) -> Option<&StableId> {
        self.by_handle.get(handle)
    }

    pub fn contains(&self, id: &StableId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Whether any entry points at `handle`.
    pub fn holds_handle(&self, handle: &HostHandle) -> bool {
        self.by_handle.contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// All retained ids, sorted.
    pub fn ids(&self) -> Vec<StableId> {
        let mut ids: Vec<_> = self.by_id.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_handle.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, handle: &str) -> RetainedNode {
        RetainedNode::new(StableId::new(id), HostHandle::new(handle), "div")
    }

    #[test]
    fn insert_and_lookup_both_ways() {
        let mut cache = RetainedCache::new();
        cache.insert(node("a", "n1"));
        assert!(cache.contains(&StableId::new("a")));
        assert_eq!(cache.id_for(&HostHandle::new("n1")), Some(&StableId::new("a")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn reinsert_same_id_replaces_handle() {
        let mut cache = RetainedCache::new();
        cache.insert(node("a", "n1"));
        let previous = cache.insert(node("a", "n2"));
        assert_eq!(previous.map(|n| n.handle), Some(HostHandle::new("n1")));
        assert_eq!(cache.len(), 1);
        assert!(!cache.holds_handle(&HostHandle::new("n1")));
        assert!(cache.holds_handle(&HostHandle::new("n2")));
    }

    #[test]
    fn handle_claimed_by_new_id_evicts_old_id() {
        let mut cache = RetainedCache::new();
        cache.insert(node("a", "n1"));
        cache.insert(node("b", "n1"));
        assert!(!cache.contains(&StableId::new("a")));
        assert_eq!(cache.id_for(&HostHandle::new("n1")), Some(&StableId::new("b")));
    }

    #[test]
    fn evict_is_noop_for_unknown() {
        let mut cache = RetainedCache::new();
        assert!(cache.evict(&StableId::new("ghost")).is_none());
        cache.insert(node("a", "n1"));
        assert!(cache.evict(&StableId::new("a")).is_some());
        assert!(cache.is_empty());
        assert!(!cache.holds_handle(&HostHandle::new("n1")));
    }

    #[test]
    fn ids_sorted() {
        let mut cache = RetainedCache::new();
        cache.insert(node("b", "n2"));
        cache.insert(node("a", "n1"));
        assert_eq!(cache.ids(), vec![StableId::new("a"), StableId::new("b")]);
    }
}
