//! Tree operations: insert, remove, move, walk, and the [`Host`] binding.

use std::collections::VecDeque;

use slotmap::{SecondaryMap, SlotMap};

use super::node::{NodeData, NodeId};
use crate::host::{Host, HostError, HostHandle};

/// Empty slice constant for returning when a node has no children.
const EMPTY_CHILDREN: &[NodeId] = &[];

/// Counters of structural host mutations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentStats {
    /// Nodes created through [`Host::create_element`] or [`Host::create_root`].
    pub created: usize,
    /// Insert or move operations performed by [`Host::insert_before`].
    pub inserted: usize,
    /// Subtrees removed by [`Host::remove`].
    pub removed: usize,
}

/// In-memory host document, backed by a slotmap arena.
///
/// All nodes live in a single `SlotMap`. Parent/child relationships are stored
/// in secondary maps so that node removal is O(subtree size) and lookup is O(1).
/// Nodes without a parent are either top-level roots or detached.
#[derive(Debug)]
pub struct Document {
    pub(crate) nodes: SlotMap<NodeId, NodeData>,
    children: SecondaryMap<NodeId, Vec<NodeId>>,
    parent: SecondaryMap<NodeId, NodeId>,
    roots: Vec<NodeId>,
    stats: DocumentStats,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            children: SecondaryMap::new(),
            parent: SecondaryMap::new(),
            roots: Vec::new(),
            stats: DocumentStats::default(),
        }
    }

    /// Insert a top-level node.
    pub fn insert(&mut self, data: NodeData) -> NodeId {
        let id = self.insert_detached(data);
        self.roots.push(id);
        id
    }

    /// Insert a node as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics (debug) if `parent` does not exist in the tree.
    pub fn insert_child(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        debug_assert!(
            self.nodes.contains_key(parent),
            "parent node does not exist"
        );
        let id = self.insert_detached(data);
        self.parent.insert(id, parent);
        if let Some(siblings) = self.children.get_mut(parent) {
            siblings.push(id);
        }
        id
    }

    fn insert_detached(&mut self, data: NodeData) -> NodeId {
        let id = self.nodes.insert(data);
        self.children.insert(id, Vec::new());
        id
    }

    /// Remove a node and all its descendants.
    ///
    /// Returns the `NodeData` for the removed node, or `None` if it didn't exist.
    pub fn remove_node(&mut self, id: NodeId) -> Option<NodeData> {
        if !self.nodes.contains_key(id) {
            return None;
        }
        self.detach(id);

        let mut to_remove = VecDeque::new();
        to_remove.push_back(id);
        let mut removed_root_data = None;

        while let Some(current) = to_remove.pop_front() {
            if let Some(kids) = self.children.remove(current) {
                to_remove.extend(kids);
            }
            self.parent.remove(current);
            let data = self.nodes.remove(current);
            if current == id {
                removed_root_data = data;
            }
        }

        removed_root_data
    }

    /// Unlink `id` from its parent (or from the top-level list).
    fn detach(&mut self, id: NodeId) {
        if let Some(parent_id) = self.parent.remove(id) {
            if let Some(siblings) = self.children.get_mut(parent_id) {
                siblings.retain(|&child| child != id);
            }
        } else {
            self.roots.retain(|&root| root != id);
        }
    }

    /// Destroy a node behind the renderer's back.
    ///
    /// Models a host object being invalidated without notification; any handle
    /// pointing at it becomes stale.
    pub fn invalidate(&mut self, handle: &HostHandle) -> bool {
        match self.resolve(handle) {
            Some(id) => self.remove_node(id).is_some(),
            None => false,
        }
    }

    /// Decode a handle into a live node id.
    pub fn resolve(&self, handle: &HostHandle) -> Option<NodeId> {
        NodeId::from_handle(handle).filter(|id| self.nodes.contains_key(*id))
    }

    fn resolve_or_err(&self, handle: &HostHandle) -> Result<NodeId, HostError> {
        match NodeId::from_handle(handle) {
            Some(id) if self.nodes.contains_key(id) => Ok(id),
            Some(_) => Err(HostError::StaleHandle(handle.clone())),
            None => Err(HostError::UnknownHandle(handle.clone())),
        }
    }

    /// Get the parent of a node, if it has one.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.parent.get(id).copied()
    }

    /// Get the children of a node. Returns an empty slice if the node has no children
    /// or does not exist.
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.children
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(EMPTY_CHILDREN)
    }

    /// Walk from `id` up to the top, collecting ancestor node ids.
    ///
    /// The returned vec does **not** include `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = id;
        while let Some(p) = self.parent.get(current).copied() {
            result.push(p);
            current = p;
        }
        result
    }

    /// Immutable access to a node's data.
    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id)
    }

    /// Mutable access to a node's data.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id)
    }

    /// Node data behind a handle.
    pub fn node(&self, handle: &HostHandle) -> Option<&NodeData> {
        self.resolve(handle).and_then(|id| self.nodes.get(id))
    }

    /// Handler ids bound on `handle` for `event`.
    pub fn listeners(&self, handle: &HostHandle, event: &str) -> Vec<String> {
        self.node(handle)
            .map(|data| data.listeners_for(event))
            .unwrap_or_default()
    }

    /// Top-level nodes in insertion order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Number of nodes in the document, detached ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the document is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the document contains a node with the given id.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Structural mutation counters since creation or the last reset.
    pub fn stats(&self) -> DocumentStats {
        self.stats
    }

    /// Zero the mutation counters.
    pub fn reset_stats(&mut self) {
        self.stats = DocumentStats::default();
    }

    /// Pre-order depth-first traversal starting from `start`.
    pub fn walk_depth_first(&self, start: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(current) {
                continue;
            }
            result.push(current);
            // Push children in reverse so the first child is visited first.
            for &child in self.children_of(current).iter().rev() {
                stack.push(child);
            }
        }
        result
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Host binding
// ---------------------------------------------------------------------------

impl Host for Document {
    fn create_element(&mut self, tag: &str) -> HostHandle {
        self.stats.created += 1;
        self.insert_detached(NodeData::new(tag)).to_handle()
    }

    fn is_live(&self, handle: &HostHandle) -> bool {
        self.resolve(handle).is_some()
    }

    fn tag_of(&self, handle: &HostHandle) -> Option<String> {
        self.node(handle).map(|data| data.tag.clone())
    }

    fn parent(&self, handle: &HostHandle) -> Option<HostHandle> {
        self.resolve(handle)
            .and_then(|id| self.parent_of(id))
            .map(NodeId::to_handle)
    }

    fn children(&self, handle: &HostHandle) -> Vec<HostHandle> {
        self.resolve(handle)
            .map(|id| self.children_of(id).iter().map(|c| c.to_handle()).collect())
            .unwrap_or_default()
    }

    fn descendants(&self, handle: &HostHandle) -> Vec<HostHandle> {
        self.resolve(handle)
            .map(|id| {
                self.walk_depth_first(id)
                    .into_iter()
                    .map(NodeId::to_handle)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn insert_before(
        &mut self,
        parent: &HostHandle,
        child: &HostHandle,
        before: Option<&HostHandle>,
    ) -> Result<(), HostError> {
        let parent_id = self.resolve_or_err(parent)?;
        let child_id = self.resolve_or_err(child)?;
        if child_id == parent_id || self.ancestors(parent_id).contains(&child_id) {
            return Err(HostError::Cycle {
                parent: parent.clone(),
                child: child.clone(),
            });
        }
        let before_id = match before {
            Some(handle) => {
                let id = self.resolve_or_err(handle)?;
                if self.parent_of(id) != Some(parent_id) {
                    return Err(HostError::NotAChild {
                        parent: parent.clone(),
                        before: handle.clone(),
                    });
                }
                Some(id)
            }
            None => None,
        };
        if before_id == Some(child_id) {
            return Ok(());
        }

        self.detach(child_id);
        self.parent.insert(child_id, parent_id);
        if let Some(siblings) = self.children.get_mut(parent_id) {
            let position = before_id
                .and_then(|b| siblings.iter().position(|&c| c == b))
                .unwrap_or(siblings.len());
            siblings.insert(position, child_id);
        }
        self.stats.inserted += 1;
        Ok(())
    }

    fn remove(&mut self, handle: &HostHandle) -> Result<(), HostError> {
        let id = self.resolve_or_err(handle)?;
        self.remove_node(id);
        self.stats.removed += 1;
        Ok(())
    }

    fn attribute(&self, handle: &HostHandle, name: &str) -> Option<String> {
        self.node(handle).and_then(|data| data.attr(name).map(str::to_owned))
    }

    fn set_attribute(
        &mut self,
        handle: &HostHandle,
        name: &str,
        value: &str,
    ) -> Result<(), HostError> {
        let id = self.resolve_or_err(handle)?;
        if let Some(data) = self.nodes.get_mut(id) {
            data.attributes.insert(name.to_owned(), value.to_owned());
        }
        Ok(())
    }

    fn remove_attribute(&mut self, handle: &HostHandle, name: &str) -> Result<(), HostError> {
        let id = self.resolve_or_err(handle)?;
        if let Some(data) = self.nodes.get_mut(id) {
            data.attributes.remove(name);
        }
        Ok(())
    }

    fn set_text(&mut self, handle: &HostHandle, text: Option<&str>) -> Result<(), HostError> {
        let id = self.resolve_or_err(handle)?;
        if let Some(data) = self.nodes.get_mut(id) {
            data.text = text.map(str::to_owned);
        }
        Ok(())
    }

    fn add_listener(
        &mut self,
        handle: &HostHandle,
        event: &str,
        handler_id: &str,
    ) -> Result<(), HostError> {
        let id = self.resolve_or_err(handle)?;
        if let Some(data) = self.nodes.get_mut(id) {
            data.listeners.push((event.to_owned(), handler_id.to_owned()));
        }
        Ok(())
    }

    fn remove_listener(&mut self, handle: &HostHandle, event: &str, handler_id: &str) {
        if let Some(data) = self.resolve(handle).and_then(|id| self.nodes.get_mut(id)) {
            data.listeners
                .retain(|(kind, id)| !(kind == event && id == handler_id));
        }
    }

    fn find_root(&self, root_id: &str) -> Option<HostHandle> {
        self.query_by_attribute("id", root_id)
            .into_iter()
            .next()
            .map(NodeId::to_handle)
    }

    fn create_root(&mut self, root_id: &str) -> HostHandle {
        self.stats.created += 1;
        self.insert(NodeData::new("div").with_attr("id", root_id))
            .to_handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a small test tree:
    /// ```text
    ///       root
    ///      /    \
    ///    a        b
    ///   / \
    ///  c   d
    /// ```
    fn build_tree() -> (Document, NodeId, NodeId, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let root = doc.insert(NodeData::new("div").with_attr("id", "root"));
        let a = doc.insert_child(root, NodeData::new("ul"));
        let b = doc.insert_child(root, NodeData::new("p"));
        let c = doc.insert_child(a, NodeData::new("li"));
        let d = doc.insert_child(a, NodeData::new("li"));
        (doc, root, a, b, c, d)
    }

    #[test]
    fn insert_registers_root() {
        let (doc, root, ..) = build_tree();
        assert_eq!(doc.roots(), &[root]);
    }

    #[test]
    fn children_and_parent() {
        let (doc, root, a, b, c, d) = build_tree();
        assert_eq!(doc.children_of(root), &[a, b]);
        assert_eq!(doc.children_of(a), &[c, d]);
        assert_eq!(doc.parent_of(c), Some(a));
        assert_eq!(doc.parent_of(root), None);
        assert_eq!(doc.ancestors(c), vec![a, root]);
    }

    #[test]
    fn remove_subtree() {
        let (mut doc, root, a, b, c, d) = build_tree();
        doc.remove_node(a);
        assert!(!doc.contains(a));
        assert!(!doc.contains(c));
        assert!(!doc.contains(d));
        assert_eq!(doc.children_of(root), &[b]);
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn remove_root_clears_roots() {
        let (mut doc, root, ..) = build_tree();
        doc.remove_node(root);
        assert!(doc.is_empty());
        assert!(doc.roots().is_empty());
    }

    #[test]
    fn walk_depth_first() {
        let (doc, root, a, b, c, d) = build_tree();
        assert_eq!(doc.walk_depth_first(root), vec![root, a, c, d, b]);
    }

    #[test]
    fn descendants_in_document_order() {
        let (mut doc, _root, a, _b, c, d) = build_tree();
        let handle = a.to_handle();
        assert_eq!(
            doc.descendants(&handle),
            vec![handle.clone(), c.to_handle(), d.to_handle()]
        );
        doc.invalidate(&handle);
        assert!(doc.descendants(&handle).is_empty());
    }

    #[test]
    fn create_element_is_detached() {
        let mut doc = Document::new();
        let handle = doc.create_element("span");
        assert!(doc.is_live(&handle));
        assert_eq!(doc.parent(&handle), None);
        assert!(doc.roots().is_empty());
        assert_eq!(doc.stats().created, 1);
    }

    #[test]
    fn insert_before_appends_and_positions() {
        let (mut doc, _root, a, _b, c, d) = build_tree();
        let list = a.to_handle();
        let e = doc.create_element("li");
        doc.insert_before(&list, &e, Some(&c.to_handle())).unwrap();
        assert_eq!(doc.children(&list), vec![e.clone(), c.to_handle(), d.to_handle()]);

        let f = doc.create_element("li");
        doc.insert_before(&list, &f, None).unwrap();
        assert_eq!(doc.children(&list).last(), Some(&f));
        assert_eq!(doc.stats().inserted, 2);
    }

    #[test]
    fn insert_before_moves_existing_child() {
        let (mut doc, _root, a, _b, c, d) = build_tree();
        let list = a.to_handle();
        doc.insert_before(&list, &d.to_handle(), Some(&c.to_handle()))
            .unwrap();
        assert_eq!(doc.children_of(a), &[d, c]);
    }

    #[test]
    fn insert_before_rejects_cycles() {
        let (mut doc, root, a, ..) = build_tree();
        let err = doc
            .insert_before(&a.to_handle(), &root.to_handle(), None)
            .unwrap_err();
        assert!(matches!(err, HostError::Cycle { .. }));
    }

    #[test]
    fn insert_before_rejects_foreign_anchor() {
        let (mut doc, root, a, b, ..) = build_tree();
        let e = doc.create_element("li");
        let err = doc
            .insert_before(&a.to_handle(), &e, Some(&b.to_handle()))
            .unwrap_err();
        assert!(matches!(err, HostError::NotAChild { .. }));
        assert_eq!(doc.parent_of(b), Some(root));
    }

    #[test]
    fn stale_handle_after_remove() {
        let (mut doc, _root, a, ..) = build_tree();
        let handle = a.to_handle();
        doc.remove(&handle).unwrap();
        assert!(!doc.is_live(&handle));
        assert_eq!(
            doc.set_attribute(&handle, "class", "x"),
            Err(HostError::StaleHandle(handle.clone()))
        );
        assert_eq!(doc.stats().removed, 1);
    }

    #[test]
    fn invalidate_destroys_without_counting() {
        let (mut doc, _root, _a, b, ..) = build_tree();
        assert!(doc.invalidate(&b.to_handle()));
        assert!(!doc.contains(b));
        assert_eq!(doc.stats().removed, 0);
        assert!(!doc.invalidate(&b.to_handle()));
    }

    #[test]
    fn listeners_add_and_remove() {
        let (mut doc, _root, _a, b, ..) = build_tree();
        let handle = b.to_handle();
        doc.add_listener(&handle, "click", "cb-1").unwrap();
        doc.add_listener(&handle, "input", "cb-2").unwrap();
        assert_eq!(doc.listeners(&handle, "click"), vec!["cb-1".to_string()]);
        doc.remove_listener(&handle, "click", "cb-1");
        assert!(doc.listeners(&handle, "click").is_empty());
        assert_eq!(doc.listeners(&handle, "input").len(), 1);
    }

    #[test]
    fn find_and_create_root() {
        let (mut doc, root, ..) = build_tree();
        assert_eq!(doc.find_root("root"), Some(root.to_handle()));
        assert_eq!(doc.find_root("app"), None);
        let app = doc.create_root("app");
        assert_eq!(doc.find_root("app"), Some(app));
        assert_eq!(doc.roots().len(), 2);
    }

    #[test]
    fn text_and_attributes() {
        let (mut doc, _root, _a, b, ..) = build_tree();
        let handle = b.to_handle();
        doc.set_text(&handle, Some("hello")).unwrap();
        doc.set_attribute(&handle, "class", "intro").unwrap();
        assert_eq!(doc.node(&handle).unwrap().text.as_deref(), Some("hello"));
        assert_eq!(doc.attribute(&handle, "class").as_deref(), Some("intro"));
        doc.remove_attribute(&handle, "class").unwrap();
        assert_eq!(doc.attribute(&handle, "class"), None);
    }
}
