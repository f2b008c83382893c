//! Node types: NodeId, NodeData.

use std::collections::BTreeMap;

use slotmap::{new_key_type, Key, KeyData};

use crate::host::HostHandle;

new_key_type! {
    /// Arena key for a document node. Copy, lightweight (u64).
    pub struct NodeId;
}

impl NodeId {
    /// Encode this key as an opaque host handle.
    ///
    /// The encoding includes the slot version, so a handle to a destroyed node
    /// never resolves to a node created later in the same slot.
    pub fn to_handle(self) -> HostHandle {
        HostHandle::new(format!("n{}", self.data().as_ffi()))
    }

    /// Decode a handle produced by [`to_handle`](Self::to_handle).
    pub fn from_handle(handle: &HostHandle) -> Option<Self> {
        let raw = handle.as_str().strip_prefix('n')?;
        let ffi = raw.parse::<u64>().ok()?;
        Some(KeyData::from_ffi(ffi).into())
    }
}

/// Data associated with a single document node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeData {
    /// Tag kind (e.g. "div", "button").
    pub tag: String,
    /// Attributes, kept sorted for deterministic serialization.
    pub attributes: BTreeMap<String, String>,
    /// Text content rendered before any children.
    pub text: Option<String>,
    /// Native listeners: `(event kind, handler id)`.
    pub listeners: Vec<(String, String)>,
}

impl NodeData {
    /// Create a new element with no attributes, text, or listeners.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Set an attribute (builder).
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the text content (builder).
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Read an attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Handler ids listening for `event`, in registration order.
    pub fn listeners_for(&self, event: &str) -> Vec<String> {
        self.listeners
            .iter()
            .filter(|(kind, _)| kind == event)
            .map(|(_, id)| id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn new_defaults() {
        let data = NodeData::new("button");
        assert_eq!(data.tag, "button");
        assert!(data.attributes.is_empty());
        assert!(data.text.is_none());
        assert!(data.listeners.is_empty());
    }

    #[test]
    fn builder_attr_and_text() {
        let data = NodeData::new("span").with_attr("class", "count").with_text("0");
        assert_eq!(data.attr("class"), Some("count"));
        assert_eq!(data.text.as_deref(), Some("0"));
        assert_eq!(data.attr("missing"), None);
    }

    #[test]
    fn listeners_for_filters_by_event() {
        let mut data = NodeData::new("button");
        data.listeners.push(("click".into(), "cb-1".into()));
        data.listeners.push(("input".into(), "cb-2".into()));
        assert_eq!(data.listeners_for("click"), vec!["cb-1".to_string()]);
        assert!(data.listeners_for("keydown").is_empty());
    }

    #[test]
    fn handle_round_trip() {
        let mut sm: SlotMap<NodeId, ()> = SlotMap::with_key();
        let id = sm.insert(());
        let handle = id.to_handle();
        assert!(handle.as_str().starts_with('n'));
        assert_eq!(NodeId::from_handle(&handle), Some(id));
    }

    #[test]
    fn reused_slot_gets_distinct_handle() {
        let mut sm: SlotMap<NodeId, ()> = SlotMap::with_key();
        let first = sm.insert(());
        sm.remove(first);
        let second = sm.insert(());
        assert_ne!(first.to_handle(), second.to_handle());
        assert!(!sm.contains_key(NodeId::from_handle(&first.to_handle()).unwrap()));
    }

    #[test]
    fn malformed_handles_do_not_decode() {
        assert_eq!(NodeId::from_handle(&HostHandle::new("x12")), None);
        assert_eq!(NodeId::from_handle(&HostHandle::new("nabc")), None);
    }

    #[test]
    fn node_id_is_copy() {
        fn assert_copy<T: Copy>() {}
        assert_copy::<NodeId>();
    }
}
