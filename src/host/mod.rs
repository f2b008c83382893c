//! Host seam: the low-level document-binding layer the renderer drives.
//!
//! The renderer never holds live host objects. Every node is referred to by an
//! opaque [`HostHandle`] string, and every event listener by an opaque
//! [`HandlerId`](crate::callback::HandlerId) string. The in-memory
//! [`Document`](crate::dom::Document) is the reference implementation.

use std::fmt;

// ---------------------------------------------------------------------------
// HostHandle
// ---------------------------------------------------------------------------

/// Opaque identifier of a real host document node.
///
/// Only the [`Host`] implementation that produced it can interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostHandle(String);

impl HostHandle {
    /// Wrap a raw handle string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw handle string, as handed across the boundary.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// HostError
// ---------------------------------------------------------------------------

/// Errors reported by a [`Host`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The handle no longer resolves to a live node.
    #[error("stale host handle `{0}`")]
    StaleHandle(HostHandle),
    /// The handle was never produced by this host.
    #[error("unknown host handle `{0}`")]
    UnknownHandle(HostHandle),
    /// A structural operation would make a node its own ancestor.
    #[error("cannot insert `{child}` under its own descendant `{parent}`")]
    Cycle {
        parent: HostHandle,
        child: HostHandle,
    },
    /// `before` is not a child of `parent`.
    #[error("`{before}` is not a child of `{parent}`")]
    NotAChild {
        parent: HostHandle,
        before: HostHandle,
    },
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

/// Operations the renderer needs from a host document.
///
/// All access is serialized: the renderer calls into the host from exactly one
/// pass or handler at a time.
pub trait Host {
    /// Create a detached element of the given tag kind.
    fn create_element(&mut self, tag: &str) -> HostHandle;

    /// Whether `handle` still refers to a live node.
    fn is_live(&self, handle: &HostHandle) -> bool;

    /// Tag kind of a live node.
    fn tag_of(&self, handle: &HostHandle) -> Option<String>;

    /// Parent of a live node, if attached.
    fn parent(&self, handle: &HostHandle) -> Option<HostHandle>;

    /// Children of a live node in document order. Empty for stale handles.
    fn children(&self, handle: &HostHandle) -> Vec<HostHandle>;

    /// `handle` and every node below it, in pre-order document order. Empty
    /// for stale handles.
    fn descendants(&self, handle: &HostHandle) -> Vec<HostHandle> {
        if !self.is_live(handle) {
            return Vec::new();
        }
        let mut found = Vec::new();
        let mut stack = vec![handle.clone()];
        while let Some(current) = stack.pop() {
            stack.extend(self.children(&current).into_iter().rev());
            found.push(current);
        }
        found
    }

    /// Insert `child` under `parent` before `before` (append when `None`).
    ///
    /// An already attached child is moved.
    fn insert_before(
        &mut self,
        parent: &HostHandle,
        child: &HostHandle,
        before: Option<&HostHandle>,
    ) -> Result<(), HostError>;

    /// Detach and destroy `handle` and its whole subtree.
    fn remove(&mut self, handle: &HostHandle) -> Result<(), HostError>;

    /// Read an attribute.
    fn attribute(&self, handle: &HostHandle, name: &str) -> Option<String>;

    /// Set (or overwrite) an attribute.
    fn set_attribute(&mut self, handle: &HostHandle, name: &str, value: &str)
        -> Result<(), HostError>;

    /// Remove an attribute. Removing an absent attribute is not an error.
    fn remove_attribute(&mut self, handle: &HostHandle, name: &str) -> Result<(), HostError>;

    /// Replace the node's text content.
    fn set_text(&mut self, handle: &HostHandle, text: Option<&str>) -> Result<(), HostError>;

    /// Register a native listener that carries only `handler_id`.
    fn add_listener(
        &mut self,
        handle: &HostHandle,
        event: &str,
        handler_id: &str,
    ) -> Result<(), HostError>;

    /// Remove a native listener. Removing an absent listener is not an error.
    fn remove_listener(&mut self, handle: &HostHandle, event: &str, handler_id: &str);

    /// Find a root container by its `id` attribute.
    fn find_root(&self, root_id: &str) -> Option<HostHandle>;

    /// Create a new top-level root container carrying `id = root_id`.
    fn create_root(&mut self, root_id: &str) -> HostHandle;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_display_is_raw() {
        let handle = HostHandle::new("n42");
        assert_eq!(handle.to_string(), "n42");
        assert_eq!(handle.as_str(), "n42");
    }

    #[test]
    fn host_error_messages() {
        let err = HostError::StaleHandle(HostHandle::new("n1"));
        assert_eq!(err.to_string(), "stale host handle `n1`");
        let err = HostError::NotAChild {
            parent: HostHandle::new("n1"),
            before: HostHandle::new("n2"),
        };
        assert_eq!(err.to_string(), "`n2` is not a child of `n1`");
    }
}
