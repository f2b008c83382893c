//! Declared nodes: what the component layer hands to `declareNode`.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use super::id::StableId;
use crate::callback::Callback;

/// One declared UI element for the current pass.
///
/// Built with a chain of builder calls, then passed to
/// [`Composer::node`](super::Composer::node) or [`Composer::leaf`](super::Composer::leaf).
#[derive(Clone)]
pub struct NodeSpec {
    /// Tag kind of the host node.
    pub tag: String,
    /// Explicit identity. Derived from position when absent.
    pub id: Option<StableId>,
    /// Declared attributes.
    pub attributes: BTreeMap<String, String>,
    /// Declared text content.
    pub text: Option<String>,
    /// Declared event handlers, one per event kind.
    pub handlers: Vec<(String, Callback)>,
}

impl NodeSpec {
    /// Declare a node of the given tag kind.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: None,
            attributes: BTreeMap::new(),
            text: None,
            handlers: Vec::new(),
        }
    }

    /// Give the node an explicit stable id (builder).
    pub fn id(mut self, id: impl Into<StableId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set an attribute (builder).
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the text content (builder).
    pub fn text(mut self, text: impl ToString) -> Self {
        self.text = Some(text.to_string());
        self
    }

    /// Attach a handler for `event` (builder).
    ///
    /// A later handler for the same event kind replaces the earlier one.
    pub fn on(mut self, event: impl Into<String>, handler: impl Fn() + 'static) -> Self {
        let event = event.into();
        self.handlers.retain(|(kind, _)| kind != &event);
        self.handlers.push((event, Rc::new(handler)));
        self
    }
}

impl fmt::Debug for NodeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let events: Vec<&str> = self.handlers.iter().map(|(e, _)| e.as_str()).collect();
        f.debug_struct("NodeSpec")
            .field("tag", &self.tag)
            .field("id", &self.id)
            .field("attributes", &self.attributes)
            .field("text", &self.text)
            .field("handlers", &events)
            .finish()
    }
}
