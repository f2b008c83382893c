//! Snapshot rendering helpers.
//!
//! Functions for turning a document subtree into plain text for snapshot
//! testing and assertions.

use std::fmt::Write;

use crate::dom::{Document, NodeId};
use crate::host::HostHandle;
use crate::renderer::Renderer;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Serialized markup of a renderer's root container. Empty before mounting.
pub fn root_markup(renderer: &Renderer<Document>) -> String {
    renderer
        .root()
        .and_then(|root| renderer.host().resolve(root))
        .map(|root| renderer.host().to_markup(root))
        .unwrap_or_default()
}

/// Indented outline of the subtree at `handle`.
///
/// One node per line: the tag, `#id` when the node carries `id_attribute`,
/// the quoted text, and bound event kinds in brackets.
///
/// ```text
/// div
///   ul#list
///     li#row-1 "one" [click]
/// ```
pub fn outline(doc: &Document, handle: &HostHandle, id_attribute: &str) -> String {
    let mut out = String::new();
    if let Some(start) = doc.resolve(handle) {
        write_outline(doc, start, id_attribute, 0, &mut out);
    }
    out.truncate(out.trim_end().len());
    out
}

fn write_outline(doc: &Document, id: NodeId, id_attribute: &str, depth: usize, out: &mut String) {
    let Some(data) = doc.get(id) else {
        return;
    };
    out.push_str(&"  ".repeat(depth));
    out.push_str(&data.tag);
    if let Some(stable) = data.attr(id_attribute) {
        let _ = write!(out, "#{stable}");
    }
    if let Some(text) = &data.text {
        let _ = write!(out, " {text:?}");
    }
    if !data.listeners.is_empty() {
        let mut events: Vec<&str> = data.listeners.iter().map(|(kind, _)| kind.as_str()).collect();
        events.sort_unstable();
        events.dedup();
        let _ = write!(out, " [{}]", events.join(", "));
    }
    out.push('\n');
    for &child in doc.children_of(id) {
        write_outline(doc, child, id_attribute, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeData;
    use crate::host::Host;

    #[test]
    fn outline_shows_ids_text_and_events() {
        let mut doc = Document::new();
        let root = doc.insert(NodeData::new("div"));
        let list = doc.insert_child(root, NodeData::new("ul").with_attr("data-summon-id", "list"));
        let row = doc.insert_child(
            list,
            NodeData::new("li")
                .with_attr("data-summon-id", "row-1")
                .with_text("one"),
        );
        doc.add_listener(&row.to_handle(), "click", "cb-1").unwrap();

        insta::assert_snapshot!(outline(&doc, &root.to_handle(), "data-summon-id"), @r#"
        div
          ul#list
            li#row-1 "one" [click]
        "#);
    }

    #[test]
    fn outline_of_stale_handle_is_empty() {
        let doc = Document::new();
        assert_eq!(outline(&doc, &HostHandle::new("n999"), "data-summon-id"), "");
    }
}
