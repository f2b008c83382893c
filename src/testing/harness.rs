//! Harness: programmatic interaction with a headless renderer.
//!
//! The `Harness` wraps a [`Renderer`] over an in-memory [`Document`] and a
//! [`ManualFrameClock`], and provides methods to simulate host events, reach
//! frame boundaries, and inspect the resulting document.

use crate::callback::HandlerId;
use crate::compose::{Content, PassReport};
use crate::config::RendererConfig;
use crate::dom::{Document, DocumentStats, MarkupError};
use crate::hydrate::HydrationOutcome;
use crate::renderer::Renderer;
use crate::schedule::ManualFrameClock;

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A headless renderer driver for testing.
///
/// # Examples
///
/// ```ignore
/// use summon::compose::{content, NodeSpec};
/// use summon::testing::Harness;
///
/// let mut harness = Harness::new();
/// harness.mount(content(|c| {
///     c.leaf(NodeSpec::new("p").id("msg").text("hi"));
///     Ok(())
/// }));
/// assert_eq!(harness.text_of("msg").as_deref(), Some("hi"));
/// ```
pub struct Harness {
    renderer: Renderer<Document>,
    clock: ManualFrameClock,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    /// Harness over an empty document with the default config.
    pub fn new() -> Self {
        Self::with_document(Document::new(), RendererConfig::default())
    }

    /// Harness over an empty document.
    pub fn with_config(config: RendererConfig) -> Self {
        Self::with_document(Document::new(), config)
    }

    /// Harness over a document parsed from pre-rendered markup.
    pub fn from_markup(markup: &str) -> Result<Self, MarkupError> {
        Ok(Self::with_document(
            Document::from_markup(markup)?,
            RendererConfig::default(),
        ))
    }

    pub fn with_document(doc: Document, config: RendererConfig) -> Self {
        let clock = ManualFrameClock::new();
        Self {
            renderer: Renderer::new(doc, clock.clone(), config),
            clock,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    pub fn mount(&mut self, content: Content) -> PassReport {
        self.renderer.mount(content)
    }

    pub fn hydrate(&mut self, content: Content, blob: Option<&str>) -> HydrationOutcome {
        self.renderer.hydrate(content, blob)
    }

    // ── Event simulation ─────────────────────────────────────────────

    /// Simulate a click on the node retained for `id`.
    pub fn click(&mut self, id: &str) -> bool {
        self.fire(id, "click")
    }

    /// Deliver `event` to every native listener on the node retained for
    /// `id`, the way a host would. Returns whether any handler ran.
    pub fn fire(&mut self, id: &str, event: &str) -> bool {
        let Some(handle) = self.renderer.handle_of(id) else {
            return false;
        };
        let listeners = self.renderer.host().listeners(&handle, event);
        let mut handled = false;
        for raw in listeners {
            handled |= self.renderer.dispatch(&HandlerId::new(raw));
        }
        handled
    }

    // ── Frames ───────────────────────────────────────────────────────

    /// Reach a frame boundary. Returns the report of the pass it ran, if any.
    pub fn advance_frame(&mut self) -> Option<PassReport> {
        let mut last = None;
        for token in self.clock.fire() {
            if let Some(report) = self.renderer.on_frame(token) {
                last = Some(report);
            }
        }
        last
    }

    /// Advance frames until nothing is pending. Returns the passes run.
    ///
    /// Stops after `limit` frames so a pass that keeps invalidating itself
    /// cannot hang a test.
    pub fn settle(&mut self, limit: usize) -> usize {
        let mut passes = 0;
        for _ in 0..limit {
            if !self.renderer.is_pending() {
                break;
            }
            if self.advance_frame().is_some() {
                passes += 1;
            }
        }
        passes
    }

    /// Frame requests neither fired nor cancelled.
    pub fn pending_frames(&self) -> usize {
        self.clock.live_count()
    }

    // ── Query ────────────────────────────────────────────────────────

    pub fn renderer(&self) -> &Renderer<Document> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer<Document> {
        &mut self.renderer
    }

    pub fn document(&self) -> &Document {
        self.renderer.host()
    }

    pub fn clock(&self) -> &ManualFrameClock {
        &self.clock
    }

    /// Text content of the node retained for `id`.
    pub fn text_of(&self, id: &str) -> Option<String> {
        let handle = self.renderer.handle_of(id)?;
        self.document().node(&handle)?.text.clone()
    }

    /// Markup of the root container.
    pub fn markup(&self) -> String {
        super::snapshot::root_markup(&self.renderer)
    }

    /// Indented outline of the root container.
    pub fn outline(&self) -> String {
        match self.renderer.root() {
            Some(root) => super::snapshot::outline(
                self.document(),
                root,
                &self.renderer.config().id_attribute,
            ),
            None => String::new(),
        }
    }

    pub fn stats(&self) -> DocumentStats {
        self.document().stats()
    }

    pub fn reset_stats(&mut self) {
        self.renderer.host_mut().reset_stats();
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{content, NodeSpec};
    use std::cell::Cell;
    use std::rc::Rc;

    fn clicker(count: Rc<Cell<u32>>) -> Content {
        content(move |c| {
            let count = Rc::clone(&count);
            c.leaf(
                NodeSpec::new("button")
                    .id("btn")
                    .on("click", move || count.set(count.get() + 1)),
            );
            Ok(())
        })
    }

    #[test]
    fn click_runs_bound_handler() {
        let count = Rc::new(Cell::new(0));
        let mut harness = Harness::new();
        harness.mount(clicker(Rc::clone(&count)));
        assert!(harness.click("btn"));
        assert!(harness.click("btn"));
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn click_on_unknown_id_is_false() {
        let mut harness = Harness::new();
        harness.mount(clicker(Rc::new(Cell::new(0))));
        assert!(!harness.click("nope"));
        assert!(!harness.fire("btn", "keydown"));
    }

    #[test]
    fn advance_frame_without_request_runs_nothing() {
        let mut harness = Harness::new();
        harness.mount(clicker(Rc::new(Cell::new(0))));
        assert_eq!(harness.pending_frames(), 0);
        assert!(harness.advance_frame().is_none());
        assert_eq!(harness.settle(10), 0);
    }

    #[test]
    fn outline_of_mounted_root() {
        let mut harness = Harness::new();
        harness.mount(clicker(Rc::new(Cell::new(0))));
        insta::assert_snapshot!(harness.outline(), @r#"
        div
          button#btn [click]
        "#);
    }
}
