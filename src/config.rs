//! Renderer configuration.

use std::time::Duration;

// ---------------------------------------------------------------------------
// RendererConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`Renderer`](crate::renderer::Renderer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererConfig {
    /// `id` attribute of the root container.
    pub root_id: String,
    /// Attribute carrying a node's stable id in pre-rendered markup.
    pub id_attribute: String,
    /// Attribute set on the root once hydration completes.
    pub hydrated_attribute: String,
    /// Delay between a recomposition request and its frame, for timer clocks.
    pub frame_interval: Duration,
    /// Write `id_attribute` on nodes the renderer creates.
    pub mark_nodes: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            root_id: "root".to_owned(),
            id_attribute: "data-summon-id".to_owned(),
            hydrated_attribute: "data-summon-hydrated".to_owned(),
            frame_interval: Duration::from_millis(16),
            mark_nodes: true,
        }
    }
}

impl RendererConfig {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root container id (builder).
    pub fn with_root_id(mut self, root_id: impl Into<String>) -> Self {
        self.root_id = root_id.into();
        self
    }

    /// Set the stable-id attribute (builder).
    pub fn with_id_attribute(mut self, name: impl Into<String>) -> Self {
        self.id_attribute = name.into();
        self
    }

    /// Set the hydrated-marker attribute (builder).
    pub fn with_hydrated_attribute(mut self, name: impl Into<String>) -> Self {
        self.hydrated_attribute = name.into();
        self
    }

    /// Set the frame interval (builder).
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Toggle writing stable ids onto created nodes (builder).
    pub fn with_mark_nodes(mut self, mark: bool) -> Self {
        self.mark_nodes = mark;
        self
    }
}
