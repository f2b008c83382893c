//! Composition: stable identity, declared nodes, and evaluation passes.
//!
//! Content is a closure over a [`Composer`]. Each pass walks it from the root
//! container, resolving every declared node through the reconciler and
//! pruning whatever the previous pass produced but this one did not.

pub mod composer;
pub mod frame;
pub mod id;
pub mod node;
pub mod recomposer;

use std::rc::Rc;

pub use composer::{Composer, NodeFailure};
pub use frame::ContainerFrame;
pub use id::StableId;
pub use node::NodeSpec;
pub use recomposer::{PassPhase, PassReport, Recomposer};

use crate::host::HostError;

/// Root content of a renderer, re-evaluated on every pass.
pub type Content = Rc<dyn Fn(&mut Composer<'_>) -> Result<(), ComposeError>>;

/// Wrap a closure as [`Content`].
pub fn content<F>(f: F) -> Content
where
    F: Fn(&mut Composer<'_>) -> Result<(), ComposeError> + 'static,
{
    Rc::new(f)
}

/// Why a node's block did not complete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComposeError {
    /// The block returned an error of its own.
    #[error("{0}")]
    Failed(String),
    /// The block panicked.
    #[error("panicked: {0}")]
    Panicked(String),
    /// Remembered state was requested with a different type than it holds.
    #[error("state `{component_id}::{key}` was remembered with a different type")]
    StateType { component_id: String, key: String },
    #[error(transparent)]
    Host(#[from] HostError),
}

impl ComposeError {
    /// A [`ComposeError::Failed`] with the given message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}
