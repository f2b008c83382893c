//! Hydration: adopting server-rendered markup and restoring serialized state.

pub mod adopter;
pub mod snapshot;

pub use adopter::{Adopter, HydrationPhase, PendingListener};
pub use snapshot::{HydrationSnapshot, SharedSnapshot, KEY_SEPARATOR};

use crate::compose::{PassReport, StableId};

/// Errors that make hydration fall back to a fresh render.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HydrationError {
    #[error("hydration root `{0}` not found")]
    MissingRoot(String),
    #[error("malformed hydration snapshot: {0}")]
    MalformedSnapshot(String),
    #[error("snapshot value for `{key}` is not a JSON primitive")]
    NonPrimitive { key: String },
}

/// How a call to [`Renderer::hydrate`](crate::renderer::Renderer::hydrate) ended.
#[derive(Debug)]
pub enum HydrationOutcome {
    /// The pre-rendered tree was adopted.
    Adopted {
        /// Ids resolved to pre-rendered nodes.
        adopted: Vec<StableId>,
        /// Listeners bound at completion.
        listeners: usize,
        pass: PassReport,
    },
    /// Scanning or restoring failed; a fresh pass rendered the root instead.
    FellBack {
        reason: HydrationError,
        pass: PassReport,
    },
    /// The root was already hydrated or mounted; nothing happened.
    AlreadyHydrated,
}
