//! Stable node identity.

use std::borrow::Borrow;
use std::fmt;

/// Identity of one declared node's position in the UI graph.
///
/// The only cache key the renderer uses: two declarations with the same
/// `StableId` in consecutive passes map to the same host node, whatever their
/// content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StableId(String);

impl StableId {
    /// Wrap an explicit id.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Structural id for the `ordinal`-th child declared under `parent`.
    pub fn structural(parent: &StableId, ordinal: usize, tag: &str) -> Self {
        Self(format!("{}/{}:{}", parent.0, ordinal, tag))
    }

    /// The raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StableId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for StableId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl Borrow<str> for StableId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
