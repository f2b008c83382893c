//! Container frames: the per-container scope of one pass.

use super::id::StableId;
use super::node::NodeSpec;
use crate::host::HostHandle;

/// A completed node's declared state, waiting for its ancestors to succeed.
#[derive(Debug, Clone)]
pub(crate) struct Patch {
    pub id: StableId,
    pub handle: HostHandle,
    pub spec: NodeSpec,
}

/// A completed container whose children become exactly `expected` at commit.
#[derive(Debug, Clone)]
pub(crate) struct Arrangement {
    pub id: StableId,
    pub handle: HostHandle,
    pub expected: Vec<StableId>,
}

/// Host changes held back until every enclosing scope has succeeded.
#[derive(Debug, Clone, Default)]
pub(crate) struct Staged {
    pub patches: Vec<Patch>,
    pub arrangements: Vec<Arrangement>,
}

impl Staged {
    /// Take over a completed child's changes, after the child's own patch.
    pub fn absorb(&mut self, patch: Patch, child: Staged) {
        self.patches.push(patch);
        self.patches.extend(child.patches);
        self.arrangements.extend(child.arrangements);
    }
}

/// Stack entry active while a container's children are being declared.
#[derive(Debug, Clone)]
pub struct ContainerFrame {
    /// Identity of the container itself.
    pub id: StableId,
    /// Host node the children go into.
    pub handle: HostHandle,
    /// Children declared so far, in order.
    pub expected: Vec<StableId>,
    /// Position counter for structural ids.
    next_ordinal: usize,
    /// Length of the pass's touched log when this frame was pushed.
    pub(crate) touched_mark: usize,
    /// Changes of completed descendants, committed with this frame.
    pub(crate) staged: Staged,
}

impl ContainerFrame {
    pub fn new(id: StableId, handle: HostHandle) -> Self {
        Self {
            id,
            handle,
            expected: Vec::new(),
            next_ordinal: 0,
            touched_mark: 0,
            staged: Staged::default(),
        }
    }

    pub(crate) fn with_mark(mut self, mark: usize) -> Self {
        self.touched_mark = mark;
        self
    }

    /// Claim the next child position.
    pub fn next_ordinal(&mut self) -> usize {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        ordinal
    }

    /// Close a successful frame: its descendants' changes plus its own
    /// arrangement, innermost first.
    pub(crate) fn into_staged(self) -> Staged {
        let mut staged = self.staged;
        staged.arrangements.push(Arrangement {
            id: self.id,
            handle: self.handle,
            expected: self.expected,
        });
        staged
    }

    /// Record a declared child. Duplicates are ignored.
    pub fn expect(&mut self, id: StableId) -> bool {
        if self.expected.contains(&id) {
            return false;
        }
        self.expected.push(id);
        true
    }
}
