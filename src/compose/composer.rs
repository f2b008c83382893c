//! The composer: one evaluation pass over the declared UI graph.
//!
//! Content calls [`Composer::node`] once per declared element. Each node is
//! resolved through the reconciler, recorded in its enclosing
//! [`ContainerFrame`], and its children are evaluated inside a frame of its
//! own. Every node is an error boundary: a failing block leaves the node's
//! previous host state in place and siblings carry on.
//!
//! Attribute, text, and handler changes are queued as patches in the
//! enclosing frame, and so is each container's arrangement (its expected
//! children). A frame hands both to its parent only when its block succeeds,
//! and the root's are committed once the whole pass has been evaluated, so
//! nothing inside a failed scope reaches the host.

use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, trace, warn};

use super::frame::{ContainerFrame, Patch, Staged};
use super::id::StableId;
use super::node::NodeSpec;
use super::ComposeError;
use crate::callback::{self, CallbackRegistry};
use crate::host::Host;
use crate::hydrate::PendingListener;
use crate::reconcile::Reconciler;
use crate::state::{MutableState, StateTable};

/// Everything a pass mutates, borrowed from the renderer for its duration.
pub(crate) struct PassContext<'a> {
    pub host: &'a mut dyn Host,
    pub reconciler: &'a mut Reconciler,
    pub registry: &'a mut CallbackRegistry,
    pub states: &'a mut StateTable,
}

/// How declared handlers reach the registry.
pub(crate) enum ListenerMode {
    /// Bound as each node completes.
    Immediate,
    /// Queued until hydration completes.
    Deferred(Vec<PendingListener>),
}

/// A node whose block failed during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFailure {
    pub id: StableId,
    pub error: ComposeError,
}

/// Bookkeeping handed back to the recomposer when a pass ends.
pub(crate) struct ComposeOutcome {
    pub touched: HashSet<StableId>,
    pub created: usize,
    pub reused: usize,
    pub pruned: Vec<StableId>,
    pub failures: Vec<NodeFailure>,
    pub pending: Vec<PendingListener>,
}

/// Scope handed to content during a pass.
pub struct Composer<'a> {
    ctx: PassContext<'a>,
    frames: Vec<ContainerFrame>,
    touched: HashSet<StableId>,
    /// Touched ids in declaration order; frames remember where they started.
    touched_log: Vec<StableId>,
    created: HashSet<StableId>,
    created_count: usize,
    reused: usize,
    pruned: Vec<StableId>,
    failures: Vec<NodeFailure>,
    /// Changes staged by the root frame, once it has succeeded.
    committed: Staged,
    listeners: ListenerMode,
}

impl<'a> Composer<'a> {
    pub(crate) fn new(ctx: PassContext<'a>, listeners: ListenerMode) -> Self {
        Self {
            ctx,
            frames: Vec::new(),
            touched: HashSet::new(),
            touched_log: Vec::new(),
            created: HashSet::new(),
            created_count: 0,
            reused: 0,
            pruned: Vec::new(),
            failures: Vec::new(),
            committed: Staged::default(),
            listeners,
        }
    }

    // ── Declaration API ──────────────────────────────────────────────

    /// `declareNode`: declare one element and evaluate its children.
    pub fn node(
        &mut self,
        spec: NodeSpec,
        children: impl FnOnce(&mut Composer<'a>) -> Result<(), ComposeError>,
    ) {
        let Some(parent) = self.frames.last_mut() else {
            error!(tag = %spec.tag, "node declared outside of a pass");
            return;
        };
        let ordinal = parent.next_ordinal();
        let id = spec
            .id
            .clone()
            .unwrap_or_else(|| StableId::structural(&parent.id, ordinal, &spec.tag));
        let container = parent.handle.clone();

        if self.touched.contains(&id) {
            warn!(%id, "stable id declared twice in one pass, ignoring the repeat");
            return;
        }

        let resolution = self.ctx.reconciler.resolve(
            &mut *self.ctx.host,
            &mut *self.ctx.registry,
            &id,
            &spec.tag,
        );
        let handle = resolution.handle().clone();
        if resolution.is_new() {
            self.created.insert(id.clone());
            self.created_count += 1;
            if let Err(err) =
                self.ctx
                    .reconciler
                    .attach(&mut *self.ctx.host, &container, &handle, &id)
            {
                warn!(%id, %err, "failed to attach node");
            }
        } else {
            self.reused += 1;
        }
        self.mark_touched(&id);
        if let Some(parent) = self.frames.last_mut() {
            parent.expect(id.clone());
        }

        let frame = ContainerFrame::new(id.clone(), handle.clone());
        if let Some(staged) = self.evaluate_scope(frame, children) {
            if let Some(parent) = self.frames.last_mut() {
                parent.staged.absorb(Patch { id, handle, spec }, staged);
            }
        }
    }

    /// Declare an element without children.
    pub fn leaf(&mut self, spec: NodeSpec) {
        self.node(spec, |_| Ok(()));
    }

    /// Remembered state for `(component_id, key)`.
    pub fn remember<T>(
        &mut self,
        component_id: &str,
        key: &str,
        init: impl FnOnce() -> T,
    ) -> Result<MutableState<T>, ComposeError>
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        self.ctx.states.remember(component_id, key, init)
    }

    /// Identity of the container currently receiving children.
    pub fn current_container(&self) -> Option<&StableId> {
        self.frames.last().map(|frame| &frame.id)
    }

    /// Number of open container frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    // ── Pass driving ─────────────────────────────────────────────────

    /// Evaluate the root container. Returns whether its content succeeded.
    pub(crate) fn run_root(
        &mut self,
        root: ContainerFrame,
        content: impl FnOnce(&mut Composer<'a>) -> Result<(), ComposeError>,
    ) -> bool {
        match self.evaluate_scope(root, content) {
            Some(staged) => {
                self.committed = staged;
                true
            }
            None => false,
        }
    }

    /// Write every committed change to the host.
    ///
    /// All containers are placed before any is pruned, so a node declared
    /// under a new container is moved there rather than pruned with its old
    /// one.
    pub(crate) fn commit(&mut self) {
        let Staged {
            patches,
            arrangements,
        } = std::mem::take(&mut self.committed);

        for arrangement in &arrangements {
            if let Err(err) = self.ctx.reconciler.place_children(
                &mut *self.ctx.host,
                &arrangement.handle,
                &arrangement.expected,
            ) {
                warn!(id = %arrangement.id, %err, "container reconciliation failed");
            }
        }
        for arrangement in &arrangements {
            let pruned = self.ctx.reconciler.prune_unexpected(
                &mut *self.ctx.host,
                &mut *self.ctx.registry,
                &arrangement.handle,
                &arrangement.expected,
            );
            self.pruned.extend(pruned);
        }
        for patch in patches {
            self.apply(patch);
        }
    }

    /// Prune every id of `previous` this pass did not touch.
    pub(crate) fn prune_absent(&mut self, previous: &HashSet<StableId>) {
        let mut absent: Vec<&StableId> = previous.difference(&self.touched).collect();
        absent.sort();
        for id in absent {
            if self.ctx.reconciler.cache().contains(id) {
                trace!(%id, "force-pruning orphaned node");
                let evicted = self.ctx.reconciler.prune_id(
                    &mut *self.ctx.host,
                    &mut *self.ctx.registry,
                    id,
                );
                self.pruned.extend(evicted);
            }
        }
    }

    pub(crate) fn finish(self) -> ComposeOutcome {
        let pending = match self.listeners {
            ListenerMode::Immediate => Vec::new(),
            ListenerMode::Deferred(queue) => queue,
        };
        ComposeOutcome {
            touched: self.touched,
            created: self.created_count,
            reused: self.reused,
            pruned: self.pruned,
            failures: self.failures,
            pending,
        }
    }

    // ── Internals ────────────────────────────────────────────────────

    fn mark_touched(&mut self, id: &StableId) {
        if self.touched.insert(id.clone()) {
            self.touched_log.push(id.clone());
        }
    }

    /// Run `block` inside `frame`.
    ///
    /// Returns the frame's staged changes, or `None` when the block failed;
    /// the container is then left as it was.
    fn evaluate_scope(
        &mut self,
        frame: ContainerFrame,
        block: impl FnOnce(&mut Composer<'a>) -> Result<(), ComposeError>,
    ) -> Option<Staged> {
        let depth = self.frames.len();
        let mark = self.touched_log.len();
        self.frames.push(frame.with_mark(mark));

        let result = panic::catch_unwind(AssertUnwindSafe(|| block(&mut *self)))
            .unwrap_or_else(|payload| Err(ComposeError::Panicked(panic_message(&*payload))));

        self.frames.truncate(depth + 1);
        let frame = self.frames.pop()?;

        match result {
            Ok(()) => Some(frame.into_staged()),
            Err(err) => {
                error!(id = %frame.id, error = %err, "node evaluation failed, keeping previous state");
                self.roll_back(&frame);
                self.failures.push(NodeFailure {
                    id: frame.id,
                    error: err,
                });
                None
            }
        }
    }

    /// Undo what a failed scope added and keep its previous subtree alive.
    fn roll_back(&mut self, frame: &ContainerFrame) {
        let declared: Vec<StableId> = self.touched_log[frame.touched_mark..].to_vec();
        for id in declared.iter().rev() {
            if self.created.remove(id) {
                self.touched.remove(id);
                self.created_count -= 1;
                self.ctx.reconciler.prune_id(
                    &mut *self.ctx.host,
                    &mut *self.ctx.registry,
                    id,
                );
            }
        }

        if self.created.remove(&frame.id) {
            self.touched.remove(&frame.id);
            self.created_count -= 1;
            if let Some(parent) = self.frames.last_mut() {
                parent.expected.retain(|id| id != &frame.id);
            }
            self.ctx.reconciler.prune_id(
                &mut *self.ctx.host,
                &mut *self.ctx.registry,
                &frame.id,
            );
            return;
        }

        let kept = self
            .ctx
            .reconciler
            .retained_in_subtree(&*self.ctx.host, &frame.handle);
        for id in kept {
            self.mark_touched(&id);
        }
    }

    /// Write a node's attributes, text, and handlers.
    ///
    /// Skipped when the node was pruned or replaced after it was declared.
    /// Declared handlers are rebound every pass, so their ids change even
    /// when nothing else did.
    fn apply(&mut self, patch: Patch) {
        let Patch { id, handle, spec } = patch;
        let host = &mut *self.ctx.host;
        let Some(node) = self.ctx.reconciler.cache_mut().get_mut(&id) else {
            return;
        };
        if node.handle != handle {
            return;
        }
        let handle = &handle;

        for (name, value) in &spec.attributes {
            if node.attributes.get(name) != Some(value) {
                if let Err(err) = host.set_attribute(handle, name, value) {
                    warn!(%id, %err, "failed to set attribute");
                }
            }
        }
        for name in node.attributes.keys() {
            if !spec.attributes.contains_key(name) {
                if let Err(err) = host.remove_attribute(handle, name) {
                    warn!(%id, %err, "failed to remove attribute");
                }
            }
        }
        node.attributes = spec.attributes;

        if node.text != spec.text {
            if let Err(err) = host.set_text(handle, spec.text.as_deref()) {
                warn!(%id, %err, "failed to set text");
            }
            node.text = spec.text;
        }

        let registry = &mut *self.ctx.registry;
        for event in registry.events_for(handle) {
            if !spec.handlers.iter().any(|(kind, _)| kind == &event) {
                callback::unbind(host, registry, handle, &event);
            }
        }
        for (event, closure) in spec.handlers {
            match &mut self.listeners {
                ListenerMode::Immediate => {
                    callback::bind_or_warn(host, registry, handle, &event, closure);
                }
                ListenerMode::Deferred(queue) => queue.push(PendingListener {
                    handle: handle.clone(),
                    event,
                    closure,
                }),
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
