//! Host node reconciler: create, reuse, adopt, position, and prune.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace, warn};

use super::cache::{RetainedCache, RetainedNode};
use crate::callback::CallbackRegistry;
use crate::compose::StableId;
use crate::host::{Host, HostError, HostHandle};

/// Result of [`Reconciler::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Freshly created; the caller must attach it.
    New(HostHandle),
    /// Retained or adopted; already positioned.
    Reused(HostHandle),
}

impl Resolution {
    /// The resolved handle.
    pub fn handle(&self) -> &HostHandle {
        match self {
            Self::New(handle) | Self::Reused(handle) => handle,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::New(_))
    }
}

/// What one [`Reconciler::reconcile_container`] call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerOutcome {
    /// Retained ids pruned from the container's subtree.
    pub pruned: Vec<StableId>,
    /// Insert/move operations issued.
    pub moved: usize,
}

/// Owns the retained-node cache and decides create vs reuse vs adopt.
#[derive(Debug)]
pub struct Reconciler {
    cache: RetainedCache,
    /// Ids positioned by [`attach`](Self::attach) during the current pass.
    positioned: HashSet<StableId>,
    /// Pre-rendered nodes offered for adoption during hydration.
    seed: HashMap<StableId, HostHandle>,
    /// Ids adopted from `seed` since it was installed.
    adopted: Vec<StableId>,
    id_attribute: String,
    mark_nodes: bool,
}

impl Reconciler {
    /// Create a reconciler that writes `id_attribute` on created nodes when
    /// `mark_nodes` is set.
    pub fn new(id_attribute: impl Into<String>, mark_nodes: bool) -> Self {
        Self {
            cache: RetainedCache::new(),
            positioned: HashSet::new(),
            seed: HashMap::new(),
            adopted: Vec::new(),
            id_attribute: id_attribute.into(),
            mark_nodes,
        }
    }

    /// Reset per-pass bookkeeping.
    pub fn begin_pass(&mut self) {
        self.positioned.clear();
    }

    /// Offer pre-rendered nodes for adoption.
    pub fn seed(&mut self, existing: HashMap<StableId, HostHandle>) {
        self.seed = existing;
        self.adopted.clear();
    }

    /// Withdraw any remaining adoption offers, returning the adopted ids.
    pub fn clear_seed(&mut self) -> Vec<StableId> {
        self.seed.clear();
        std::mem::take(&mut self.adopted)
    }

    pub fn cache(&self) -> &RetainedCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut RetainedCache {
        &mut self.cache
    }

    /// Map a stable id to a live host node of kind `tag`.
    ///
    /// A cached handle that no longer validates is evicted and replaced by a
    /// fresh node in the same call.
    pub fn resolve(
        &mut self,
        host: &mut dyn Host,
        registry: &mut CallbackRegistry,
        id: &StableId,
        tag: &str,
    ) -> Resolution {
        if let Some(cached) = self.cache.get(id) {
            let handle = cached.handle.clone();
            if host.is_live(&handle) && host.tag_of(&handle).as_deref() == Some(tag) {
                return Resolution::Reused(handle);
            }
            debug!(%id, %handle, tag, "retained handle failed validation, recreating");
            self.prune_id(host, registry, id);
        }

        if let Some(handle) = self.seed.remove(id) {
            match host.tag_of(&handle) {
                Some(found) if found == tag => {
                    trace!(%id, %handle, "adopted pre-rendered node");
                    self.cache.insert(RetainedNode::new(id.clone(), handle.clone(), tag));
                    self.adopted.push(id.clone());
                    return Resolution::Reused(handle);
                }
                Some(found) => {
                    warn!(%id, expected = tag, found = %found, "pre-rendered node has a different tag, not adopting");
                }
                None => {
                    warn!(%id, %handle, "pre-rendered node vanished before adoption");
                }
            }
        }

        let handle = host.create_element(tag);
        if self.mark_nodes {
            if let Err(err) = host.set_attribute(&handle, &self.id_attribute, id.as_str()) {
                warn!(%id, %err, "failed to mark created node");
            }
        }
        trace!(%id, %handle, tag, "created node");
        self.cache.insert(RetainedNode::new(id.clone(), handle.clone(), tag));
        Resolution::New(handle)
    }

    /// Position a freshly created node under `container`.
    ///
    /// Returns whether an insert was issued. Nothing happens when the node is
    /// already a direct child of `container` or was positioned earlier in this
    /// pass.
    pub fn attach(
        &mut self,
        host: &mut dyn Host,
        container: &HostHandle,
        child: &HostHandle,
        id: &StableId,
    ) -> Result<bool, HostError> {
        if self.positioned.contains(id) {
            return Ok(false);
        }
        if host.parent(child).as_ref() == Some(container) {
            self.positioned.insert(id.clone());
            return Ok(false);
        }
        host.insert_before(container, child, None)?;
        self.positioned.insert(id.clone());
        Ok(true)
    }

    /// Make `container`'s children exactly `expected`, in order.
    ///
    /// Children not listed are pruned along with their subtrees; listed
    /// children out of place are moved.
    pub fn reconcile_container(
        &mut self,
        host: &mut dyn Host,
        registry: &mut CallbackRegistry,
        container: &HostHandle,
        expected: &[StableId],
    ) -> Result<ContainerOutcome, HostError> {
        let moved = self.place_children(host, container, expected)?;
        let pruned = self.prune_unexpected(host, registry, container, expected);
        Ok(ContainerOutcome { pruned, moved })
    }

    /// Move the retained nodes of `expected` to the front of `container`, in
    /// order. Nodes held by another container are moved over. Returns the
    /// number of inserts issued.
    pub fn place_children(
        &mut self,
        host: &mut dyn Host,
        container: &HostHandle,
        expected: &[StableId],
    ) -> Result<usize, HostError> {
        let wanted = self.handles_of(expected);
        let mut current = host.children(container);
        let mut moved = 0;
        for (index, want) in wanted.iter().enumerate() {
            if current.get(index) == Some(want) {
                continue;
            }
            let before = current.get(index).cloned();
            host.insert_before(container, want, before.as_ref())?;
            moved += 1;
            current.retain(|handle| handle != want);
            current.insert(index.min(current.len()), want.clone());
        }
        if moved > 0 {
            debug!(%container, moved, "placed container children");
        }
        Ok(moved)
    }

    /// Prune every child of `container` not retained for an id in
    /// `expected`. Returns the evicted ids.
    pub fn prune_unexpected(
        &mut self,
        host: &mut dyn Host,
        registry: &mut CallbackRegistry,
        container: &HostHandle,
        expected: &[StableId],
    ) -> Vec<StableId> {
        let wanted: HashSet<HostHandle> = self.handles_of(expected).into_iter().collect();
        let mut pruned = Vec::new();
        for child in host.children(container) {
            if !wanted.contains(&child) {
                pruned.extend(self.prune_handle(host, registry, &child));
            }
        }
        if !pruned.is_empty() {
            debug!(%container, pruned = pruned.len(), "pruned container children");
        }
        pruned
    }

    fn handles_of(&self, ids: &[StableId]) -> Vec<HostHandle> {
        ids.iter()
            .filter_map(|id| self.cache.get(id).map(|node| node.handle.clone()))
            .collect()
    }

    /// Remove `handle` and its subtree from the host, dropping every retained
    /// entry and callback inside it. Returns the evicted ids.
    pub fn prune_handle(
        &mut self,
        host: &mut dyn Host,
        registry: &mut CallbackRegistry,
        handle: &HostHandle,
    ) -> Vec<StableId> {
        let mut evicted = Vec::new();
        for current in host.descendants(handle) {
            registry.unregister_all(&current);
            if let Some(id) = self.cache.id_for(&current).cloned() {
                self.cache.evict(&id);
                self.positioned.remove(&id);
                evicted.push(id);
            }
        }
        if host.is_live(handle) {
            if let Err(err) = host.remove(handle) {
                warn!(%handle, %err, "failed to remove pruned node");
            }
        }
        trace!(%handle, evicted = evicted.len(), "pruned subtree");
        evicted
    }

    /// Prune whatever is retained for `id`. Returns the evicted ids.
    pub fn prune_id(
        &mut self,
        host: &mut dyn Host,
        registry: &mut CallbackRegistry,
        id: &StableId,
    ) -> Vec<StableId> {
        let Some(node) = self.cache.get(id) else {
            return Vec::new();
        };
        let handle = node.handle.clone();
        if host.is_live(&handle) {
            self.prune_handle(host, registry, &handle)
        } else {
            registry.unregister_all(&handle);
            self.cache.evict(id);
            self.positioned.remove(id);
            vec![id.clone()]
        }
    }

    /// Retained ids found in the host subtree of `handle`, `handle` included.
    pub fn retained_in_subtree(&self, host: &dyn Host, handle: &HostHandle) -> Vec<StableId> {
        host.descendants(handle)
            .iter()
            .filter_map(|current| self.cache.id_for(current).cloned())
            .collect()
    }
}
