//! Hydration adopter: Scanning → Restoring → Adopting → Complete.
//!
//! The adopter only owns the bookkeeping of each phase. The renderer drives it
//! and runs the adopting pass itself, with the reconciler seeded from
//! [`Adopter::begin_adoption`] and handler bindings queued as
//! [`PendingListener`]s.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use super::snapshot::HydrationSnapshot;
use super::HydrationError;
use crate::callback::{self, Callback, CallbackRegistry};
use crate::compose::StableId;
use crate::host::{Host, HostHandle};

/// Phase of one hydration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrationPhase {
    Scanning,
    Restoring,
    Adopting,
    Complete,
}

/// A handler declared on an adopted node, bound once adoption finishes.
#[derive(Clone)]
pub struct PendingListener {
    pub handle: HostHandle,
    pub event: String,
    pub closure: Callback,
}

impl fmt::Debug for PendingListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingListener")
            .field("handle", &self.handle)
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

/// State of one hydration attempt.
#[derive(Debug)]
pub struct Adopter {
    phase: HydrationPhase,
    root: Option<HostHandle>,
    existing: HashMap<StableId, HostHandle>,
}

impl Default for Adopter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adopter {
    pub fn new() -> Self {
        Self {
            phase: HydrationPhase::Scanning,
            root: None,
            existing: HashMap::new(),
        }
    }

    pub fn phase(&self) -> HydrationPhase {
        self.phase
    }

    /// The root found while scanning.
    pub fn root(&self) -> Option<&HostHandle> {
        self.root.as_ref()
    }

    /// `existingElements` as collected so far.
    pub fn existing(&self) -> &HashMap<StableId, HostHandle> {
        &self.existing
    }

    /// Walk the pre-rendered root collecting nodes that carry `id_attribute`.
    ///
    /// Creates nothing. The root itself is never adopted as a child; on a
    /// duplicate marker the first node in document order wins.
    pub fn scan(
        &mut self,
        host: &dyn Host,
        root_id: &str,
        id_attribute: &str,
    ) -> Result<HostHandle, HydrationError> {
        self.phase = HydrationPhase::Scanning;
        let root = host
            .find_root(root_id)
            .ok_or_else(|| HydrationError::MissingRoot(root_id.to_owned()))?;

        for current in host.descendants(&root).into_iter().skip(1) {
            if let Some(raw) = host.attribute(&current, id_attribute) {
                let id = StableId::new(raw);
                if self.existing.contains_key(&id) {
                    warn!(%id, handle = %current, "duplicate identity marker, keeping the first");
                } else {
                    self.existing.insert(id, current);
                }
            }
        }
        debug!(root = %root, found = self.existing.len(), "scanned pre-rendered tree");
        self.root = Some(root.clone());
        Ok(root)
    }

    /// Parse the bootstrap blob. A missing blob restores nothing.
    pub fn restore(&mut self, blob: Option<&str>) -> Result<HydrationSnapshot, HydrationError> {
        self.phase = HydrationPhase::Restoring;
        match blob {
            Some(blob) => HydrationSnapshot::parse(blob),
            None => Ok(HydrationSnapshot::new()),
        }
    }

    /// Enter Adopting and hand the scanned nodes to the reconciler.
    pub fn begin_adoption(&mut self) -> HashMap<StableId, HostHandle> {
        self.phase = HydrationPhase::Adopting;
        self.existing.clone()
    }

    /// Bind every queued listener in one batch, clear `existingElements` and
    /// set the hydrated marker on the root. Returns how many bindings held.
    pub fn complete(
        &mut self,
        host: &mut dyn Host,
        registry: &mut CallbackRegistry,
        pending: Vec<PendingListener>,
        hydrated_attribute: &str,
    ) -> usize {
        let mut bound = 0;
        for listener in pending {
            if callback::bind_or_warn(
                host,
                registry,
                &listener.handle,
                &listener.event,
                listener.closure,
            )
            .is_some()
            {
                bound += 1;
            }
        }
        self.existing.clear();
        if let Some(root) = &self.root {
            if let Err(err) = host.set_attribute(root, hydrated_attribute, "true") {
                warn!(%err, "failed to mark root as hydrated");
            }
        }
        self.phase = HydrationPhase::Complete;
        bound
    }

    /// Discard any partial adoption state.
    pub fn abandon(&mut self) {
        self.existing.clear();
        self.root = None;
        self.phase = HydrationPhase::Scanning;
    }
}
