//! The renderer context: one explicitly constructed owner for a root.
//!
//! A [`Renderer`] owns the host document binding, the reconciler and its
//! retained cache, the callback registry, the scheduler, and remembered
//! state. Nothing lives in globals; content receives a [`Composer`] borrowed
//! from the renderer for the length of one pass.
//!
//! [`Composer`]: crate::compose::Composer

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::callback::{CallbackRegistry, HandlerId};
use crate::compose::composer::{ListenerMode, PassContext};
use crate::compose::{Content, PassReport, Recomposer, StableId};
use crate::config::RendererConfig;
use crate::dom::Document;
use crate::host::{Host, HostHandle};
use crate::hydrate::{
    Adopter, HydrationError, HydrationOutcome, HydrationSnapshot, PendingListener, SharedSnapshot,
};
use crate::reconcile::{Reconciler, RetainedNode};
use crate::schedule::{
    FrameHost, FrameReceiver, FrameToken, ManualFrameClock, RecomposeHandle, Scheduler,
    SchedulerStats, TokioFrameClock,
};
use crate::state::StateTable;

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Keeps one host root synchronized with repeated evaluations of content.
pub struct Renderer<H: Host> {
    host: H,
    config: RendererConfig,
    reconciler: Reconciler,
    registry: CallbackRegistry,
    recomposer: Recomposer,
    scheduler: Scheduler,
    snapshot: SharedSnapshot,
    states: StateTable,
    root_id: StableId,
    root: Option<HostHandle>,
    content: Option<Content>,
    hydrated: bool,
    mounted: bool,
}

impl<H: Host> Renderer<H> {
    /// Create a renderer over `host`, scheduling passes through `frames`.
    pub fn new(host: H, frames: impl FrameHost + 'static, config: RendererConfig) -> Self {
        let scheduler = Scheduler::new(frames);
        let snapshot: SharedSnapshot = Rc::new(RefCell::new(HydrationSnapshot::new()));
        let states = StateTable::new(Rc::clone(&snapshot), scheduler.handle());
        Self {
            host,
            reconciler: Reconciler::new(config.id_attribute.clone(), config.mark_nodes),
            registry: CallbackRegistry::new(),
            recomposer: Recomposer::new(),
            scheduler,
            snapshot,
            states,
            root_id: StableId::new(config.root_id.clone()),
            root: None,
            content: None,
            hydrated: false,
            mounted: false,
            config,
        }
    }

    /// Create a renderer whose frames come from tokio timers at the config's
    /// `frame_interval`. Drive it with [`run_frames`](Self::run_frames).
    pub fn with_tokio_frames(host: H, config: RendererConfig) -> (Self, FrameReceiver) {
        let (clock, frames) = TokioFrameClock::from_config(&config);
        (Self::new(host, clock, config), frames)
    }

    // ── Entry points ─────────────────────────────────────────────────

    /// Render `content` from scratch into the configured root.
    ///
    /// The root container is created when the host does not have one.
    pub fn mount(&mut self, content: Content) -> PassReport {
        let root = self.ensure_root();
        info!(root = %root, "mounting");
        self.content = Some(content);
        self.mounted = true;
        self.run_pass(ListenerMode::Immediate)
            .map(|(report, _)| report)
            .unwrap_or_default()
    }

    /// Adopt the pre-rendered root and restore state from `blob`.
    ///
    /// Scanning or restoring failures fall back to [`mount`](Self::mount).
    /// Calling this on a root that is already hydrated or mounted logs a
    /// warning and does nothing.
    pub fn hydrate(&mut self, content: Content, blob: Option<&str>) -> HydrationOutcome {
        if self.hydrated || self.mounted || self.root_marked_hydrated() {
            warn!(root = %self.root_id, "root already hydrated, ignoring");
            return HydrationOutcome::AlreadyHydrated;
        }

        let mut adopter = Adopter::new();
        let restored = adopter
            .scan(&self.host, &self.config.root_id, &self.config.id_attribute)
            .and_then(|root| adopter.restore(blob).map(|snapshot| (root, snapshot)));

        let (root, snapshot) = match restored {
            Ok(found) => found,
            Err(reason) => {
                warn!(%reason, "hydration failed, rendering fresh");
                adopter.abandon();
                self.reconciler.clear_seed();
                self.snapshot.borrow_mut().clear();
                let pass = self.mount(content);
                return HydrationOutcome::FellBack { reason, pass };
            }
        };

        *self.snapshot.borrow_mut() = snapshot;
        self.states.clear();
        self.reconciler.seed(adopter.begin_adoption());
        self.root = Some(root);
        self.content = Some(content);

        let (pass, pending) = self
            .run_pass(ListenerMode::Deferred(Vec::new()))
            .unwrap_or_default();
        let adopted = self.reconciler.clear_seed();
        let listeners = adopter.complete(
            &mut self.host,
            &mut self.registry,
            pending,
            &self.config.hydrated_attribute,
        );
        self.hydrated = true;
        self.mounted = true;
        info!(adopted = adopted.len(), listeners, "hydration complete");
        HydrationOutcome::Adopted {
            adopted,
            listeners,
            pass,
        }
    }

    /// `requestRecomposition`: schedule a pass at the next frame boundary.
    pub fn request_recomposition(&self) {
        self.scheduler.request();
    }

    /// Frame boundary callback. Runs a pass only when `token` is the pending
    /// frame; cancelled or foreign tokens are ignored.
    pub fn on_frame(&mut self, token: FrameToken) -> Option<PassReport> {
        if !self.scheduler.take_if_pending(token) {
            return None;
        }
        self.run_pass(ListenerMode::Immediate).map(|(report, _)| report)
    }

    /// Run a pass right away, dropping any pending frame.
    pub fn recompose_now(&mut self) -> Option<PassReport> {
        self.scheduler.cancel();
        self.run_pass(ListenerMode::Immediate).map(|(report, _)| report)
    }

    /// Route a host event carrying `handler_id` to its closure.
    ///
    /// Returns `false` for ids the registry no longer knows.
    pub fn dispatch(&self, handler_id: &HandlerId) -> bool {
        let handled = self.registry.invoke(handler_id);
        if !handled {
            debug!(%handler_id, "event for unknown handler dropped");
        }
        handled
    }

    /// Dispatch `event` on `handle` through whatever handler is bound.
    pub fn dispatch_event(&self, handle: &HostHandle, event: &str) -> bool {
        match self.registry.lookup(handle, event) {
            Some(handler_id) => self.dispatch(&handler_id),
            None => false,
        }
    }

    /// Drive passes from a timer clock until `until` holds or the clock
    /// goes away. Returns the number of passes run.
    pub async fn run_frames(
        &mut self,
        frames: &mut FrameReceiver,
        mut until: impl FnMut(&Self) -> bool,
    ) -> usize {
        let mut passes = 0;
        while !until(self) {
            let Some(token) = frames.recv().await else {
                debug!("frame clock closed");
                break;
            };
            if self.on_frame(token).is_some() {
                passes += 1;
            }
        }
        passes
    }

    // ── Snapshot interface ───────────────────────────────────────────

    /// `readSnapshotValue`.
    pub fn read_snapshot_value(&self, component_id: &str, state_key: &str) -> Option<Value> {
        self.snapshot.borrow().read(component_id, state_key)
    }

    /// `writeSnapshotValue`. Only JSON primitives are accepted.
    pub fn write_snapshot_value(
        &self,
        component_id: &str,
        state_key: &str,
        value: Value,
    ) -> Result<(), HydrationError> {
        self.snapshot
            .borrow_mut()
            .write(component_id, state_key, value)
    }

    /// `serializeForBootstrap`.
    pub fn serialize_for_bootstrap(&self) -> String {
        self.snapshot.borrow().serialize()
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn registry(&self) -> &CallbackRegistry {
        &self.registry
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// The retained entry for `id`.
    pub fn retained(&self, id: &str) -> Option<&RetainedNode> {
        self.reconciler.cache().get(&StableId::new(id))
    }

    /// The host handle retained for `id`.
    pub fn handle_of(&self, id: &str) -> Option<HostHandle> {
        self.retained(id).map(|node| node.handle.clone())
    }

    /// The root container, once mounted or hydrated.
    pub fn root(&self) -> Option<&HostHandle> {
        self.root.as_ref()
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// A handle for requesting recomposition from outside a pass.
    pub fn recompose_handle(&self) -> RecomposeHandle {
        self.scheduler.handle()
    }

    pub fn is_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    pub fn passes(&self) -> u64 {
        self.recomposer.passes()
    }

    pub fn states(&self) -> &StateTable {
        &self.states
    }

    // ── Internals ────────────────────────────────────────────────────

    fn ensure_root(&mut self) -> HostHandle {
        if let Some(root) = self.root.clone().filter(|root| self.host.is_live(root)) {
            return root;
        }
        let root = match self.host.find_root(&self.config.root_id) {
            Some(root) => root,
            None => {
                debug!(root_id = %self.config.root_id, "creating root container");
                self.host.create_root(&self.config.root_id)
            }
        };
        self.root = Some(root.clone());
        root
    }

    fn root_marked_hydrated(&self) -> bool {
        self.host
            .find_root(&self.config.root_id)
            .and_then(|root| self.host.attribute(&root, &self.config.hydrated_attribute))
            .is_some()
    }

    fn run_pass(&mut self, listeners: ListenerMode) -> Option<(PassReport, Vec<PendingListener>)> {
        let (Some(root), Some(content)) = (self.root.clone(), self.content.clone()) else {
            debug!("nothing mounted, skipping pass");
            return None;
        };
        let ctx = PassContext {
            host: &mut self.host,
            reconciler: &mut self.reconciler,
            registry: &mut self.registry,
            states: &mut self.states,
        };
        Some(
            self.recomposer
                .run(ctx, &self.root_id, &root, &content, listeners),
        )
    }
}

impl Renderer<Document> {
    /// Headless server pass: render `content` into a fresh document.
    ///
    /// Returns the root's markup and the bootstrap blob, the two inputs of a
    /// later [`hydrate`](Self::hydrate).
    pub fn render_to_string(content: Content, config: RendererConfig) -> (String, String) {
        let mut renderer = Self::new(Document::new(), ManualFrameClock::new(), config);
        renderer.mount(content);
        let markup = renderer
            .root
            .as_ref()
            .and_then(|root| renderer.host.resolve(root))
            .map(|root| renderer.host.to_markup(root))
            .unwrap_or_default();
        (markup, renderer.serialize_for_bootstrap())
    }
}
