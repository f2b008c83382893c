//! The recomposer: runs passes and prunes what a pass no longer declares.

use std::collections::HashSet;

use tracing::{debug, debug_span};

use super::composer::{Composer, ListenerMode, NodeFailure, PassContext};
use super::frame::ContainerFrame;
use super::id::StableId;
use super::Content;
use crate::host::HostHandle;
use crate::hydrate::PendingListener;

/// Where the recomposer is within a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PassPhase {
    #[default]
    Idle,
    Composing,
    Reconciling,
}

/// Summary of one completed pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// 1-based pass number.
    pub number: u64,
    /// Nodes created.
    pub created: usize,
    /// Nodes reused from the cache or adopted.
    pub reused: usize,
    /// Retained ids pruned, in pruning order.
    pub pruned: Vec<StableId>,
    /// Nodes whose block failed.
    pub failures: Vec<NodeFailure>,
}

impl PassReport {
    /// No failures were recorded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Tracks the touched set between passes.
#[derive(Debug, Default)]
pub struct Recomposer {
    phase: PassPhase,
    previous: HashSet<StableId>,
    passes: u64,
}

impl Recomposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> PassPhase {
        self.phase
    }

    /// Passes completed so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Ids touched by the last completed pass.
    pub fn previous(&self) -> &HashSet<StableId> {
        &self.previous
    }

    /// Forget the previous pass.
    pub fn reset(&mut self) {
        self.previous.clear();
    }

    /// Evaluate `content` into the root container and reconcile.
    ///
    /// Returns the report and, in deferred mode, the listeners queued for
    /// the caller to bind.
    pub(crate) fn run(
        &mut self,
        ctx: PassContext<'_>,
        root_id: &StableId,
        root: &HostHandle,
        content: &Content,
        listeners: ListenerMode,
    ) -> (PassReport, Vec<PendingListener>) {
        let number = self.passes + 1;
        let span = debug_span!("pass", number);
        let _guard = span.enter();

        self.phase = PassPhase::Composing;
        let previous = std::mem::take(&mut self.previous);
        ctx.reconciler.begin_pass();

        let mut composer = Composer::new(ctx, listeners);
        composer.run_root(ContainerFrame::new(root_id.clone(), root.clone()), |scope| {
            content(scope)
        });

        self.phase = PassPhase::Reconciling;
        composer.commit();
        composer.prune_absent(&previous);
        let outcome = composer.finish();

        self.previous = outcome.touched;
        self.passes = number;
        self.phase = PassPhase::Idle;

        let report = PassReport {
            number,
            created: outcome.created,
            reused: outcome.reused,
            pruned: outcome.pruned,
            failures: outcome.failures,
        };
        debug!(
            created = report.created,
            reused = report.reused,
            pruned = report.pruned.len(),
            failures = report.failures.len(),
            "pass complete"
        );
        (report, outcome.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::CallbackRegistry;
    use crate::compose::{content, ComposeError, NodeSpec};
    use crate::dom::{Document, NodeData};
    use crate::host::Host;
    use crate::hydrate::HydrationSnapshot;
    use crate::reconcile::Reconciler;
    use crate::schedule::{ManualFrameClock, Scheduler};
    use crate::state::StateTable;
    use pretty_assertions::assert_eq;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    struct Rig {
        doc: Document,
        reconciler: Reconciler,
        registry: CallbackRegistry,
        states: StateTable,
        recomposer: Recomposer,
        root: HostHandle,
        _scheduler: Scheduler,
    }

    impl Rig {
        fn new() -> Self {
            let mut doc = Document::new();
            let root = doc.insert(NodeData::new("div").with_attr("id", "root")).to_handle();
            let scheduler = Scheduler::new(ManualFrameClock::new());
            let states = StateTable::new(
                Rc::new(RefCell::new(HydrationSnapshot::new())),
                scheduler.handle(),
            );
            Self {
                doc,
                reconciler: Reconciler::new("data-summon-id", true),
                registry: CallbackRegistry::new(),
                states,
                recomposer: Recomposer::new(),
                root,
                _scheduler: scheduler,
            }
        }

        fn pass(&mut self, app: &Content) -> PassReport {
            let ctx = PassContext {
                host: &mut self.doc,
                reconciler: &mut self.reconciler,
                registry: &mut self.registry,
                states: &mut self.states,
            };
            let (report, pending) = self.recomposer.run(
                ctx,
                &StableId::new("root"),
                &self.root,
                app,
                ListenerMode::Immediate,
            );
            assert!(pending.is_empty());
            report
        }

        fn tags(&self) -> Vec<String> {
            self.doc
                .children(&self.root)
                .iter()
                .filter_map(|child| self.doc.tag_of(child))
                .collect()
        }
    }

    #[test]
    fn second_pass_reuses_everything() {
        let mut rig = Rig::new();
        let app = content(|c| {
            c.node(NodeSpec::new("ul"), |c| {
                c.leaf(NodeSpec::new("li").text("a"));
                c.leaf(NodeSpec::new("li").text("b"));
                Ok(())
            });
            Ok(())
        });

        let first = rig.pass(&app);
        assert_eq!(first.created, 3);
        rig.doc.reset_stats();

        let second = rig.pass(&app);
        assert_eq!(second.number, 2);
        assert_eq!(second.created, 0);
        assert_eq!(second.reused, 3);
        assert_eq!(rig.doc.stats().inserted, 0);
        assert_eq!(rig.doc.stats().removed, 0);
        assert_eq!(rig.recomposer.phase(), PassPhase::Idle);
    }

    #[test]
    fn undeclared_nodes_are_pruned() {
        let mut rig = Rig::new();
        let show = Rc::new(Cell::new(true));
        let flag = Rc::clone(&show);
        let app = content(move |c| {
            c.leaf(NodeSpec::new("h1"));
            if flag.get() {
                c.node(NodeSpec::new("section").id("extra"), |c| {
                    c.leaf(NodeSpec::new("p"));
                    Ok(())
                });
            }
            Ok(())
        });

        rig.pass(&app);
        assert_eq!(rig.tags(), vec!["h1", "section"]);

        show.set(false);
        let report = rig.pass(&app);
        assert_eq!(rig.tags(), vec!["h1"]);
        assert_eq!(report.pruned.len(), 2);
        assert!(!rig.reconciler.cache().contains(&StableId::new("extra")));
        assert_eq!(rig.reconciler.cache().len(), 1);
    }

    #[test]
    fn failing_node_keeps_previous_subtree() {
        let mut rig = Rig::new();
        let fail = Rc::new(Cell::new(false));
        let flag = Rc::clone(&fail);
        let app = content(move |c| {
            c.node(NodeSpec::new("div").id("panel"), |c| {
                let label = if flag.get() { "changed" } else { "kept" };
                c.leaf(NodeSpec::new("span").text(label));
                if flag.get() {
                    c.leaf(NodeSpec::new("em"));
                    return Err(ComposeError::msg("boom"));
                }
                Ok(())
            });
            c.leaf(NodeSpec::new("footer"));
            Ok(())
        });

        rig.pass(&app);
        let before = rig.doc.to_markup_all();

        fail.set(true);
        let report = rig.pass(&app);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].id, StableId::new("panel"));
        assert_eq!(rig.doc.to_markup_all(), before);
        assert_eq!(rig.reconciler.cache().len(), 3);
    }

    #[test]
    fn panicking_node_is_contained() {
        let mut rig = Rig::new();
        let app = content(|c| {
            c.node(NodeSpec::new("div").id("bad"), |_| panic!("bad block"));
            c.leaf(NodeSpec::new("p").id("good"));
            Ok(())
        });

        let report = rig.pass(&app);
        assert_eq!(
            report.failures[0].error,
            ComposeError::Panicked("bad block".into())
        );
        assert_eq!(rig.tags(), vec!["p"]);
        assert!(!rig.reconciler.cache().contains(&StableId::new("bad")));
    }

    #[test]
    fn duplicate_id_is_ignored() {
        let mut rig = Rig::new();
        let app = content(|c| {
            c.leaf(NodeSpec::new("p").id("same").text("first"));
            c.leaf(NodeSpec::new("p").id("same").text("second"));
            Ok(())
        });

        let report = rig.pass(&app);
        assert_eq!(report.created, 1);
        assert_eq!(rig.tags(), vec!["p"]);
    }
}
