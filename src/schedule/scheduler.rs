//! Recomposition scheduler: coalesces invalidations into one frame callback.
//!
//! Every request cancels the pending host timer (if any) and issues a new one,
//! so at most one scheduled pass exists at any time. Nothing is lost by
//! cancelling: a pass always re-evaluates the whole graph.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

/// Identifies one host-level frame request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameToken(pub u64);

/// The host's frame-boundary timer.
pub trait FrameHost {
    /// Ask for a callback at the next frame boundary.
    fn request_frame(&mut self) -> FrameToken;

    /// Cancel a request that has not fired yet. Unknown tokens are ignored.
    fn cancel_frame(&mut self, token: FrameToken);
}

/// Counters for scheduler activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Invalidations received.
    pub requests: u64,
    /// Pending frames cancelled in favour of a newer request.
    pub cancelled: u64,
    /// Frames that ran a pass.
    pub passes: u64,
}

struct SchedulerState {
    host: Box<dyn FrameHost>,
    pending: Option<FrameToken>,
    stats: SchedulerStats,
}

/// Single-threaded recomposition scheduler.
#[derive(Clone)]
pub struct Scheduler {
    state: Rc<RefCell<SchedulerState>>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Scheduler")
            .field("pending", &state.pending)
            .field("stats", &state.stats)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Create a scheduler driving `host`.
    pub fn new(host: impl FrameHost + 'static) -> Self {
        Self {
            state: Rc::new(RefCell::new(SchedulerState {
                host: Box::new(host),
                pending: None,
                stats: SchedulerStats::default(),
            })),
        }
    }

    /// A cloneable handle for state primitives.
    pub fn handle(&self) -> RecomposeHandle {
        RecomposeHandle {
            state: Rc::clone(&self.state),
        }
    }

    /// Request a recomposition at the next frame boundary.
    pub fn request(&self) {
        request(&self.state);
    }

    /// Whether a pass is scheduled.
    pub fn is_pending(&self) -> bool {
        self.state.borrow().pending.is_some()
    }

    /// The currently scheduled frame.
    pub fn pending(&self) -> Option<FrameToken> {
        self.state.borrow().pending
    }

    /// Claim the pending frame if `token` is it.
    ///
    /// Returns `false` for cancelled or foreign tokens; those must not run a pass.
    pub fn take_if_pending(&self, token: FrameToken) -> bool {
        let mut state = self.state.borrow_mut();
        if state.pending == Some(token) {
            state.pending = None;
            state.stats.passes += 1;
            true
        } else {
            trace!(?token, "ignoring superseded frame");
            false
        }
    }

    /// Cancel the pending frame without scheduling another.
    pub fn cancel(&self) {
        let mut state = self.state.borrow_mut();
        if let Some(token) = state.pending.take() {
            state.host.cancel_frame(token);
            state.stats.cancelled += 1;
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        self.state.borrow().stats
    }
}

fn request(state: &Rc<RefCell<SchedulerState>>) {
    let mut state = state.borrow_mut();
    state.stats.requests += 1;
    if let Some(previous) = state.pending.take() {
        state.host.cancel_frame(previous);
        state.stats.cancelled += 1;
    }
    let token = state.host.request_frame();
    trace!(?token, "scheduled recomposition");
    state.pending = Some(token);
}

/// Handle through which external state requests recomposition.
#[derive(Clone)]
pub struct RecomposeHandle {
    state: Rc<RefCell<SchedulerState>>,
}

impl RecomposeHandle {
    /// `requestRecomposition()`.
    pub fn request(&self) {
        request(&self.state);
    }
}

impl fmt::Debug for RecomposeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RecomposeHandle")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::ManualFrameClock;

    #[test]
    fn single_request_schedules_one_frame() {
        let clock = ManualFrameClock::new();
        let scheduler = Scheduler::new(clock.clone());
        scheduler.request();
        assert!(scheduler.is_pending());
        assert_eq!(clock.live_count(), 1);
    }

    #[test]
    fn rapid_requests_coalesce() {
        let clock = ManualFrameClock::new();
        let scheduler = Scheduler::new(clock.clone());
        let handle = scheduler.handle();
        for _ in 0..5 {
            handle.request();
        }
        assert_eq!(clock.live_count(), 1);
        let stats = scheduler.stats();
        assert_eq!(stats.requests, 5);
        assert_eq!(stats.cancelled, 4);

        let fired = clock.fire();
        let ran: Vec<_> = fired
            .into_iter()
            .filter(|&token| scheduler.take_if_pending(token))
            .collect();
        assert_eq!(ran.len(), 1);
        assert_eq!(scheduler.stats().passes, 1);
    }

    #[test]
    fn last_request_wins() {
        let clock = ManualFrameClock::new();
        let scheduler = Scheduler::new(clock.clone());
        scheduler.request();
        let first = scheduler.pending().unwrap();
        scheduler.request();
        let second = scheduler.pending().unwrap();
        assert_ne!(first, second);
        assert!(!scheduler.take_if_pending(first));
        assert!(scheduler.take_if_pending(second));
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn cancel_clears_pending() {
        let clock = ManualFrameClock::new();
        let scheduler = Scheduler::new(clock.clone());
        scheduler.request();
        scheduler.cancel();
        assert!(!scheduler.is_pending());
        assert_eq!(clock.live_count(), 0);
        scheduler.cancel();
        assert_eq!(scheduler.stats().cancelled, 1);
    }
}
