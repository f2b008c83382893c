//! Frame clocks: a deterministic manual clock and a tokio timer clock.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::error;

use super::scheduler::{FrameHost, FrameToken};
use crate::config::RendererConfig;

// ---------------------------------------------------------------------------
// ManualFrameClock
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ManualState {
    next: u64,
    live: Vec<FrameToken>,
}

/// Frame clock advanced by hand. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ManualFrameClock {
    state: Rc<RefCell<ManualState>>,
}

impl ManualFrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reach a frame boundary: every live request fires, in request order.
    pub fn fire(&self) -> Vec<FrameToken> {
        std::mem::take(&mut self.state.borrow_mut().live)
    }

    /// Requests that have neither fired nor been cancelled.
    pub fn live_count(&self) -> usize {
        self.state.borrow().live.len()
    }
}

impl FrameHost for ManualFrameClock {
    fn request_frame(&mut self) -> FrameToken {
        let mut state = self.state.borrow_mut();
        state.next += 1;
        let token = FrameToken(state.next);
        state.live.push(token);
        token
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        self.state.borrow_mut().live.retain(|&t| t != token);
    }
}

// ---------------------------------------------------------------------------
// TokioFrameClock
// ---------------------------------------------------------------------------

/// Receiving end of a [`TokioFrameClock`].
#[derive(Debug)]
pub struct FrameReceiver {
    rx: mpsc::UnboundedReceiver<FrameToken>,
}

impl FrameReceiver {
    /// Wait for the next fired frame. `None` once the clock is dropped.
    pub async fn recv(&mut self) -> Option<FrameToken> {
        self.rx.recv().await
    }

    /// A fired frame, if one is already queued.
    pub fn try_recv(&mut self) -> Option<FrameToken> {
        self.rx.try_recv().ok()
    }
}

/// Frame clock backed by tokio timers.
///
/// Each request spawns a task that sleeps for one frame interval and then
/// delivers its token; cancelling aborts the task.
#[derive(Debug)]
pub struct TokioFrameClock {
    interval: Duration,
    next: u64,
    timers: HashMap<FrameToken, JoinHandle<()>>,
    tx: mpsc::UnboundedSender<FrameToken>,
}

impl TokioFrameClock {
    pub fn new(interval: Duration) -> (Self, FrameReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let clock = Self {
            interval,
            next: 0,
            timers: HashMap::new(),
            tx,
        };
        (clock, FrameReceiver { rx })
    }

    /// Clock ticking at the config's `frame_interval`.
    pub fn from_config(config: &RendererConfig) -> (Self, FrameReceiver) {
        Self::new(config.frame_interval)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Timers that are still sleeping.
    pub fn armed(&self) -> usize {
        self.timers.values().filter(|task| !task.is_finished()).count()
    }
}

impl FrameHost for TokioFrameClock {
    fn request_frame(&mut self) -> FrameToken {
        self.timers.retain(|_, task| !task.is_finished());
        self.next += 1;
        let token = FrameToken(self.next);
        let tx = self.tx.clone();
        let interval = self.interval;
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let task = runtime.spawn(async move {
                    tokio::time::sleep(interval).await;
                    let _ = tx.send(token);
                });
                self.timers.insert(token, task);
            }
            Err(err) => {
                error!(%err, "no tokio runtime for frame timer, firing immediately");
                let _ = tx.send(token);
            }
        }
        token
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        if let Some(task) = self.timers.remove(&token) {
            task.abort();
        }
    }
}

impl Drop for TokioFrameClock {
    fn drop(&mut self) {
        for task in self.timers.values() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_fires_live_requests() {
        let mut clock = ManualFrameClock::new();
        let a = clock.request_frame();
        let b = clock.request_frame();
        clock.cancel_frame(a);
        assert_eq!(clock.live_count(), 1);
        assert_eq!(clock.fire(), vec![b]);
        assert!(clock.fire().is_empty());
    }

    #[test]
    fn manual_clock_clones_share_state() {
        let clock = ManualFrameClock::new();
        let mut other = clock.clone();
        other.request_frame();
        assert_eq!(clock.live_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_clock_delivers_after_interval() {
        let (mut clock, mut frames) = TokioFrameClock::new(Duration::from_millis(16));
        let token = clock.request_frame();
        tokio::task::yield_now().await;
        assert!(frames.try_recv().is_none());
        assert_eq!(frames.recv().await, Some(token));
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_clock_cancel_aborts_timer() {
        let (mut clock, mut frames) = TokioFrameClock::new(Duration::from_millis(16));
        let first = clock.request_frame();
        clock.cancel_frame(first);
        let second = clock.request_frame();
        assert_eq!(frames.recv().await, Some(second));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(frames.try_recv().is_none());
    }

    #[test]
    fn tokio_clock_takes_interval_from_config() {
        let config = RendererConfig::default().with_frame_interval(Duration::from_millis(5));
        let (clock, _frames) = TokioFrameClock::from_config(&config);
        assert_eq!(clock.interval(), Duration::from_millis(5));
    }

    #[test]
    fn tokio_clock_without_runtime_fires_immediately() {
        let (mut clock, mut frames) = TokioFrameClock::new(Duration::from_millis(16));
        let token = clock.request_frame();
        assert_eq!(frames.try_recv(), Some(token));
        assert_eq!(clock.armed(), 0);
    }

    #[test]
    fn recv_waits_for_a_frame() {
        let (_clock, mut frames) = TokioFrameClock::new(Duration::from_millis(16));
        let mut next = tokio_test::task::spawn(frames.recv());
        tokio_test::assert_pending!(next.poll());
    }

    #[test]
    fn receiver_closes_with_clock() {
        let (clock, mut frames) = TokioFrameClock::new(Duration::from_millis(16));
        drop(clock);
        assert_eq!(tokio_test::block_on(frames.recv()), None);
    }
}
