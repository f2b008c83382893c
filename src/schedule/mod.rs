//! Recomposition scheduling: frame coalescing and frame clocks.

pub mod clock;
pub mod scheduler;

pub use clock::{FrameReceiver, ManualFrameClock, TokioFrameClock};
pub use scheduler::{FrameHost, FrameToken, RecomposeHandle, Scheduler, SchedulerStats};
