//! Host node reconciliation: retained cache, resolve/attach, container diffing.

pub mod cache;
pub mod reconciler;

pub use cache::{RetainedCache, RetainedNode};
pub use reconciler::{ContainerOutcome, Reconciler, Resolution};
