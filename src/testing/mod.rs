//! Headless testing framework: Harness, markup snapshot helpers.
//!
//! Use the [`Harness`] to drive a [`Renderer`](crate::renderer::Renderer) over
//! an in-memory [`Document`](crate::dom::Document) with a manual frame clock.
//! Use [`outline`] and [`root_markup`] to capture the document as text for
//! snapshot-style assertions.

pub mod harness;
pub mod snapshot;

pub use harness::Harness;
pub use snapshot::{outline, root_markup};
