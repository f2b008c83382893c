//! # summon
//!
//! Client-side incremental renderer for the Summon declarative UI framework.
//!
//! summon keeps a host document synchronized with repeated evaluations of
//! declarative content. Nodes are keyed by stable identity and reused across
//! passes, server-rendered markup is adopted instead of rebuilt, and events
//! cross the host boundary only as opaque handler-id strings.
//!
//! ## Core Systems
//!
//! - **[`host`]**: The `Host` trait over a real document
//! - **[`dom`]**: Slotmap-backed in-memory document with markup parse/serialize
//! - **[`callback`]**: Handler-id registry, one closure per (node, event)
//! - **[`reconcile`]**: Retained-node cache, resolve/attach, container diffing
//! - **[`compose`]**: Stable ids, declared nodes, container frames, passes
//! - **[`schedule`]**: Frame-coalescing scheduler with manual and tokio clocks
//! - **[`hydrate`]**: Pre-rendered tree adoption and the bootstrap snapshot
//! - **[`state`]**: Remembered state that persists and requests recomposition
//! - **[`renderer`]**: The renderer context tying everything together
//! - **[`config`]**: Renderer configuration
//! - **[`testing`]**: Headless harness and snapshot helpers

// Host boundary
pub mod dom;
pub mod host;

// Core systems
pub mod callback;
pub mod compose;
pub mod reconcile;
pub mod schedule;

// Hydration and state
pub mod hydrate;
pub mod state;

// Application
pub mod config;
pub mod renderer;

// Test support
pub mod testing;

pub use compose::{content, ComposeError, Composer, Content, NodeSpec, PassReport, StableId};
pub use config::RendererConfig;
pub use renderer::Renderer;
