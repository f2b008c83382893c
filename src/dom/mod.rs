//! In-memory host document: slotmap-backed node arena implementing [`Host`](crate::host::Host).

pub mod markup;
pub mod node;
pub mod query;
pub mod tokenizer;
pub mod tree;

pub use markup::MarkupError;
pub use node::{NodeData, NodeId};
pub use tree::{Document, DocumentStats};
