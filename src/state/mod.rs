//! External state primitive: remembered, snapshot-backed, recomposition-aware.

pub mod cell;

pub use cell::{MutableState, StateTable};
