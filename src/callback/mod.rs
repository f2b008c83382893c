//! Cross-boundary callback registry and native listener binding.

pub mod binding;
pub mod registry;

pub use binding::{bind, bind_or_warn, unbind};
pub use registry::{Callback, CallbackEntry, CallbackRegistry, HandlerId, Registration, RegistryError};
