//! Binding registry entries to native host listeners.
//!
//! Keeps the host's listener list and the registry in lockstep: a replaced
//! registry entry always loses its native listener before the new one is added.

use tracing::{debug, warn};

use super::registry::{Callback, CallbackRegistry, HandlerId, RegistryError};
use crate::host::{Host, HostHandle};

/// Register `closure` and bind it natively on `handle`.
///
/// Binding to a node the host no longer knows is reported and dropped; the
/// registry is left without an entry for it.
pub fn bind(
    host: &mut dyn Host,
    registry: &mut CallbackRegistry,
    handle: &HostHandle,
    event: &str,
    closure: Callback,
) -> Result<HandlerId, RegistryError> {
    if !host.is_live(handle) {
        return Err(unknown(handle, event));
    }
    let registration = registry.register(handle, event, closure);
    if let Some(old) = &registration.replaced {
        host.remove_listener(handle, event, old.as_str());
    }
    if host
        .add_listener(handle, event, registration.id.as_str())
        .is_err()
    {
        registry.unregister(&registration.id);
        return Err(unknown(handle, event));
    }
    debug!(%handle, event, id = %registration.id, "bound handler");
    Ok(registration.id)
}

/// Remove the entry for `(handle, event)` and its native listener, if any.
pub fn unbind(
    host: &mut dyn Host,
    registry: &mut CallbackRegistry,
    handle: &HostHandle,
    event: &str,
) -> Option<HandlerId> {
    let id = registry.lookup(handle, event)?;
    registry.unregister(&id);
    host.remove_listener(handle, event, id.as_str());
    Some(id)
}

/// [`bind`], logging and dropping a failed binding.
pub fn bind_or_warn(
    host: &mut dyn Host,
    registry: &mut CallbackRegistry,
    handle: &HostHandle,
    event: &str,
    closure: Callback,
) -> Option<HandlerId> {
    match bind(host, registry, handle, event, closure) {
        Ok(id) => Some(id),
        Err(err) => {
            warn!(%err, "dropping handler binding");
            None
        }
    }
}

fn unknown(handle: &HostHandle, event: &str) -> RegistryError {
    RegistryError::UnknownHandle {
        handle: handle.clone(),
        event: event.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use std::rc::Rc;

    #[test]
    fn bind_adds_single_native_listener() {
        let mut doc = Document::new();
        let mut registry = CallbackRegistry::new();
        let button = doc.create_element("button");

        let first = bind(&mut doc, &mut registry, &button, "click", Rc::new(|| {})).unwrap();
        let second = bind(&mut doc, &mut registry, &button, "click", Rc::new(|| {})).unwrap();

        assert_ne!(first, second);
        assert_eq!(doc.listeners(&button, "click"), vec![second.as_str().to_owned()]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn bind_to_missing_node_is_dropped() {
        let mut doc = Document::new();
        let mut registry = CallbackRegistry::new();
        let button = doc.create_element("button");
        doc.invalidate(&button);

        let err = bind(&mut doc, &mut registry, &button, "click", Rc::new(|| {})).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownHandle { .. }));
        assert!(registry.is_empty());
        assert!(bind_or_warn(&mut doc, &mut registry, &button, "click", Rc::new(|| {})).is_none());
    }

    #[test]
    fn unbind_removes_both_sides() {
        let mut doc = Document::new();
        let mut registry = CallbackRegistry::new();
        let input = doc.create_element("input");
        bind(&mut doc, &mut registry, &input, "input", Rc::new(|| {})).unwrap();

        assert!(unbind(&mut doc, &mut registry, &input, "input").is_some());
        assert!(doc.listeners(&input, "input").is_empty());
        assert!(registry.is_empty());
        assert!(unbind(&mut doc, &mut registry, &input, "input").is_none());
    }
}
