//! Handler-id → closure registry.
//!
//! The host side only ever sees [`HandlerId`] strings. When a host event
//! fires, the binding layer hands the id back and the registry runs the
//! closure. Entries are keyed by `(host handle, event kind)` so a node never
//! carries two live closures for the same event.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use slotmap::{new_key_type, Key, KeyData, SlotMap};

use crate::host::HostHandle;

new_key_type! {
    struct CallbackKey;
}

/// A framework closure invoked by a host event.
pub type Callback = Rc<dyn Fn()>;

/// Opaque handler identifier handed to the host's native listener API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(String);

impl HandlerId {
    /// Wrap a raw id received from the host.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_key(key: CallbackKey) -> Self {
        Self(format!("cb-{}", key.data().as_ffi()))
    }

    fn to_key(&self) -> Option<CallbackKey> {
        let raw = self.0.strip_prefix("cb-")?;
        raw.parse::<u64>().ok().map(|ffi| KeyData::from_ffi(ffi).into())
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors from binding handlers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("cannot bind `{event}` handler to missing host node `{handle}`")]
    UnknownHandle { handle: HostHandle, event: String },
}

/// One registered closure.
pub struct CallbackEntry {
    pub handle: HostHandle,
    pub event: String,
    closure: Callback,
}

impl fmt::Debug for CallbackEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackEntry")
            .field("handle", &self.handle)
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

/// Outcome of [`CallbackRegistry::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// The id of the new entry.
    pub id: HandlerId,
    /// The entry that was replaced for the same `(handle, event)` pair.
    pub replaced: Option<HandlerId>,
}

// ---------------------------------------------------------------------------
// CallbackRegistry
// ---------------------------------------------------------------------------

/// Registry of live event closures.
#[derive(Default)]
pub struct CallbackRegistry {
    entries: SlotMap<CallbackKey, CallbackEntry>,
    by_target: HashMap<(HostHandle, String), CallbackKey>,
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl CallbackRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `closure` for `(handle, event)`.
    ///
    /// An existing entry for the same pair is unregistered first and reported
    /// in [`Registration::replaced`].
    pub fn register(&mut self, handle: &HostHandle, event: &str, closure: Callback) -> Registration {
        let target = (handle.clone(), event.to_owned());
        let replaced = self
            .by_target
            .remove(&target)
            .and_then(|key| self.entries.remove(key).map(|_| HandlerId::from_key(key)));

        let key = self.entries.insert(CallbackEntry {
            handle: handle.clone(),
            event: event.to_owned(),
            closure,
        });
        self.by_target.insert(target, key);
        Registration {
            id: HandlerId::from_key(key),
            replaced,
        }
    }

    /// Remove an entry. Unknown or already removed ids are a no-op.
    pub fn unregister(&mut self, id: &HandlerId) -> Option<CallbackEntry> {
        let key = id.to_key()?;
        let entry = self.entries.remove(key)?;
        self.by_target.remove(&(entry.handle.clone(), entry.event.clone()));
        Some(entry)
    }

    /// Remove every entry bound to `handle`, returning `(event, id)` pairs.
    pub fn unregister_all(&mut self, handle: &HostHandle) -> Vec<(String, HandlerId)> {
        let keys: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, entry)| &entry.handle == handle)
            .map(|(key, _)| key)
            .collect();
        let mut removed = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(entry) = self.entries.remove(key) {
                self.by_target.remove(&(entry.handle, entry.event.clone()));
                removed.push((entry.event, HandlerId::from_key(key)));
            }
        }
        removed.sort();
        removed
    }

    /// The live id for `(handle, event)`.
    pub fn lookup(&self, handle: &HostHandle, event: &str) -> Option<HandlerId> {
        self.by_target
            .get(&(handle.clone(), event.to_owned()))
            .map(|&key| HandlerId::from_key(key))
    }

    /// Event kinds currently bound on `handle`, sorted.
    pub fn events_for(&self, handle: &HostHandle) -> Vec<String> {
        let mut events: Vec<_> = self
            .entries
            .values()
            .filter(|entry| &entry.handle == handle)
            .map(|entry| entry.event.clone())
            .collect();
        events.sort();
        events
    }

    /// Whether any entry references `handle`.
    pub fn references(&self, handle: &HostHandle) -> bool {
        self.entries.values().any(|entry| &entry.handle == handle)
    }

    /// The closure for `id`, if live.
    pub fn get(&self, id: &HandlerId) -> Option<Callback> {
        let key = id.to_key()?;
        self.entries.get(key).map(|entry| Rc::clone(&entry.closure))
    }

    /// Run the closure for `id`. Returns `false` for unknown ids.
    pub fn invoke(&self, id: &HandlerId) -> bool {
        match self.get(id) {
            Some(closure) => {
                closure();
                true
            }
            None => false,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<u32>>, Callback) {
        let count = Rc::new(Cell::new(0));
        let count_c = count.clone();
        (count, Rc::new(move || count_c.set(count_c.get() + 1)))
    }

    #[test]
    fn register_and_invoke() {
        let mut registry = CallbackRegistry::new();
        let (count, closure) = counter();
        let reg = registry.register(&HostHandle::new("n1"), "click", closure);
        assert!(reg.replaced.is_none());
        assert!(reg.id.as_str().starts_with("cb-"));
        assert!(registry.invoke(&reg.id));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn reregister_replaces_entry() {
        let mut registry = CallbackRegistry::new();
        let handle = HostHandle::new("n1");
        let (old_count, old) = counter();
        let (new_count, new) = counter();
        let first = registry.register(&handle, "click", old);
        let second = registry.register(&handle, "click", new);

        assert_eq!(second.replaced, Some(first.id.clone()));
        assert_eq!(registry.len(), 1);
        assert!(!registry.invoke(&first.id));
        assert!(registry.invoke(&second.id));
        assert_eq!(old_count.get(), 0);
        assert_eq!(new_count.get(), 1);
    }

    #[test]
    fn many_reregistrations_keep_one_entry() {
        let mut registry = CallbackRegistry::new();
        let handle = HostHandle::new("n1");
        for _ in 0..10 {
            let (_, closure) = counter();
            registry.register(&handle, "click", closure);
        }
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.events_for(&handle), vec!["click".to_string()]);
    }

    #[test]
    fn distinct_events_coexist() {
        let mut registry = CallbackRegistry::new();
        let handle = HostHandle::new("n1");
        registry.register(&handle, "click", counter().1);
        registry.register(&handle, "input", counter().1);
        assert_eq!(registry.len(), 2);
        assert!(registry.lookup(&handle, "input").is_some());
        assert!(registry.lookup(&handle, "keydown").is_none());
    }

    #[test]
    fn unregister_is_idempotent() {
        let mut registry = CallbackRegistry::new();
        let reg = registry.register(&HostHandle::new("n1"), "click", counter().1);
        assert!(registry.unregister(&reg.id).is_some());
        assert!(registry.unregister(&reg.id).is_none());
        assert!(registry.unregister(&HandlerId::new("garbage")).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn stale_id_does_not_hit_new_entry() {
        let mut registry = CallbackRegistry::new();
        let handle = HostHandle::new("n1");
        let first = registry.register(&handle, "click", counter().1);
        registry.unregister(&first.id);
        let second = registry.register(&handle, "click", counter().1);
        assert_ne!(first.id, second.id);
        assert!(registry.get(&first.id).is_none());
    }

    #[test]
    fn unregister_all_for_handle() {
        let mut registry = CallbackRegistry::new();
        let a = HostHandle::new("n1");
        let b = HostHandle::new("n2");
        registry.register(&a, "click", counter().1);
        registry.register(&a, "input", counter().1);
        registry.register(&b, "click", counter().1);

        let removed = registry.unregister_all(&a);
        assert_eq!(removed.len(), 2);
        assert!(!registry.references(&a));
        assert!(registry.references(&b));
        assert_eq!(registry.len(), 1);
    }
}
