//! Remembered state: values that survive recomposition and hydration.
//!
//! A [`MutableState`] is created once per `(componentId, stateKey)` and handed
//! back on every later pass. Its first value comes from the hydration snapshot
//! when one is present; every write goes back into the snapshot and requests a
//! recomposition.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::compose::ComposeError;
use crate::hydrate::SharedSnapshot;
use crate::schedule::RecomposeHandle;

struct StateInner<T> {
    value: RefCell<T>,
    component_id: String,
    key: String,
    snapshot: SharedSnapshot,
    recompose: RecomposeHandle,
}

impl<T: Serialize> StateInner<T> {
    fn persist(&self) {
        let value = match serde_json::to_value(&*self.value.borrow()) {
            Ok(value) => value,
            Err(err) => {
                warn!(component = %self.component_id, key = %self.key, %err, "state is not serializable");
                return;
            }
        };
        if let Err(err) = self
            .snapshot
            .borrow_mut()
            .write(&self.component_id, &self.key, value)
        {
            debug!(%err, "state left out of snapshot");
        }
    }
}

/// Handle to one remembered value. Clones share the value.
pub struct MutableState<T: 'static> {
    inner: Rc<StateInner<T>>,
}

impl<T: 'static> Clone for MutableState<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for MutableState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutableState")
            .field("component_id", &self.inner.component_id)
            .field("key", &self.inner.key)
            .field("value", &*self.inner.value.borrow())
            .finish()
    }
}

impl<T: Serialize + 'static> MutableState<T> {
    /// Read the current value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }

    /// Read by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Overwrite the value, persist it, and request recomposition.
    pub fn set(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
        self.inner.persist();
        self.inner.recompose.request();
    }

    /// Mutate the value in place, persist it, and request recomposition.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.inner.value.borrow_mut());
        self.inner.persist();
        self.inner.recompose.request();
    }
}

// ---------------------------------------------------------------------------
// StateTable
// ---------------------------------------------------------------------------

/// Per-renderer storage of remembered state.
pub struct StateTable {
    slots: HashMap<(String, String), Rc<dyn Any>>,
    snapshot: SharedSnapshot,
    recompose: RecomposeHandle,
}

impl fmt::Debug for StateTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateTable")
            .field("slots", &self.slots.len())
            .finish_non_exhaustive()
    }
}

impl StateTable {
    pub fn new(snapshot: SharedSnapshot, recompose: RecomposeHandle) -> Self {
        Self {
            slots: HashMap::new(),
            snapshot,
            recompose,
        }
    }

    /// The state for `(component_id, key)`, created on first use.
    ///
    /// A snapshot value that does not deserialize as `T` is logged and `init`
    /// is used instead.
    pub fn remember<T>(
        &mut self,
        component_id: &str,
        key: &str,
        init: impl FnOnce() -> T,
    ) -> Result<MutableState<T>, ComposeError>
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        let slot = (component_id.to_owned(), key.to_owned());
        if let Some(existing) = self.slots.get(&slot) {
            return Rc::clone(existing)
                .downcast::<StateInner<T>>()
                .map(|inner| MutableState { inner })
                .map_err(|_| ComposeError::StateType {
                    component_id: component_id.to_owned(),
                    key: key.to_owned(),
                });
        }

        let restored = self.snapshot.borrow().read(component_id, key);
        let value = match restored.map(serde_json::from_value::<T>) {
            Some(Ok(value)) => {
                debug!(component = component_id, key, "restored state from snapshot");
                value
            }
            Some(Err(err)) => {
                warn!(component = component_id, key, %err, "snapshot value does not fit, using initial value");
                init()
            }
            None => init(),
        };

        let inner = Rc::new(StateInner {
            value: RefCell::new(value),
            component_id: component_id.to_owned(),
            key: key.to_owned(),
            snapshot: Rc::clone(&self.snapshot),
            recompose: self.recompose.clone(),
        });
        inner.persist();
        self.slots.insert(slot, Rc::clone(&inner) as Rc<dyn Any>);
        Ok(MutableState { inner })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Forget every remembered value.
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
