#![forbid(unsafe_code)]

//! Single-value observables.
//!
//! A [`ValueRef`] is a boxed value with its own dependency slot: reading
//! subscribes the active computation, writing notifies only when the value
//! actually changed under [`Value`] equality. Structured values are stored
//! raw and wrapped lazily when read through [`ValueRef::get_observed`];
//! the shallow variant skips that wrapping.

use std::cell::RefCell;
use std::rc::Rc;

use crate::dep::PropKey;
use crate::observable::{Mode, Observable};
use crate::runtime::Runtime;
use crate::value::{ObservableId, Value};

struct RefInner {
    rt: Runtime,
    id: ObservableId,
    value: RefCell<Value>,
    shallow: bool,
}

/// A single observable value cell. Clones share the same cell.
#[derive(Clone)]
pub struct ValueRef {
    inner: Rc<RefInner>,
}

impl Runtime {
    /// Create a ref holding `value`.
    #[must_use]
    pub fn new_ref(&self, value: impl Into<Value>) -> ValueRef {
        ValueRef::new(self.clone(), value.into(), false)
    }

    /// Create a ref whose reads never wrap nested containers.
    #[must_use]
    pub fn new_shallow_ref(&self, value: impl Into<Value>) -> ValueRef {
        ValueRef::new(self.clone(), value.into(), true)
    }
}

impl ValueRef {
    fn new(rt: Runtime, value: Value, shallow: bool) -> Self {
        Self {
            inner: Rc::new(RefInner {
                rt,
                id: ObservableId::next(),
                value: RefCell::new(value),
                shallow,
            }),
        }
    }

    /// Read the raw value, subscribing the active computation.
    #[must_use]
    pub fn get(&self) -> Value {
        self.inner.rt.track(self.inner.id, PropKey::Value);
        self.inner.value.borrow().clone()
    }

    /// Read with lazy deep wrapping: structured values come back as
    /// observables over the stored raw container.
    #[must_use]
    pub fn get_observed(&self) -> Observable {
        let value = self.get();
        if self.inner.shallow {
            Observable::Leaf(value)
        } else {
            self.inner.rt.wrap(value, Mode::DEEP)
        }
    }

    /// Write the value. Observables are unwrapped to their raw container;
    /// subscribers are notified only if the new value differs from the old.
    pub fn set(&self, value: impl Into<Value>) {
        let value = value.into();
        let changed = {
            let mut slot = self.inner.value.borrow_mut();
            if *slot == value {
                false
            } else {
                *slot = value;
                true
            }
        };
        if changed {
            self.inner.rt.trigger(self.inner.id, &[PropKey::Value]);
        }
    }

    /// Read without subscribing.
    #[must_use]
    pub fn peek(&self) -> Value {
        self.inner.value.borrow().clone()
    }
}

impl std::fmt::Debug for ValueRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueRef")
            .field("value", &*self.inner.value.borrow())
            .finish()
    }
}
