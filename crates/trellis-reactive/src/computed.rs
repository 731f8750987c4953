#![forbid(unsafe_code)]

//! Memoized derived values: lazy pull, eager push-of-invalidation.
//!
//! # Design
//!
//! A [`Computed`] wraps a getter in an internal lazy effect whose scheduler,
//! instead of re-running the getter, flips a dirty flag and notifies the
//! computed's own dependents. Reading [`Computed::get`] re-evaluates the
//! getter only while dirty, then caches. This exact shape must hold: eager
//! re-evaluation on every dependency change would defeat memoization.
//!
//! # Invariants
//!
//! 1. Two reads without an intervening dependency change evaluate the
//!    getter once.
//! 2. A dependency change marks dirty and notifies dependents without
//!    evaluating the getter.
//! 3. A setterless computed warns on write and leaves its state untouched.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::warn;

use crate::dep::PropKey;
use crate::effect::{Effect, EffectOptions};
use crate::runtime::Runtime;
use crate::value::{ObservableId, Value};

type Setter = Box<dyn Fn(Value)>;

struct ComputedInner {
    rt: Runtime,
    id: ObservableId,
    effect: Effect,
    dirty: Cell<bool>,
    cached: RefCell<Value>,
    setter: Option<Setter>,
}

/// A memoized derived value. Clones share the same cell.
#[derive(Clone)]
pub struct Computed {
    inner: Rc<ComputedInner>,
}

impl Runtime {
    /// Derive a read-only computed value from `getter`.
    #[must_use]
    pub fn computed(&self, getter: impl FnMut() -> Value + 'static) -> Computed {
        Computed::new(self.clone(), Box::new(getter), None)
    }

    /// Derive a computed value with a write handler.
    #[must_use]
    pub fn computed_with_setter(
        &self,
        getter: impl FnMut() -> Value + 'static,
        setter: impl Fn(Value) + 'static,
    ) -> Computed {
        Computed::new(self.clone(), Box::new(getter), Some(Box::new(setter)))
    }
}

impl Computed {
    fn new(rt: Runtime, getter: Box<dyn FnMut() -> Value>, setter: Option<Setter>) -> Self {
        let id = ObservableId::next();
        let inner = Rc::new_cyclic(|weak: &Weak<ComputedInner>| {
            let invalidate = {
                let weak = weak.clone();
                move |_effect: &Effect| {
                    let Some(inner) = weak.upgrade() else {
                        return;
                    };
                    // Invalidation is pushed once; repeat triggers while
                    // already dirty are silent until the next pull.
                    if !inner.dirty.replace(true) {
                        inner.rt.trigger(inner.id, &[PropKey::Value]);
                    }
                }
            };
            let effect = rt.run_computation(
                getter,
                EffectOptions {
                    lazy: true,
                    scheduler: Some(Rc::new(invalidate)),
                },
            );
            ComputedInner {
                rt: rt.clone(),
                id,
                effect,
                dirty: Cell::new(true),
                cached: RefCell::new(Value::Null),
                setter,
            }
        });
        Self { inner }
    }

    /// Read the derived value, subscribing the active computation and
    /// re-evaluating the getter only if a dependency changed since the
    /// last read.
    #[must_use]
    pub fn get(&self) -> Value {
        self.inner.rt.track(self.inner.id, PropKey::Value);
        if self.inner.dirty.get() {
            let value = self.inner.effect.run();
            *self.inner.cached.borrow_mut() = value;
            self.inner.dirty.set(false);
        }
        self.inner.cached.borrow().clone()
    }

    /// Write through the setter, if one was provided. A setterless computed
    /// reports a diagnostic and ignores the write.
    pub fn set(&self, value: impl Into<Value>) {
        match &self.inner.setter {
            Some(setter) => setter(value.into()),
            None => warn!("write ignored: computed value has no setter"),
        }
    }

    /// Whether the next read will re-evaluate.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }
}

impl std::fmt::Debug for Computed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("dirty", &self.inner.dirty.get())
            .field("cached", &*self.inner.cached.borrow())
            .finish()
    }
}
