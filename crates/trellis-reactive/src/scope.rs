#![forbid(unsafe_code)]

//! Grouped effect disposal.
//!
//! An [`EffectScope`] collects every computation created while its
//! [`run`](EffectScope::run) closure executes — effects, computeds, and
//! nested scopes alike — so a single [`stop`](EffectScope::stop) detaches
//! the whole group at once. A component teardown path wants exactly this:
//! it cannot enumerate the watchers its setup code created, but the scope
//! that wrapped the setup can.
//!
//! # Invariants
//!
//! 1. A computation created during `run` is stopped by the scope's `stop`.
//! 2. A scope created during an enclosing scope's `run` is a child: the
//!    parent's `stop` stops it too.
//! 3. `stop` is idempotent; computations created outside any `run` are
//!    never affected.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::warn;

use crate::effect::Effect;
use crate::runtime::Runtime;

pub(crate) struct ScopeInner {
    active: Cell<bool>,
    effects: RefCell<Vec<Effect>>,
    children: RefCell<Vec<EffectScope>>,
}

impl ScopeInner {
    pub(crate) fn register(&self, effect: Effect) {
        self.effects.borrow_mut().push(effect);
    }
}

/// Handle to a disposal group. Cheap to clone; all clones share one group.
#[derive(Clone)]
pub struct EffectScope {
    rt: Runtime,
    inner: Rc<ScopeInner>,
}

impl EffectScope {
    /// Run `f` with this scope collecting every computation it creates.
    ///
    /// Running a stopped scope collects nothing; the closure still runs so
    /// its return value is not lost.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        if !self.inner.active.get() {
            warn!("running an inactive effect scope, nothing will be collected");
            return f();
        }
        self.rt.inner.scopes.borrow_mut().push(Rc::clone(&self.inner));
        let result = f();
        self.rt.inner.scopes.borrow_mut().pop();
        result
    }

    /// Stop every collected computation and child scope. Idempotent.
    pub fn stop(&self) {
        if !self.inner.active.replace(false) {
            return;
        }
        for effect in self.inner.effects.borrow_mut().drain(..) {
            effect.stop();
        }
        for child in self.inner.children.borrow_mut().drain(..) {
            child.stop();
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }
}

impl Runtime {
    /// A fresh disposal group. Created inside an enclosing scope's `run`,
    /// the new scope becomes its child and stops with it.
    #[must_use]
    pub fn scope(&self) -> EffectScope {
        let scope = EffectScope {
            rt: self.clone(),
            inner: Rc::new(ScopeInner {
                active: Cell::new(true),
                effects: RefCell::new(Vec::new()),
                children: RefCell::new(Vec::new()),
            }),
        };
        if let Some(parent) = self.inner.scopes.borrow().last() {
            parent.children.borrow_mut().push(scope.clone());
        }
        scope
    }
}
