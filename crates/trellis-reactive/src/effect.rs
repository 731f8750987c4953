#![forbid(unsafe_code)]

//! Re-runnable computations with precise re-subscription.
//!
//! # Design
//!
//! An [`Effect`] wraps a closure together with the list of dependency sets
//! it is currently a member of. Each [`Effect::run`] first detaches the
//! effect from every set recorded on the previous run, then executes the
//! closure while the effect sits on the runtime's execution stack — reads
//! performed during execution re-subscribe it. This makes subscriptions
//! exact per run: a conditional branch that stops reading a property stops
//! being notified about it.
//!
//! # Lifecycle
//!
//! inert → running → (idle | running), terminable to stopped.
//! [`Effect::stop`] detaches permanently; a stopped effect that is still
//! held and manually run executes its closure without re-subscribing.
//!
//! # Ownership
//!
//! Dependency sets hold the effect weakly. Dropping the last [`Effect`]
//! handle (and any clone held by a scheduler queue) therefore unsubscribes
//! it everywhere, RAII-style. Callers that want an effect to keep firing
//! must keep a handle alive.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::dep::DepSet;
use crate::runtime::RuntimeInner;
use crate::value::Value;

/// Scheduling callback invoked instead of a synchronous re-run when one of
/// the effect's dependencies changes.
pub type SchedulerFn = Rc<dyn Fn(&Effect)>;

/// Options accepted by [`Runtime::run_computation`](crate::Runtime::run_computation).
#[derive(Default)]
pub struct EffectOptions {
    /// Skip the initial eager run.
    pub lazy: bool,
    /// Deferred dispatch; `None` means re-run synchronously on trigger.
    pub scheduler: Option<SchedulerFn>,
}

pub(crate) struct EffectInner {
    pub(crate) rt: Weak<RuntimeInner>,
    f: RefCell<Box<dyn FnMut() -> Value>>,
    pub(crate) scheduler: Option<SchedulerFn>,
    active: Cell<bool>,
    /// Every dep set this effect joined during its last run.
    deps: RefCell<Vec<DepSet>>,
}

impl EffectInner {
    /// Record membership in a dep set (called from the tracking path).
    pub(crate) fn record_dep(self: &Rc<Self>, set: &DepSet) {
        let mut deps = self.deps.borrow_mut();
        if !deps.iter().any(|d| d.ptr_eq(set)) {
            deps.push(set.clone());
        }
    }

    /// Detach from every recorded dep set and forget the memberships.
    fn cleanup(self: &Rc<Self>) {
        let deps = std::mem::take(&mut *self.deps.borrow_mut());
        for set in &deps {
            set.remove(self);
        }
    }
}

/// Shared handle to a re-runnable computation.
///
/// Cloning shares the underlying state; the computation stays subscribed as
/// long as at least one handle is alive.
#[derive(Clone)]
pub struct Effect {
    pub(crate) inner: Rc<EffectInner>,
}

impl Effect {
    pub(crate) fn new(
        rt: Weak<RuntimeInner>,
        f: Box<dyn FnMut() -> Value>,
        scheduler: Option<SchedulerFn>,
    ) -> Self {
        Self {
            inner: Rc::new(EffectInner {
                rt,
                f: RefCell::new(f),
                scheduler,
                active: Cell::new(true),
                deps: RefCell::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<EffectInner>) -> Self {
        Self { inner }
    }

    /// Execute the computation, re-subscribing it to everything it reads.
    ///
    /// A stopped effect runs its closure without entering the tracking
    /// context, so it picks up no new subscriptions. Returns the closure's
    /// value (used by computed cells; plain effects return [`Value::Null`]).
    pub fn run(&self) -> Value {
        if !self.inner.active.get() {
            return (self.inner.f.borrow_mut())();
        }
        let Some(rt) = self.inner.rt.upgrade() else {
            return Value::Null;
        };
        // Drop stale subscriptions before re-reading.
        self.inner.cleanup();
        rt.push_effect(Rc::clone(&self.inner));
        let result = (self.inner.f.borrow_mut())();
        rt.pop_effect();
        result
    }

    /// Detach from every dependency set, permanently. Subsequent dependency
    /// changes never reach this effect again, even if it is manually run.
    pub fn stop(&self) {
        if self.inner.active.replace(false) {
            self.inner.cleanup();
        }
    }

    /// Whether the effect still participates in dependency tracking.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// Pointer identity, for dedup in scheduler queues.
    #[must_use]
    pub fn ptr_eq(&self, other: &Effect) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("active", &self.inner.active.get())
            .field("dep_sets", &self.inner.deps.borrow().len())
            .finish()
    }
}
