#![forbid(unsafe_code)]

//! The reactive runtime: execution context, tracking, and triggering.
//!
//! # Design
//!
//! All ambient state — the dependency store, the stack of currently running
//! effects, the tracking pause counter, and the job queue — lives on one
//! explicit [`Runtime`] object rather than a hidden global. Observables
//! carry a handle to the runtime that created them, so tracking and
//! triggering are attributable and testable in isolation: two runtimes
//! never interfere.
//!
//! # Concurrency
//!
//! Single-threaded and cooperative. `Runtime` is neither `Send` nor `Sync`;
//! the only deferred work is the scheduler flush (see
//! [`scheduler`](crate::scheduler)).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::dep::{DepStore, PropKey};
use crate::effect::{Effect, EffectInner, EffectOptions};
use crate::scope::ScopeInner;
use crate::value::{ObservableId, Value};

pub(crate) struct RuntimeInner {
    store: RefCell<DepStore>,
    /// Stack of running effects; the top is the active computation that
    /// reads subscribe. Nested runs restore the enclosing effect on pop.
    stack: RefCell<Vec<Rc<EffectInner>>>,
    /// When > 0, reads register nothing. Used by list mutators to avoid
    /// re-subscription storms from a single logical mutation.
    pause_depth: Cell<u32>,
    /// Stack of scopes whose `run` is executing; new computations register
    /// with the top one for grouped disposal.
    pub(crate) scopes: RefCell<Vec<Rc<ScopeInner>>>,
    /// Pending batched jobs, insertion-ordered, deduplicated by identity.
    pub(crate) jobs: RefCell<Vec<Rc<EffectInner>>>,
    pub(crate) flushing: Cell<bool>,
    pub(crate) after_flush: RefCell<Vec<Box<dyn FnOnce()>>>,
}

/// Shared handle to a reactive runtime. Cheap to clone; all clones refer to
/// the same dependency store and job queue.
#[derive(Clone)]
pub struct Runtime {
    pub(crate) inner: Rc<RuntimeInner>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                store: RefCell::new(DepStore::default()),
                stack: RefCell::new(Vec::new()),
                pause_depth: Cell::new(0),
                scopes: RefCell::new(Vec::new()),
                jobs: RefCell::new(Vec::new()),
                flushing: Cell::new(false),
                after_flush: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Create and eagerly run a computation.
    pub fn effect(&self, mut f: impl FnMut() + 'static) -> Effect {
        self.run_computation(
            move || {
                f();
                Value::Null
            },
            EffectOptions::default(),
        )
    }

    /// Create a computation with explicit options. Runs immediately unless
    /// `options.lazy` is set; on dependency changes the scheduler (if any)
    /// is invoked instead of a synchronous re-run.
    pub fn run_computation(
        &self,
        f: impl FnMut() -> Value + 'static,
        options: EffectOptions,
    ) -> Effect {
        let effect = Effect::new(Rc::downgrade(&self.inner), Box::new(f), options.scheduler);
        if let Some(scope) = self.inner.scopes.borrow().last() {
            scope.register(effect.clone());
        }
        if !options.lazy {
            effect.run();
        }
        effect
    }

    /// Run `f` with dependency tracking suspended.
    pub(crate) fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.pause_depth.set(self.inner.pause_depth.get() + 1);
        let result = f();
        self.inner.pause_depth.set(self.inner.pause_depth.get() - 1);
        result
    }

    /// Register the active computation (if any) against `(id, key)`.
    pub(crate) fn track(&self, id: ObservableId, key: PropKey) {
        self.inner.track(id, key);
    }

    /// Notify every computation subscribed to any of `keys` on `id`.
    pub(crate) fn trigger(&self, id: ObservableId, keys: &[PropKey]) {
        self.inner.trigger(id, keys);
    }
}

impl RuntimeInner {
    pub(crate) fn push_effect(&self, effect: Rc<EffectInner>) {
        self.stack.borrow_mut().push(effect);
    }

    pub(crate) fn pop_effect(&self) {
        self.stack.borrow_mut().pop();
    }

    fn active_effect(&self) -> Option<Rc<EffectInner>> {
        self.stack.borrow().last().cloned()
    }

    pub(crate) fn track(&self, id: ObservableId, key: PropKey) {
        if self.pause_depth.get() > 0 {
            return;
        }
        let Some(effect) = self.active_effect() else {
            return;
        };
        let set = self.store.borrow_mut().set_for(id, key);
        set.add(&effect);
        effect.record_dep(&set);
    }

    pub(crate) fn trigger(&self, id: ObservableId, keys: &[PropKey]) {
        // Snapshot subscribers for all keys before dispatching, so the
        // dispatch itself (which re-tracks) cannot mutate what we iterate.
        let active = self.active_effect();
        let mut to_run: Vec<Rc<EffectInner>> = Vec::new();
        {
            let store = self.store.borrow();
            for key in keys {
                let Some(set) = store.existing(id, key) else {
                    continue;
                };
                for effect in set.collect() {
                    // Never dispatch the currently running effect: an effect
                    // writing a property it also reads must not recurse.
                    if active.as_ref().is_some_and(|a| Rc::ptr_eq(a, &effect)) {
                        continue;
                    }
                    if !to_run.iter().any(|e| Rc::ptr_eq(e, &effect)) {
                        to_run.push(effect);
                    }
                }
            }
        }
        for inner in to_run {
            let effect = Effect::from_inner(inner);
            match &effect.inner.scheduler {
                Some(scheduler) => scheduler.clone()(&effect),
                None => {
                    effect.run();
                }
            }
        }
    }
}
