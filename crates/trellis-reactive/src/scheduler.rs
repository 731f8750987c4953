#![forbid(unsafe_code)]

//! Batched job flushing.
//!
//! # Design
//!
//! The queue is the microtask analogue of this runtime: mutations performed
//! during one synchronous turn enqueue their effects (deduplicated, in first
//! -insertion order), and [`Runtime::flush`] ends the turn by draining the
//! queue once. Jobs enqueued *while* the queue is draining are appended and
//! run in the same drain, after everything already pending — the "a flush
//! may enqueue further flushes" rule.
//!
//! # Invariants
//!
//! 1. N triggers of one effect within a turn run it exactly once per flush.
//! 2. Jobs run in the order they were first enqueued during the turn.
//! 3. [`Runtime::after_flush`] callbacks run after the drain completes, in
//!    FIFO order, exactly once.
//! 4. A nested `flush()` call while already flushing is a no-op; the outer
//!    drain picks up whatever was queued.
//! 5. A pending job whose effect was stopped before the drain reaches it is
//!    skipped, not run.

use std::rc::Rc;

use crate::effect::{Effect, SchedulerFn};
use crate::runtime::Runtime;

impl Runtime {
    /// Enqueue an effect for the next flush. Idempotent within one turn:
    /// an effect already pending is not enqueued twice.
    pub fn queue_job(&self, effect: &Effect) {
        let mut jobs = self.inner.jobs.borrow_mut();
        if !jobs.iter().any(|j| Rc::ptr_eq(j, &effect.inner)) {
            jobs.push(Rc::clone(&effect.inner));
        }
    }

    /// Drain the pending queue, running each batched effect once, then run
    /// the `after_flush` callbacks.
    pub fn flush(&self) {
        if self.inner.flushing.replace(true) {
            return;
        }
        // Index walk instead of draining up front: jobs appended during the
        // drain must still run in this flush.
        let mut i = 0;
        loop {
            let job = self.inner.jobs.borrow().get(i).cloned();
            match job {
                Some(inner) => {
                    // An effect stopped after it was enqueued stays in the
                    // queue but must not run: stop means detach.
                    let effect = Effect::from_inner(inner);
                    if effect.is_active() {
                        effect.run();
                    }
                    i += 1;
                }
                None => break,
            }
        }
        self.inner.jobs.borrow_mut().clear();
        self.inner.flushing.set(false);

        let callbacks = std::mem::take(&mut *self.inner.after_flush.borrow_mut());
        for cb in callbacks {
            cb();
        }
    }

    /// Run `f` once, after the current (or next) flush finishes draining.
    pub fn after_flush(&self, f: impl FnOnce() + 'static) {
        self.inner.after_flush.borrow_mut().push(Box::new(f));
    }

    /// Number of jobs currently pending. Exposed for tests and diagnostics.
    #[must_use]
    pub fn pending_jobs(&self) -> usize {
        self.inner.jobs.borrow().len()
    }

    /// The batching scheduler: effects created with this callback are queued
    /// and deduplicated rather than re-run synchronously on each trigger.
    #[must_use]
    pub fn queue_scheduler(&self) -> SchedulerFn {
        let rt = self.clone();
        Rc::new(move |effect: &Effect| {
            rt.queue_job(effect);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::EffectOptions;
    use crate::value::Value;
    use std::cell::{Cell, RefCell};

    fn counting_effect(rt: &Runtime, runs: &Rc<Cell<u32>>) -> Effect {
        let runs = Rc::clone(runs);
        rt.run_computation(
            move || {
                runs.set(runs.get() + 1);
                Value::Null
            },
            EffectOptions {
                lazy: true,
                scheduler: Some(rt.queue_scheduler()),
            },
        )
    }

    #[test]
    fn queue_dedups_within_turn() {
        let rt = Runtime::new();
        let runs = Rc::new(Cell::new(0u32));
        let e = counting_effect(&rt, &runs);

        rt.queue_job(&e);
        rt.queue_job(&e);
        rt.queue_job(&e);
        assert_eq!(rt.pending_jobs(), 1);

        rt.flush();
        assert_eq!(runs.get(), 1);
        assert_eq!(rt.pending_jobs(), 0);
    }

    #[test]
    fn jobs_run_in_first_insertion_order() {
        let rt = Runtime::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let mut effects = Vec::new();
        for name in ['a', 'b', 'c'] {
            let log = Rc::clone(&log);
            effects.push(rt.run_computation(
                move || {
                    log.borrow_mut().push(name);
                    Value::Null
                },
                EffectOptions {
                    lazy: true,
                    scheduler: Some(rt.queue_scheduler()),
                },
            ));
        }

        rt.queue_job(&effects[1]);
        rt.queue_job(&effects[0]);
        rt.queue_job(&effects[2]);
        rt.queue_job(&effects[0]); // repeat keeps original slot
        rt.flush();
        assert_eq!(*log.borrow(), vec!['b', 'a', 'c']);
    }

    #[test]
    fn jobs_enqueued_during_flush_run_in_same_drain() {
        let rt = Runtime::new();
        let runs = Rc::new(Cell::new(0u32));
        let second = counting_effect(&rt, &runs);

        let rt2 = rt.clone();
        let second2 = second.clone();
        let first = rt.run_computation(
            move || {
                rt2.queue_job(&second2);
                Value::Null
            },
            EffectOptions {
                lazy: true,
                scheduler: Some(rt.queue_scheduler()),
            },
        );

        rt.queue_job(&first);
        rt.flush();
        assert_eq!(runs.get(), 1);
        assert_eq!(rt.pending_jobs(), 0);
    }

    #[test]
    fn after_flush_runs_after_drain_in_fifo_order() {
        let rt = Runtime::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let log2 = Rc::clone(&log);
        let e = rt.run_computation(
            move || {
                log2.borrow_mut().push("job");
                Value::Null
            },
            EffectOptions {
                lazy: true,
                scheduler: Some(rt.queue_scheduler()),
            },
        );
        rt.queue_job(&e);

        let log3 = Rc::clone(&log);
        rt.after_flush(move || log3.borrow_mut().push("cb1"));
        let log4 = Rc::clone(&log);
        rt.after_flush(move || log4.borrow_mut().push("cb2"));

        rt.flush();
        assert_eq!(*log.borrow(), vec!["job", "cb1", "cb2"]);
    }

    #[test]
    fn after_flush_without_jobs_still_runs() {
        let rt = Runtime::new();
        let ran = Rc::new(Cell::new(false));
        let ran2 = Rc::clone(&ran);
        rt.after_flush(move || ran2.set(true));
        rt.flush();
        assert!(ran.get());
    }

    #[test]
    fn effect_stopped_while_queued_is_skipped() {
        let rt = Runtime::new();
        let runs = Rc::new(Cell::new(0u32));
        let e = counting_effect(&rt, &runs);

        rt.queue_job(&e);
        e.stop();
        rt.flush();
        assert_eq!(runs.get(), 0);
        assert_eq!(rt.pending_jobs(), 0);
    }

    #[test]
    fn flush_with_empty_queue_is_noop() {
        let rt = Runtime::new();
        rt.flush();
        assert_eq!(rt.pending_jobs(), 0);
    }
}
