#![forbid(unsafe_code)]

//! Reactive render loop: one tracked render function per mounted root.
//!
//! A `RenderRoot` runs its render function inside a reactive computation
//! whose scheduler queues a re-render instead of running it inline. Any
//! number of state writes between flushes collapse into one diff pass
//! against the previous tree; `Runtime::flush` drains the queue and drives
//! the patches.
//!
//! # Invariants
//!
//! | Invariant | Meaning |
//! |-----------|---------|
//! | One tree per root | Each flush diffs against exactly the previous render |
//! | Writes coalesce | N writes between flushes produce at most one re-render |
//! | Drop is detach | `unmount` stops tracking and removes the physical tree |

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;
use trellis_reactive::{Effect, EffectOptions, Runtime, Value};

use crate::host::{Host, HostHandle};
use crate::node::VNode;
use crate::patch::Patcher;

/// A mounted reactive tree: render function, previous render, host slot.
pub struct RenderRoot<H: Host + 'static> {
    host: Rc<RefCell<H>>,
    prev: Rc<RefCell<Option<VNode>>>,
    effect: Effect,
}

impl<H: Host + 'static> RenderRoot<H> {
    /// Mount `render`'s output under `container` and keep it current.
    ///
    /// The first render happens synchronously. Later state writes queue the
    /// re-render on `rt`'s job queue; call [`Runtime::flush`] to apply them.
    pub fn mount(
        rt: &Runtime,
        host: Rc<RefCell<H>>,
        container: HostHandle,
        mut render: impl FnMut() -> VNode + 'static,
    ) -> Self {
        let prev: Rc<RefCell<Option<VNode>>> = Rc::new(RefCell::new(None));
        let effect = {
            let host = Rc::clone(&host);
            let prev = Rc::clone(&prev);
            rt.run_computation(
                move || {
                    let next = render();
                    {
                        let mut host = host.borrow_mut();
                        let prev = prev.borrow();
                        trace!(remount = prev.is_some(), "render root pass");
                        Patcher::new(&mut *host).patch(prev.as_ref(), &next, container, None);
                    }
                    *prev.borrow_mut() = Some(next);
                    Value::Null
                },
                EffectOptions {
                    lazy: false,
                    scheduler: Some(rt.queue_scheduler()),
                },
            )
        };
        Self { host, prev, effect }
    }

    /// Handle of the most recent render's first physical node.
    #[must_use]
    pub fn first_handle(&self) -> Option<HostHandle> {
        self.prev.borrow().as_ref().and_then(VNode::first_handle)
    }

    /// Whether the root still reacts to state changes.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.effect.is_active()
    }

    /// Stop tracking and remove the rendered tree from the host.
    pub fn unmount(self) {
        self.effect.stop();
        if let Some(prev) = self.prev.borrow_mut().take() {
            let mut host = self.host.borrow_mut();
            Patcher::new(&mut *host).unmount(&prev);
        }
    }
}

#[cfg(test)]
mod tests {
    use trellis_reactive::Value;

    use super::*;
    use crate::host::RecordingHost;

    fn setup() -> (Runtime, Rc<RefCell<RecordingHost>>, HostHandle) {
        let rt = Runtime::new();
        let host = Rc::new(RefCell::new(RecordingHost::new()));
        let root = host.borrow_mut().create_root();
        (rt, host, root)
    }

    #[test]
    fn initial_render_is_synchronous() {
        let (rt, host, root) = setup();
        let state = rt.new_ref(Value::from("hello"));
        let read = state.clone();
        let _mounted = RenderRoot::mount(&rt, Rc::clone(&host), root, move || {
            VNode::element("p").text_children(read.get().as_str().unwrap_or(""))
        });
        assert_eq!(host.borrow().child_labels(root), vec!["p"]);
    }

    #[test]
    fn writes_coalesce_into_one_rerender() {
        let (rt, host, root) = setup();
        let count = rt.new_ref(Value::from(0));
        let read = count.clone();
        let mounted = RenderRoot::mount(&rt, Rc::clone(&host), root, move || {
            VNode::element("p").text_children(read.get().as_int().unwrap_or(0).to_string())
        });
        let first = mounted.first_handle().unwrap();

        for n in 1..=10 {
            count.set(Value::from(n));
        }
        // Nothing applied until the flush.
        assert_eq!(host.borrow().text_of(first), "0");
        assert_eq!(rt.pending_jobs(), 1);

        rt.flush();
        assert_eq!(host.borrow().text_of(first), "10");
        assert_eq!(rt.pending_jobs(), 0);
    }

    #[test]
    fn rerender_diffs_against_previous_tree() {
        let (rt, host, root) = setup();
        let flag = rt.new_ref(Value::from(false));
        let read = flag.clone();
        let mounted = RenderRoot::mount(&rt, Rc::clone(&host), root, move || {
            let on = read.get().as_bool().unwrap_or(false);
            VNode::element("div")
                .prop("state", if on { "on" } else { "off" })
                .text_children(if on { "yes" } else { "no" })
        });
        let div = mounted.first_handle().unwrap();
        assert_eq!(host.borrow().attr_of(div, "state"), Some(Value::from("off")));

        flag.set(Value::from(true));
        rt.flush();
        // Same element patched in place, not replaced.
        assert_eq!(mounted.first_handle(), Some(div));
        assert_eq!(host.borrow().attr_of(div, "state"), Some(Value::from("on")));
        assert_eq!(host.borrow().text_of(div), "yes");
    }

    #[test]
    fn unmount_detaches_and_stops_reacting() {
        let (rt, host, root) = setup();
        let state = rt.new_ref(Value::from("x"));
        let read = state.clone();
        let mounted = RenderRoot::mount(&rt, Rc::clone(&host), root, move || {
            VNode::element("p").text_children(read.get().as_str().unwrap_or(""))
        });
        let p = mounted.first_handle().unwrap();
        assert!(mounted.is_active());

        mounted.unmount();
        assert!(!host.borrow().is_attached(p));

        state.set(Value::from("y"));
        assert_eq!(rt.pending_jobs(), 0);
        rt.flush();
        assert_eq!(host.borrow().text_of(p), "x");
    }

    #[test]
    fn unmount_with_pending_rerender_does_not_remount() {
        let (rt, host, root) = setup();
        let state = rt.new_ref(Value::from("x"));
        let read = state.clone();
        let mounted = RenderRoot::mount(&rt, Rc::clone(&host), root, move || {
            VNode::element("p").text_children(read.get().as_str().unwrap_or(""))
        });

        // Write first, unmount with the re-render still queued, then flush.
        state.set(Value::from("y"));
        assert_eq!(rt.pending_jobs(), 1);
        mounted.unmount();
        rt.flush();

        assert!(host.borrow().child_labels(root).is_empty());
        assert_eq!(rt.pending_jobs(), 0);
    }
}
