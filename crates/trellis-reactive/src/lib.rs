#![forbid(unsafe_code)]

//! Dependency-tracked observable state.
//!
//! # Role in Trellis
//! `trellis-reactive` is the state engine: plain data mutations automatically
//! re-run interested computations exactly once per relevant change, with no
//! explicit subscribe/unsubscribe calls.
//!
//! # Primary responsibilities
//! - **Runtime**: explicit execution context owning the dependency store,
//!   the effect stack, and the batched job queue.
//! - **Observable**: wrapper types intercepting reads/writes on structured
//!   values ([`ObservableMap`], [`ObservableList`], [`ObservableSet`]).
//! - **Effect**: re-runnable computations with precise per-run
//!   re-subscription.
//! - **ValueRef / Computed**: single-value observables and lazily memoized
//!   derived values.
//! - **Scheduler**: deduplicating batched flush with an after-flush hook.
//! - **EffectScope**: grouped disposal of every computation created under
//!   one `run`.
//!
//! # How it fits in the system
//! `trellis-vdom` drives a render computation through this crate: mutate an
//! observable, the store resolves subscribers, the scheduler batches them,
//! and one flush later the render effect produces a fresh tree for the diff
//! engine.

pub mod computed;
pub mod dep;
pub mod effect;
pub mod observable;
pub mod refs;
pub mod runtime;
pub mod scheduler;
pub mod scope;
pub mod value;

pub use computed::Computed;
pub use dep::PropKey;
pub use effect::{Effect, EffectOptions, SchedulerFn};
pub use observable::{Observable, ObservableList, ObservableMap, ObservableSet, is_observable};
pub use refs::ValueRef;
pub use runtime::Runtime;
pub use scope::EffectScope;
pub use value::{LeafKey, ObservableId, Value};
