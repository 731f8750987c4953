#![forbid(unsafe_code)]

//! Dependency store: `(container id, property key) → set of subscribed effects`.
//!
//! The store is keyed by [`ObservableId`] — the identity of the *raw* backing
//! storage — never by a wrapper, so distinct wrapper instances over the same
//! raw container land in the same buckets and wrappers over distinct raw
//! containers never collide.
//!
//! # Invariants
//!
//! 1. A dep set contains each effect at most once (pointer identity).
//! 2. Effects are held weakly; a dropped effect handle disappears from all
//!    sets lazily on the next access.
//! 3. Every set an effect joins is also recorded on the effect itself, so
//!    the effect can detach precisely before each re-run.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::effect::EffectInner;
use crate::value::{LeafKey, ObservableId};

/// Which slot of a container a read or write touched.
///
/// `Length` and `Iterate` are the structural sentinels: `Length` covers list
/// length and positional iteration, `Iterate` covers map/set enumeration and
/// size. `Value` is the single slot of refs and computed cells.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropKey {
    /// A named map entry.
    Entry(Rc<str>),
    /// A list position.
    Index(usize),
    /// A set member.
    Member(LeafKey),
    /// List length / positional enumeration.
    Length,
    /// Map/set enumeration and size.
    Iterate,
    /// The single slot of a ref or computed cell.
    Value,
}

/// One shared subscription set. Cloning shares the underlying storage, which
/// is what lets an effect remove itself from the exact sets it joined.
#[derive(Clone)]
pub(crate) struct DepSet {
    effects: Rc<RefCell<Vec<Weak<EffectInner>>>>,
}

impl DepSet {
    fn new() -> Self {
        Self {
            effects: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Add an effect unless it is already present. Dead entries are pruned
    /// on the way through.
    pub(crate) fn add(&self, effect: &Rc<EffectInner>) {
        let mut effects = self.effects.borrow_mut();
        effects.retain(|w| w.strong_count() > 0);
        let present = effects
            .iter()
            .any(|w| w.upgrade().is_some_and(|e| Rc::ptr_eq(&e, effect)));
        if !present {
            effects.push(Rc::downgrade(effect));
        }
    }

    /// Remove one effect by pointer identity.
    pub(crate) fn remove(&self, effect: &Rc<EffectInner>) {
        self.effects
            .borrow_mut()
            .retain(|w| w.upgrade().is_some_and(|e| !Rc::ptr_eq(&e, effect)));
    }

    /// Snapshot the live members. Borrows are released before the caller
    /// dispatches, so subscribers may re-track freely.
    pub(crate) fn collect(&self) -> Vec<Rc<EffectInner>> {
        self.effects
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    pub(crate) fn ptr_eq(&self, other: &DepSet) -> bool {
        Rc::ptr_eq(&self.effects, &other.effects)
    }
}

/// The registry proper: `target → key → dep set`.
#[derive(Default)]
pub(crate) struct DepStore {
    targets: HashMap<ObservableId, HashMap<PropKey, DepSet>>,
}

impl DepStore {
    /// The dep set for `(id, key)`, created on first use.
    pub(crate) fn set_for(&mut self, id: ObservableId, key: PropKey) -> DepSet {
        self.targets
            .entry(id)
            .or_default()
            .entry(key)
            .or_insert_with(DepSet::new)
            .clone()
    }

    /// The dep set for `(id, key)` if any effect ever subscribed to it.
    pub(crate) fn existing(&self, id: ObservableId, key: &PropKey) -> Option<DepSet> {
        self.targets.get(&id)?.get(key).cloned()
    }
}
