#![forbid(unsafe_code)]

//! Observable wrappers over raw structured values.
//!
//! # Design
//!
//! Instead of ambient property-trap interception, each container shape has
//! an explicit wrapper type with typed accessors that call into the
//! dependency store: [`ObservableMap`], [`ObservableList`], [`ObservableSet`],
//! unified behind the [`Observable`] enum. A wrapper is a thin handle —
//! `(runtime, Rc<raw storage>, mode)` — so wrapping is identity-stable:
//! observing the same raw value twice yields wrappers over the same storage,
//! and observing a value that is already wrapped is a no-op.
//!
//! Reads register the active computation against `(raw id, key)`; structured
//! results are wrapped lazily on the way out (deep mode) or returned raw
//! (shallow mode). Writes compare old against new and notify only on actual
//! change, distinguishing "add" from "set" so enumeration-based computations
//! stay correct.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Write through a readonly wrapper | `warn!` diagnostic, no-op |
//! | Index read past end of list | tracks the index, returns `Null` |
//! | Index write past end of list | extends with `Null`, counts as add |

use std::rc::Rc;

use tracing::warn;

use crate::dep::PropKey;
use crate::runtime::Runtime;
use crate::value::{LeafKey, ObservableId, RawList, RawMap, RawSet, Value};

/// Wrapping mode, mirroring the deep/shallow × mutable/readonly matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Mode {
    pub(crate) shallow: bool,
    pub(crate) readonly: bool,
}

impl Mode {
    pub(crate) const DEEP: Mode = Mode {
        shallow: false,
        readonly: false,
    };
    pub(crate) const SHALLOW: Mode = Mode {
        shallow: true,
        readonly: false,
    };
    pub(crate) const READONLY: Mode = Mode {
        shallow: false,
        readonly: true,
    };
    pub(crate) const SHALLOW_READONLY: Mode = Mode {
        shallow: true,
        readonly: true,
    };
}

/// A value observed through some runtime: a structured wrapper or a leaf
/// passed through unchanged.
#[derive(Clone)]
pub enum Observable {
    Map(ObservableMap),
    List(ObservableList),
    Set(ObservableSet),
    Leaf(Value),
}

impl Observable {
    /// The raw value behind this observable. Wrappers unwrap to the shared
    /// container value; leaves return themselves.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Observable::Map(m) => Value::Map(Rc::clone(&m.raw)),
            Observable::List(l) => Value::List(Rc::clone(&l.raw)),
            Observable::Set(s) => Value::Set(Rc::clone(&s.raw)),
            Observable::Leaf(v) => v.clone(),
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&ObservableMap> {
        match self {
            Observable::Map(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&ObservableList> {
        match self {
            Observable::List(l) => Some(l),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_set(&self) -> Option<&ObservableSet> {
        match self {
            Observable::Set(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_leaf(&self) -> Option<&Value> {
        match self {
            Observable::Leaf(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Observable> for Value {
    fn from(o: Observable) -> Value {
        o.to_value()
    }
}

/// Whether wrapping this value produces a tracking wrapper (structured
/// containers) rather than a leaf passthrough.
#[must_use]
pub fn is_observable(value: &Value) -> bool {
    value.is_structured()
}

impl Runtime {
    /// Wrap a value for deep reactive access. Leaves pass through; wrapping
    /// the same container twice yields wrappers sharing the same storage.
    #[must_use]
    pub fn observe(&self, value: Value) -> Observable {
        self.wrap(value, Mode::DEEP)
    }

    /// Wrap for reactive access without recursing into nested containers.
    #[must_use]
    pub fn observe_shallow(&self, value: Value) -> Observable {
        self.wrap(value, Mode::SHALLOW)
    }

    /// Wrap read-only: reads do not track, writes warn and no-op, nested
    /// reads come back readonly too.
    #[must_use]
    pub fn readonly(&self, value: Value) -> Observable {
        self.wrap(value, Mode::READONLY)
    }

    /// Read-only without nested wrapping.
    #[must_use]
    pub fn shallow_readonly(&self, value: Value) -> Observable {
        self.wrap(value, Mode::SHALLOW_READONLY)
    }

    pub(crate) fn wrap(&self, value: Value, mode: Mode) -> Observable {
        match value {
            Value::Map(raw) => Observable::Map(ObservableMap {
                rt: self.clone(),
                raw,
                mode,
            }),
            Value::List(raw) => Observable::List(ObservableList {
                rt: self.clone(),
                raw,
                mode,
            }),
            Value::Set(raw) => Observable::Set(ObservableSet {
                rt: self.clone(),
                raw,
                mode,
            }),
            leaf => Observable::Leaf(leaf),
        }
    }
}

fn wrap_read(rt: &Runtime, value: Value, mode: Mode) -> Observable {
    if mode.shallow {
        Observable::Leaf(value)
    } else {
        rt.wrap(value, mode)
    }
}

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

/// Observable wrapper over a string-keyed record/map.
#[derive(Clone)]
pub struct ObservableMap {
    rt: Runtime,
    raw: Rc<RawMap>,
    mode: Mode,
}

impl ObservableMap {
    #[must_use]
    pub fn id(&self) -> ObservableId {
        self.raw.id
    }

    /// Read an entry, subscribing the active computation to its key.
    /// Structured results come back wrapped (deep mode) or raw (shallow).
    /// A missing entry reads as `Null` but still subscribes, so a later add
    /// re-runs the reader.
    #[must_use]
    pub fn get(&self, key: &str) -> Observable {
        if !self.mode.readonly {
            self.rt.track(self.raw.id, PropKey::Entry(Rc::from(key)));
        }
        let value = self
            .raw
            .entries
            .borrow()
            .get(key)
            .cloned()
            .unwrap_or(Value::Null);
        wrap_read(&self.rt, value, self.mode)
    }

    /// Read an entry as a raw value (still tracked).
    #[must_use]
    pub fn get_value(&self, key: &str) -> Value {
        self.get(key).to_value()
    }

    /// Write an entry. Stores the *raw* value (observables are unwrapped),
    /// notifies key subscribers only on actual change, and notifies
    /// enumeration subscribers when the key is new.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        if self.mode.readonly {
            warn!(key, "set on readonly map ignored");
            return;
        }
        let value = value.into();
        let key: Rc<str> = Rc::from(key);
        let (had, changed) = {
            let mut entries = self.raw.entries.borrow_mut();
            let old = entries.get(&key).cloned();
            let had = old.is_some();
            let changed = old.as_ref() != Some(&value);
            if changed {
                entries.insert(Rc::clone(&key), value);
            }
            (had, changed)
        };
        if !had {
            self.rt
                .trigger(self.raw.id, &[PropKey::Entry(key), PropKey::Iterate]);
        } else if changed {
            self.rt.trigger(self.raw.id, &[PropKey::Entry(key)]);
        }
    }

    /// Existence check, tracked under the specific key.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        if !self.mode.readonly {
            self.rt.track(self.raw.id, PropKey::Entry(Rc::from(key)));
        }
        self.raw.entries.borrow().contains_key(key)
    }

    /// Remove an entry. Only a deletion that actually removed something
    /// notifies, under both the key and the enumeration sentinel.
    pub fn delete(&self, key: &str) -> bool {
        if self.mode.readonly {
            warn!(key, "delete on readonly map ignored");
            return false;
        }
        let key: Rc<str> = Rc::from(key);
        let removed = self.raw.entries.borrow_mut().remove(&key).is_some();
        if removed {
            self.rt
                .trigger(self.raw.id, &[PropKey::Entry(key), PropKey::Iterate]);
        }
        removed
    }

    /// Entry count, tracked structurally.
    #[must_use]
    pub fn len(&self) -> usize {
        if !self.mode.readonly {
            self.rt.track(self.raw.id, PropKey::Iterate);
        }
        self.raw.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the keys, tracked structurally.
    #[must_use]
    pub fn keys(&self) -> Vec<Rc<str>> {
        if !self.mode.readonly {
            self.rt.track(self.raw.id, PropKey::Iterate);
        }
        self.raw.entries.borrow().keys().cloned().collect()
    }

    /// Same raw storage (wrapping identity).
    #[must_use]
    pub fn same_raw(&self, other: &ObservableMap) -> bool {
        Rc::ptr_eq(&self.raw, &other.raw)
    }
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// Observable wrapper over an ordered list.
#[derive(Clone)]
pub struct ObservableList {
    rt: Runtime,
    raw: Rc<RawList>,
    mode: Mode,
}

impl ObservableList {
    #[must_use]
    pub fn id(&self) -> ObservableId {
        self.raw.id
    }

    /// Read a position, subscribing to that index.
    #[must_use]
    pub fn get(&self, index: usize) -> Observable {
        if !self.mode.readonly {
            self.rt.track(self.raw.id, PropKey::Index(index));
        }
        let value = self
            .raw
            .items
            .borrow()
            .get(index)
            .cloned()
            .unwrap_or(Value::Null);
        wrap_read(&self.rt, value, self.mode)
    }

    /// Write a position. A write past the end extends the list with `Null`
    /// and counts as an add, notifying length subscribers as well — this is
    /// what keeps iteration-based computations correct.
    pub fn set(&self, index: usize, value: impl Into<Value>) {
        if self.mode.readonly {
            warn!(index, "set on readonly list ignored");
            return;
        }
        let value = value.into();
        let (grew, changed) = {
            let mut items = self.raw.items.borrow_mut();
            if index >= items.len() {
                items.resize(index + 1, Value::Null);
                items[index] = value;
                (true, true)
            } else if items[index] != value {
                items[index] = value;
                (false, true)
            } else {
                (false, false)
            }
        };
        if grew {
            self.rt
                .trigger(self.raw.id, &[PropKey::Index(index), PropKey::Length]);
        } else if changed {
            self.rt.trigger(self.raw.id, &[PropKey::Index(index)]);
        }
    }

    /// Length, tracked structurally.
    #[must_use]
    pub fn len(&self) -> usize {
        if !self.mode.readonly {
            self.rt.track(self.raw.id, PropKey::Length);
        }
        self.raw.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append. The mutation runs with tracking paused (one logical mutation
    /// must not flood the current computation with index subscriptions),
    /// then notifies the new index and the length set.
    pub fn push(&self, value: impl Into<Value>) {
        if self.mode.readonly {
            warn!("push on readonly list ignored");
            return;
        }
        let value = value.into();
        let index = self.rt.untracked(|| {
            let mut items = self.raw.items.borrow_mut();
            items.push(value);
            items.len() - 1
        });
        self.rt
            .trigger(self.raw.id, &[PropKey::Index(index), PropKey::Length]);
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Option<Value> {
        if self.mode.readonly {
            warn!("pop on readonly list ignored");
            return None;
        }
        let (popped, index) = self.rt.untracked(|| {
            let mut items = self.raw.items.borrow_mut();
            let popped = items.pop();
            (popped, items.len())
        });
        if popped.is_some() {
            self.rt
                .trigger(self.raw.id, &[PropKey::Index(index), PropKey::Length]);
        }
        popped
    }

    /// Insert at `index`, shifting the tail. Every shifted position is
    /// notified along with the length set.
    pub fn insert(&self, index: usize, value: impl Into<Value>) {
        if self.mode.readonly {
            warn!(index, "insert on readonly list ignored");
            return;
        }
        let value = value.into();
        let new_len = self.rt.untracked(|| {
            let mut items = self.raw.items.borrow_mut();
            let at = index.min(items.len());
            items.insert(at, value);
            items.len()
        });
        let mut keys: Vec<PropKey> = (index..new_len).map(PropKey::Index).collect();
        keys.push(PropKey::Length);
        self.rt.trigger(self.raw.id, &keys);
    }

    /// Remove at `index`, shifting the tail. Out-of-range removals are a
    /// no-op returning `None`.
    pub fn remove(&self, index: usize) -> Option<Value> {
        if self.mode.readonly {
            warn!(index, "remove on readonly list ignored");
            return None;
        }
        let (removed, old_len) = self.rt.untracked(|| {
            let mut items = self.raw.items.borrow_mut();
            let old_len = items.len();
            if index >= old_len {
                return (None, old_len);
            }
            (Some(items.remove(index)), old_len)
        });
        if removed.is_some() {
            let mut keys: Vec<PropKey> = (index..old_len).map(PropKey::Index).collect();
            keys.push(PropKey::Length);
            self.rt.trigger(self.raw.id, &keys);
        }
        removed
    }

    /// Resize to `new_len`, truncating or extending with `Null`. A truncation
    /// notifies every dropped index; either direction notifies the length set.
    pub fn set_len(&self, new_len: usize) {
        if self.mode.readonly {
            warn!(new_len, "set_len on readonly list ignored");
            return;
        }
        let old_len = self.rt.untracked(|| {
            let mut items = self.raw.items.borrow_mut();
            let old_len = items.len();
            items.resize(new_len, Value::Null);
            old_len
        });
        if new_len < old_len {
            let mut keys: Vec<PropKey> = (new_len..old_len).map(PropKey::Index).collect();
            keys.push(PropKey::Length);
            self.rt.trigger(self.raw.id, &keys);
        } else if new_len > old_len {
            self.rt.trigger(self.raw.id, &[PropKey::Length]);
        }
    }

    /// Snapshot of the raw items, tracked structurally.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Value> {
        if !self.mode.readonly {
            self.rt.track(self.raw.id, PropKey::Length);
        }
        self.raw.items.borrow().clone()
    }

    #[must_use]
    pub fn same_raw(&self, other: &ObservableList) -> bool {
        Rc::ptr_eq(&self.raw, &other.raw)
    }
}

// ---------------------------------------------------------------------------
// Set
// ---------------------------------------------------------------------------

/// Observable wrapper over a set of leaf values.
#[derive(Clone)]
pub struct ObservableSet {
    rt: Runtime,
    raw: Rc<RawSet>,
    mode: Mode,
}

impl ObservableSet {
    #[must_use]
    pub fn id(&self) -> ObservableId {
        self.raw.id
    }

    /// Membership check, tracked under the specific member.
    #[must_use]
    pub fn has(&self, member: &LeafKey) -> bool {
        if !self.mode.readonly {
            self.rt.track(self.raw.id, PropKey::Member(member.clone()));
        }
        self.raw.members.borrow().contains(member)
    }

    /// Insert; only an insertion that actually added notifies, under both
    /// the member key and the enumeration sentinel.
    pub fn insert(&self, member: LeafKey) -> bool {
        if self.mode.readonly {
            warn!(member = %member, "insert on readonly set ignored");
            return false;
        }
        let added = self.raw.members.borrow_mut().insert(member.clone());
        if added {
            self.rt
                .trigger(self.raw.id, &[PropKey::Member(member), PropKey::Iterate]);
        }
        added
    }

    /// Remove; only a removal that actually deleted notifies.
    pub fn remove(&self, member: &LeafKey) -> bool {
        if self.mode.readonly {
            warn!(member = %member, "remove on readonly set ignored");
            return false;
        }
        let removed = self.raw.members.borrow_mut().remove(member);
        if removed {
            self.rt.trigger(
                self.raw.id,
                &[PropKey::Member(member.clone()), PropKey::Iterate],
            );
        }
        removed
    }

    /// Member count, tracked structurally.
    #[must_use]
    pub fn len(&self) -> usize {
        if !self.mode.readonly {
            self.rt.track(self.raw.id, PropKey::Iterate);
        }
        self.raw.members.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the members, tracked structurally.
    #[must_use]
    pub fn members(&self) -> Vec<LeafKey> {
        if !self.mode.readonly {
            self.rt.track(self.raw.id, PropKey::Iterate);
        }
        self.raw.members.borrow().iter().cloned().collect()
    }

    #[must_use]
    pub fn same_raw(&self, other: &ObservableSet) -> bool {
        Rc::ptr_eq(&self.raw, &other.raw)
    }
}
