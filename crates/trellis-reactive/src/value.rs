#![forbid(unsafe_code)]

//! Dynamic value model shared by observables and the tree layer.
//!
//! # Design
//!
//! [`Value`] is a small tagged union over the shapes the reactive layer can
//! track: scalar leaves plus three `Rc`-shared structured containers. The
//! containers are *raw* storage — dependency tracking only happens when they
//! are accessed through an observable wrapper. Each container carries an
//! [`ObservableId`] so the dependency store can key subscriptions by raw
//! identity, never by wrapper.
//!
//! # Invariants
//!
//! 1. Cloning a `Value` never deep-copies a container: `Map`/`List`/`Set`
//!    clones share the same raw storage and the same id.
//! 2. Leaf equality is by value; container equality is by identity
//!    (`Rc::ptr_eq`). Two structurally equal but distinct maps compare
//!    unequal, matching reference semantics in the change detector.
//! 3. `Float` equality treats NaN as equal to NaN, so writing NaN over NaN
//!    is a no-op rather than an infinite notification source.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

/// Identity of one raw structured container (or ref/computed cell) inside
/// the dependency store. Allocated once per container, process-unique
/// within a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObservableId(pub(crate) u64);

thread_local! {
    static NEXT_ID: Cell<u64> = const { Cell::new(0) };
}

impl ObservableId {
    /// Allocate a fresh id from the thread-local counter.
    pub(crate) fn next() -> Self {
        NEXT_ID.with(|c| {
            let id = c.get();
            c.set(id + 1);
            ObservableId(id)
        })
    }
}

/// Raw backing storage for a string-keyed record/map.
pub struct RawMap {
    pub(crate) id: ObservableId,
    pub(crate) entries: RefCell<HashMap<Rc<str>, Value>>,
}

/// Raw backing storage for an ordered list.
pub struct RawList {
    pub(crate) id: ObservableId,
    pub(crate) items: RefCell<Vec<Value>>,
}

/// Raw backing storage for a set of leaf values.
///
/// Members are restricted to leaves: set membership requires a total order,
/// which containers (identity-equal only) do not have.
pub struct RawSet {
    pub(crate) id: ObservableId,
    pub(crate) members: RefCell<BTreeSet<LeafKey>>,
}

impl RawMap {
    pub(crate) fn new(entries: HashMap<Rc<str>, Value>) -> Rc<Self> {
        Rc::new(Self {
            id: ObservableId::next(),
            entries: RefCell::new(entries),
        })
    }
}

impl RawList {
    pub(crate) fn new(items: Vec<Value>) -> Rc<Self> {
        Rc::new(Self {
            id: ObservableId::next(),
            items: RefCell::new(items),
        })
    }
}

impl RawSet {
    pub(crate) fn new(members: BTreeSet<LeafKey>) -> Rc<Self> {
        Rc::new(Self {
            id: ObservableId::next(),
            members: RefCell::new(members),
        })
    }
}

/// An orderable leaf value, usable as a set member.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LeafKey {
    Bool(bool),
    Int(i64),
    Str(Rc<str>),
}

impl fmt::Display for LeafKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

/// A dynamically typed value: scalar leaf or shared structured container.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Map(Rc<RawMap>),
    List(Rc<RawList>),
    Set(Rc<RawSet>),
}

impl Value {
    /// Build an empty raw map value.
    #[must_use]
    pub fn map() -> Self {
        Value::Map(RawMap::new(HashMap::new()))
    }

    /// Build a raw map from key/value pairs.
    #[must_use]
    pub fn map_from<K: Into<Rc<str>>, V: Into<Value>>(
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        let entries = pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Value::Map(RawMap::new(entries))
    }

    /// Build a raw list from values.
    #[must_use]
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(RawList::new(items.into_iter().collect()))
    }

    /// Build a raw set from leaf members.
    #[must_use]
    pub fn set(members: impl IntoIterator<Item = LeafKey>) -> Self {
        Value::Set(RawSet::new(members.into_iter().collect()))
    }

    /// True for `Map`, `List`, and `Set` variants.
    #[must_use]
    pub fn is_structured(&self) -> bool {
        matches!(self, Value::Map(_) | Value::List(_) | Value::Set(_))
    }

    /// The container id, if this value is structured.
    #[must_use]
    pub fn observable_id(&self) -> Option<ObservableId> {
        match self {
            Value::Map(m) => Some(m.id),
            Value::List(l) => Some(l.id),
            Value::Set(s) => Some(s.id),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Leaves by value, containers by identity. NaN equals NaN.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Map(m) => write!(f, "Map#{}", m.id.0),
            Value::List(l) => write!(f, "List#{}", l.id.0),
            Value::Set(s) => write!(f, "Set#{}", s.id.0),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(Rc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(Rc::from(v.as_str()))
    }
}

impl From<Rc<str>> for Value {
    fn from(v: Rc<str>) -> Self {
        Value::Str(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_equality_by_value() {
        assert_eq!(Value::Int(3), Value::Int(3));
        assert_ne!(Value::Int(3), Value::Int(4));
        assert_ne!(Value::Int(3), Value::Float(3.0));
        assert_eq!(Value::from("a"), Value::from("a"));
    }

    #[test]
    fn nan_equals_nan() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    }

    #[test]
    fn container_equality_by_identity() {
        let a = Value::map();
        let b = a.clone();
        let c = Value::map();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn clone_shares_storage() {
        let a = Value::list([Value::Int(1)]);
        let b = a.clone();
        assert_eq!(a.observable_id(), b.observable_id());
    }

    #[test]
    fn ids_are_unique() {
        let a = Value::map();
        let b = Value::list([]);
        assert_ne!(a.observable_id(), b.observable_id());
    }
}
